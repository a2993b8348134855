//! EM loop shared by every transform family.

use super::config::CpdOption;
use super::estep::expectation_step;
use super::math::mean_square_norm;
use super::model::CpdModel;
use super::result::{CpdRegistration, EstepResult, RegistrationState, TransformRecord};
use cv_core::{Error, Result};
use nalgebra::DMatrix;

/// Coherent Point Drift registration for one transform family.
///
/// # Algorithm
///
/// 1. σ²₀ from the mean squared pairwise distance, identity transform
/// 2. Transform the source with the current parameters
/// 3. Expectation step against the fixed target
/// 4. Family-specific maximization step
/// 5. Stop when |q_new − q_old| < tolerance, or after `max_iteration`
///
/// The current record is an accumulator: each iteration builds a new one
/// and drops the old.
#[derive(Debug, Clone)]
pub struct CoherentPointDrift<M: CpdModel> {
    model: M,
    option: CpdOption,
}

impl<M: CpdModel> CoherentPointDrift<M> {
    pub fn new(model: M, option: CpdOption) -> Self {
        Self { model, option }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn option(&self) -> &CpdOption {
        &self.option
    }

    pub fn expectation_step(
        &self,
        t_source: &DMatrix<f64>,
        target: &DMatrix<f64>,
        sigma2: f64,
    ) -> Result<EstepResult> {
        let backend = self
            .option
            .gauss_transform
            .backend(t_source.nrows(), target.nrows());
        expectation_step(t_source, target, sigma2, self.option.outlier_weight, backend)
    }

    pub fn transform(&self, points: &DMatrix<f64>, params: &M::Params) -> Result<DMatrix<f64>> {
        self.model.transform(points, params)
    }

    /// Register `source` onto `target`. Exhausting the iteration budget is
    /// reported through [`CpdRegistration::state`], not as an error.
    pub fn registration(
        &self,
        source: &DMatrix<f64>,
        target: &DMatrix<f64>,
    ) -> Result<CpdRegistration<M::Params>> {
        self.option.validate()?;
        validate_point_sets(source, target)?;

        let option = &self.option;
        let ndim = source.ncols() as f64;
        let floor = option.min_sigma2;
        let tolerance = option.tolerance;

        let sigma2 = option
            .initial_sigma2
            .unwrap_or_else(|| mean_square_norm(source, target))
            .max(floor);
        // seed can never satisfy the convergence test on the first iteration
        let mut q = -tolerance + 1.0 - target.nrows() as f64 * ndim * 0.5 * sigma2.ln();
        let mut params = self.model.initial_params(source, sigma2, q)?;

        let mut history = Vec::new();
        let mut state = RegistrationState::MaxIterationReached;

        for iteration in 0..option.max_iteration {
            let t_source = self.model.transform_source(source, &params)?;
            let estep = self.expectation_step(&t_source, target, params.sigma2())?;
            params = self
                .model
                .maximization_step(source, target, &estep, &params, floor)?;

            let q_new = params.q();
            if !q_new.is_finite() {
                return Err(Error::NumericalDegeneracy(format!(
                    "objective became {q_new} at iteration {iteration}"
                )));
            }
            history.push(q_new);

            #[cfg(feature = "tracing")]
            tracing::debug!(
                iteration,
                q = q_new,
                sigma2 = params.sigma2(),
                n_p = estep.n_p,
                "cpd iteration"
            );

            if (q_new - q).abs() < tolerance {
                state = RegistrationState::Converged;
                break;
            }
            q = q_new;
        }

        #[cfg(feature = "tracing")]
        match state {
            RegistrationState::Converged => tracing::info!(
                iterations = history.len(),
                sigma2 = params.sigma2(),
                "cpd converged"
            ),
            RegistrationState::MaxIterationReached => tracing::warn!(
                max_iteration = option.max_iteration,
                "cpd stopped at the iteration limit without converging"
            ),
        }

        Ok(CpdRegistration {
            params,
            state,
            num_iterations: history.len(),
            objective_history: history,
        })
    }
}

/// Both sets must be non-empty, finite and of the same dimensionality.
pub fn validate_point_sets(source: &DMatrix<f64>, target: &DMatrix<f64>) -> Result<()> {
    if source.ncols() == 0 {
        return Err(Error::invalid_argument("points must have at least one coordinate"));
    }
    if source.ncols() != target.ncols() {
        return Err(Error::dimension_mismatch(source.ncols(), target.ncols()));
    }
    if source.nrows() == 0 || target.nrows() == 0 {
        return Err(Error::invalid_argument("source and target must be non-empty"));
    }
    if source.iter().chain(target.iter()).any(|v| !v.is_finite()) {
        return Err(Error::invalid_argument("point coordinates must be finite"));
    }
    Ok(())
}
