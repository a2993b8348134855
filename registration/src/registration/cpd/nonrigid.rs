//! Non-rigid CPD with a Gaussian radial-basis displacement field.
//!
//! The source points are the kernel centres. With `G` the N×N kernel over
//! the source and `W` the N×D coefficients, the moved source is
//! `T = Y + G·W`. The maximization step solves the regularized system
//!
//! ```text
//! (diag(p1)·G + λσ²·I)·W = px − diag(p1)·Y
//! ```
//!
//! which is the `(G + λσ²·diag(1/p1))` form multiplied through by
//! `diag(p1)`, so source points that receive no responsibility do not
//! cause a division by zero.

use super::config::NonRigidOption;
use super::gauss_transform::GaussTransform;
use super::math::{gaussian_kernel, solve_linear, weighted_trace};
use super::model::{check_ndim, clamp_sigma2, CpdModel};
use super::result::{EstepResult, NonRigidResult};
use cv_core::{Error, Result};
use nalgebra::DMatrix;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NonRigidCpd {
    pub beta: f64,
    pub lambda: f64,
}

impl Default for NonRigidCpd {
    fn default() -> Self {
        NonRigidOption::default().into()
    }
}

impl From<NonRigidOption> for NonRigidCpd {
    fn from(option: NonRigidOption) -> Self {
        Self {
            beta: option.beta,
            lambda: option.lambda,
        }
    }
}

impl CpdModel for NonRigidCpd {
    type Params = NonRigidResult;

    fn initial_params(&self, source: &DMatrix<f64>, sigma2: f64, q: f64) -> Result<NonRigidResult> {
        NonRigidOption {
            beta: self.beta,
            lambda: self.lambda,
        }
        .validate()?;

        Ok(NonRigidResult {
            kernel: gaussian_kernel(source, source, self.beta),
            coeff: DMatrix::zeros(source.nrows(), source.ncols()),
            control_points: source.clone(),
            beta: self.beta,
            sigma2,
            q,
        })
    }

    fn maximization_step(
        &self,
        source: &DMatrix<f64>,
        target: &DMatrix<f64>,
        estep: &EstepResult,
        previous: &NonRigidResult,
        sigma2_floor: f64,
    ) -> Result<NonRigidResult> {
        let n = source.nrows();
        let ndim = source.ncols();
        let n_p = estep.n_p;
        if !(n_p.is_finite() && n_p > 0.0) {
            return Err(Error::NumericalDegeneracy(format!(
                "total responsibility must be positive, got {n_p}"
            )));
        }
        if previous.kernel.shape() != (n, n) {
            return Err(Error::dimension_mismatch(n, previous.kernel.nrows()));
        }

        let p1 = &estep.p1;
        let g = &previous.kernel;
        let reg = self.lambda * previous.sigma2;

        let lhs = DMatrix::from_fn(n, n, |i, j| {
            let diag = if i == j { reg } else { 0.0 };
            p1[i] * g[(i, j)] + diag
        });
        let rhs = DMatrix::from_fn(n, ndim, |i, d| estep.px[(i, d)] - p1[i] * source[(i, d)]);
        let coeff = solve_linear(&lhs, &rhs)?;

        let moved = source + g * &coeff;

        let tr_xp1x = weighted_trace(target, &estep.pt1);
        let tr_pxt = estep.px.component_mul(&moved).sum();
        let tr_tpt = weighted_trace(&moved, p1);
        let residual = tr_xp1x - 2.0 * tr_pxt + tr_tpt;

        let sigma2 = clamp_sigma2(residual / (n_p * ndim as f64), sigma2_floor)?;
        let smoothness = (coeff.transpose() * g * &coeff).trace();
        let q = residual / (2.0 * sigma2)
            + ndim as f64 * n_p * 0.5 * sigma2.ln()
            + 0.5 * self.lambda * smoothness;

        Ok(NonRigidResult {
            kernel: previous.kernel.clone(),
            coeff,
            control_points: previous.control_points.clone(),
            beta: previous.beta,
            sigma2,
            q,
        })
    }

    /// `points + Σ_i coeff_i·exp(−‖points − y_i‖²/(2β²))`
    fn transform(&self, points: &DMatrix<f64>, params: &NonRigidResult) -> Result<DMatrix<f64>> {
        check_ndim(points, params.control_points.ncols())?;
        let h = std::f64::consts::SQRT_2 * params.beta;
        let displacement =
            GaussTransform::new(&params.control_points, h)?.compute_multi(points, &params.coeff)?;
        Ok(points + displacement)
    }

    /// Reuses the cached kernel when `source` is the control-point set the
    /// kernel was built from; any other point set goes through
    /// [`CpdModel::transform`].
    fn transform_source(
        &self,
        source: &DMatrix<f64>,
        params: &NonRigidResult,
    ) -> Result<DMatrix<f64>> {
        if *source != params.control_points {
            return self.transform(source, params);
        }
        Ok(source + params.displacements())
    }
}
