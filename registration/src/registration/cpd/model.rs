//! Capabilities every transform family provides to the EM driver.

use super::math::center_rows;
use super::result::{EstepResult, TransformRecord};
use cv_core::{Error, Result};
use nalgebra::{DMatrix, DVector};
use std::fmt::Debug;

/// One transform family: its parameter record, its maximization step and
/// how it maps points.
///
/// The expectation step is family independent and lives in
/// [`super::estep`]; the driver composes it with a `CpdModel`.
pub trait CpdModel {
    type Params: TransformRecord + Clone + Debug;

    /// Identity transform for `source`, carrying the seed variance and objective.
    fn initial_params(&self, source: &DMatrix<f64>, sigma2: f64, q: f64) -> Result<Self::Params>;

    /// New parameters from the untransformed point sets and the latest
    /// responsibilities. `previous` is the record the responsibilities were
    /// computed with.
    fn maximization_step(
        &self,
        source: &DMatrix<f64>,
        target: &DMatrix<f64>,
        estep: &EstepResult,
        previous: &Self::Params,
        sigma2_floor: f64,
    ) -> Result<Self::Params>;

    /// Map arbitrary points through `params`.
    fn transform(&self, points: &DMatrix<f64>, params: &Self::Params) -> Result<DMatrix<f64>>;

    /// Map the registration source. Families that cache source-dependent
    /// quantities override this.
    fn transform_source(
        &self,
        source: &DMatrix<f64>,
        params: &Self::Params,
    ) -> Result<DMatrix<f64>> {
        self.transform(source, params)
    }
}

/// Responsibility-weighted centring shared by the rigid and affine updates.
#[derive(Debug, Clone)]
pub(crate) struct CenteredMoments {
    /// Target-side centre of mass
    pub mu_x: DVector<f64>,
    /// Source-side centre of mass
    pub mu_y: DVector<f64>,
    pub target_hat: DMatrix<f64>,
    pub source_hat: DMatrix<f64>,
    /// Centred cross-covariance `pxᵗ·Ŷ − μ_x ⊗ (p1ᵗ·Ŷ)`, D×D
    pub a: DMatrix<f64>,
}

impl CenteredMoments {
    pub fn new(source: &DMatrix<f64>, target: &DMatrix<f64>, estep: &EstepResult) -> Result<Self> {
        let n_p = estep.n_p;
        if !(n_p.is_finite() && n_p > 0.0) {
            return Err(Error::NumericalDegeneracy(format!(
                "total responsibility must be positive, got {n_p}"
            )));
        }
        if estep.p1.len() != source.nrows() {
            return Err(Error::dimension_mismatch(source.nrows(), estep.p1.len()));
        }
        if estep.pt1.len() != target.nrows() {
            return Err(Error::dimension_mismatch(target.nrows(), estep.pt1.len()));
        }

        let mu_x = estep.px.row_sum().transpose() / n_p;
        let mu_y = source.transpose() * &estep.p1 / n_p;
        let target_hat = center_rows(target, &mu_x);
        let source_hat = center_rows(source, &mu_y);

        let p1_y = source_hat.transpose() * &estep.p1;
        let a = estep.px.transpose() * &source_hat - &mu_x * p1_y.transpose();

        Ok(Self {
            mu_x,
            mu_y,
            target_hat,
            source_hat,
            a,
        })
    }
}

/// Clamp a variance estimate to `floor`. Non-finite estimates are an error.
pub(crate) fn clamp_sigma2(sigma2: f64, floor: f64) -> Result<f64> {
    if !sigma2.is_finite() {
        return Err(Error::NumericalDegeneracy(format!(
            "variance estimate is not finite: {sigma2}"
        )));
    }
    if sigma2 < floor {
        #[cfg(feature = "tracing")]
        tracing::debug!("clamping variance {:e} to floor {:e}", sigma2, floor);
        return Ok(floor);
    }
    Ok(sigma2)
}

/// Reject point sets whose dimensionality does not match the parameters.
pub(crate) fn check_ndim(points: &DMatrix<f64>, ndim: usize) -> Result<()> {
    if points.ncols() == ndim {
        Ok(())
    } else {
        Err(Error::dimension_mismatch(ndim, points.ncols()))
    }
}
