//! Rigid (similarity) CPD: rotation, translation and uniform scale.

use super::math::{translate_rows, weighted_trace};
use super::model::{check_ndim, clamp_sigma2, CenteredMoments, CpdModel};
use super::result::{EstepResult, RigidResult};
use cv_core::{Error, Result};
use nalgebra::{DMatrix, DVector};

#[derive(Debug, Clone, Copy, Default)]
pub struct RigidCpd;

impl CpdModel for RigidCpd {
    type Params = RigidResult;

    fn initial_params(&self, source: &DMatrix<f64>, sigma2: f64, q: f64) -> Result<RigidResult> {
        Ok(RigidResult::identity(source.ncols(), sigma2, q))
    }

    /// Weighted Procrustes with scale.
    ///
    /// The rotation comes from the SVD of the centred cross-covariance with
    /// the last singular direction flipped when needed so that det(R) = +1.
    fn maximization_step(
        &self,
        source: &DMatrix<f64>,
        target: &DMatrix<f64>,
        estep: &EstepResult,
        _previous: &RigidResult,
        sigma2_floor: f64,
    ) -> Result<RigidResult> {
        let ndim = source.ncols() as f64;
        let n_p = estep.n_p;
        let m = CenteredMoments::new(source, target, estep)?;

        let svd = m.a.clone().svd(true, true);
        let u = svd
            .u
            .ok_or_else(|| Error::LinearAlgebra("SVD did not return U".to_string()))?;
        let v_t = svd
            .v_t
            .ok_or_else(|| Error::LinearAlgebra("SVD did not return V^T".to_string()))?;

        let d = u.ncols();
        let mut c = DVector::from_element(d, 1.0);
        c[d - 1] = (&u * &v_t).determinant().signum();
        let rot = &u * DMatrix::from_diagonal(&c) * &v_t;

        let tr_atr = (m.a.transpose() * &rot).trace();
        let tr_yp1y = weighted_trace(&m.source_hat, &estep.p1);
        // a single effective source point carries no scale information
        let scale = if tr_yp1y > f64::EPSILON {
            tr_atr / tr_yp1y
        } else {
            1.0
        };
        let t = &m.mu_x - (&rot * &m.mu_y) * scale;

        let tr_xp1x = weighted_trace(&m.target_hat, &estep.pt1);
        let sigma2 = clamp_sigma2((tr_xp1x - scale * tr_atr) / (n_p * ndim), sigma2_floor)?;
        let q = (tr_xp1x - 2.0 * scale * tr_atr + scale * scale * tr_yp1y) / (2.0 * sigma2)
            + ndim * n_p * 0.5 * sigma2.ln();

        Ok(RigidResult {
            rot,
            t,
            scale,
            sigma2,
            q,
        })
    }

    /// `s·points·Rᵗ + t`
    fn transform(&self, points: &DMatrix<f64>, params: &RigidResult) -> Result<DMatrix<f64>> {
        check_ndim(points, params.ndim())?;
        let rotated = points * params.rot.transpose() * params.scale;
        Ok(translate_rows(rotated, &params.t))
    }
}
