//! Affine CPD: unconstrained linear map plus translation.

use super::math::{solve_linear, translate_rows, weighted_gram, weighted_trace};
use super::model::{check_ndim, clamp_sigma2, CenteredMoments, CpdModel};
use super::result::{AffineResult, EstepResult};
use cv_core::Result;
use nalgebra::DMatrix;

#[derive(Debug, Clone, Copy, Default)]
pub struct AffineCpd;

impl CpdModel for AffineCpd {
    type Params = AffineResult;

    fn initial_params(&self, source: &DMatrix<f64>, sigma2: f64, q: f64) -> Result<AffineResult> {
        Ok(AffineResult::identity(source.ncols(), sigma2, q))
    }

    /// Weighted linear least squares: `B·(Ŷᵗ·diag(p1)·Ŷ) = A`.
    fn maximization_step(
        &self,
        source: &DMatrix<f64>,
        target: &DMatrix<f64>,
        estep: &EstepResult,
        _previous: &AffineResult,
        sigma2_floor: f64,
    ) -> Result<AffineResult> {
        let ndim = source.ncols() as f64;
        let n_p = estep.n_p;
        let m = CenteredMoments::new(source, target, estep)?;

        let yp1y = weighted_gram(&m.source_hat, &estep.p1);
        // yp1yᵗ·Bᵗ = Aᵗ
        let affine = solve_linear(&yp1y.transpose(), &m.a.transpose())?.transpose();
        let t = &m.mu_x - &affine * &m.mu_y;

        let tr_xp1x = weighted_trace(&m.target_hat, &estep.pt1);
        let tr_ab = (&m.a * affine.transpose()).trace();
        let tr_byb = (&affine * &yp1y * affine.transpose()).trace();

        let sigma2 = clamp_sigma2((tr_xp1x - tr_ab) / (n_p * ndim), sigma2_floor)?;
        // B·yp1y = A, so tr_byb == tr_ab and the bracket reduces to tr_xp1x − tr_ab
        let q = (tr_xp1x - 2.0 * tr_ab + tr_byb) / (2.0 * sigma2) + ndim * n_p * 0.5 * sigma2.ln();

        Ok(AffineResult {
            affine,
            t,
            sigma2,
            q,
        })
    }

    /// `points·Bᵗ + t`
    fn transform(&self, points: &DMatrix<f64>, params: &AffineResult) -> Result<DMatrix<f64>> {
        check_ndim(points, params.ndim())?;
        Ok(translate_rows(points * params.affine.transpose(), &params.t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DVector;

    fn square_with_center() -> DMatrix<f64> {
        DMatrix::from_row_slice(5, 2, &[0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.3, 0.6])
    }

    #[test]
    fn test_known_correspondences_recover_affine() {
        let source = square_with_center();
        let truth = AffineResult {
            affine: DMatrix::from_row_slice(2, 2, &[1.2, 0.4, -0.3, 0.8]),
            t: DVector::from_vec(vec![2.0, -1.0]),
            sigma2: 1.0,
            q: 0.0,
        };
        let target = AffineCpd.transform(&source, &truth).unwrap();
        let estep = EstepResult {
            pt1: DVector::from_element(5, 1.0),
            p1: DVector::from_element(5, 1.0),
            px: target.clone(),
            n_p: 5.0,
        };

        let prev = AffineResult::identity(2, 1.0, 0.0);
        let est = AffineCpd
            .maximization_step(&source, &target, &estep, &prev, 1e-12)
            .unwrap();
        assert!((&est.affine - &truth.affine).norm() < 1e-9);
        assert!((&est.t - &truth.t).norm() < 1e-9);
        assert_eq!(est.sigma2, 1e-12);
    }

    #[test]
    fn test_objective_cross_terms_collapse() {
        // soft responsibilities: check q against the reduced bracket
        let source = square_with_center();
        let target = DMatrix::from_row_slice(4, 2, &[0.1, 0.0, 1.1, 0.2, 0.0, 0.9, 0.8, 1.2]);
        let estep = crate::registration::cpd::estep::expectation_step(
            &source,
            &target,
            0.2,
            0.0,
            &crate::registration::cpd::gauss_transform::DirectGaussTransform,
        )
        .unwrap();

        let prev = AffineResult::identity(2, 0.2, 0.0);
        let est = AffineCpd
            .maximization_step(&source, &target, &estep, &prev, 1e-12)
            .unwrap();
        let expected = estep.n_p * 2.0 * 0.5 + 2.0 * estep.n_p * 0.5 * est.sigma2.ln();
        assert!((est.q - expected).abs() < 1e-8);
    }
}
