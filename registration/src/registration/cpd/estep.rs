//! Expectation step: soft correspondences under the current transform.

use super::gauss_transform::{GaussTransform, GaussTransformBackend};
use super::result::EstepResult;
use cv_core::{Error, Result};
use nalgebra::DMatrix;
use std::f64::consts::PI;

/// Compute the responsibility statistics of `target` against the
/// transformed source.
///
/// # Arguments
///
/// * `t_source` - Transformed source points (N_s×D)
/// * `target` - Fixed target points (N_t×D)
/// * `sigma2` - Current isotropic variance, must be > 0
/// * `w` - Outlier weight in [0, 1); 0 disables the uniform component
/// * `backend` - Kernel-sum implementation
///
/// Both kernel sums that feed `p1` and `px` share one source/target pass:
/// the weight matrix carries `a` in its first column and `a ⊙ target`
/// in the remaining D columns.
pub fn expectation_step(
    t_source: &DMatrix<f64>,
    target: &DMatrix<f64>,
    sigma2: f64,
    w: f64,
    backend: &dyn GaussTransformBackend,
) -> Result<EstepResult> {
    let ndim = t_source.ncols();
    if target.ncols() != ndim {
        return Err(Error::dimension_mismatch(ndim, target.ncols()));
    }
    if t_source.nrows() == 0 || target.nrows() == 0 {
        return Err(Error::invalid_argument("source and target must be non-empty"));
    }
    if !(sigma2.is_finite() && sigma2 > 0.0) {
        return Err(Error::NumericalDegeneracy(format!(
            "variance must be positive, got {sigma2}"
        )));
    }
    if !(0.0..1.0).contains(&w) {
        return Err(Error::invalid_argument(format!(
            "outlier weight must be in [0, 1), got {w}"
        )));
    }

    let ns = t_source.nrows() as f64;
    let nt = target.nrows() as f64;
    let h = (2.0 * sigma2).sqrt();
    let c = if w > 0.0 {
        (2.0 * PI * sigma2).powf(ndim as f64 * 0.5) * w / (1.0 - w) * ns / nt
    } else {
        0.0
    };

    let kt1 = GaussTransform::with_backend(t_source, h, backend)?.compute(target)?;
    let a = kt1.map(|k| 1.0 / (if k == 0.0 { f64::EPSILON } else { k } + c));
    let pt1 = a.map(|aj| 1.0 - c * aj);

    let weights = DMatrix::from_fn(target.nrows(), ndim + 1, |j, col| {
        if col == 0 {
            a[j]
        } else {
            a[j] * target[(j, col - 1)]
        }
    });
    let sums = GaussTransform::with_backend(target, h, backend)?.compute_multi(t_source, &weights)?;

    let p1 = sums.column(0).into_owned();
    let px = sums.columns(1, ndim).into_owned();
    let n_p = p1.sum();

    Ok(EstepResult { pt1, p1, px, n_p })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::cpd::gauss_transform::{DirectGaussTransform, ParallelGaussTransform};
    use nalgebra::DVector;

    fn cloud() -> (DMatrix<f64>, DMatrix<f64>) {
        let source = DMatrix::from_row_slice(
            4,
            2,
            &[0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0],
        );
        let target = DMatrix::from_row_slice(
            5,
            2,
            &[0.1, 0.0, 1.0, 0.2, -0.1, 1.1, 0.9, 0.9, 3.0, 3.0],
        );
        (source, target)
    }

    #[test]
    fn test_responsibility_conservation() {
        let (source, target) = cloud();
        for &w in &[0.0, 0.2, 0.9] {
            let e = expectation_step(&source, &target, 0.3, w, &DirectGaussTransform).unwrap();
            assert!((e.n_p - e.p1.sum()).abs() < 1e-12);
            assert!(e.n_p > 0.0 && e.n_p <= target.nrows() as f64 + 1e-9);
            assert!(e.pt1.iter().all(|&p| (0.0..=1.0).contains(&p)));
            // Σ p1 == Σ pt1 : every target's explained mass is handed to the sources
            assert!((e.pt1.sum() - e.n_p).abs() < 1e-9);
        }
    }

    #[test]
    fn test_no_outliers_explains_every_target() {
        let (source, target) = cloud();
        let e = expectation_step(&source, &target, 0.5, 0.0, &DirectGaussTransform).unwrap();
        assert!(e.pt1.iter().all(|&p| p == 1.0));
        assert!((e.n_p - target.nrows() as f64).abs() < 1e-9);
    }

    #[test]
    fn test_px_matches_dense_posterior() {
        let (source, target) = cloud();
        let sigma2 = 0.4;
        let e = expectation_step(&source, &target, sigma2, 0.0, &DirectGaussTransform).unwrap();

        // P_ij = K_ij / Σ_i K_ij with w = 0
        let k = DMatrix::from_fn(source.nrows(), target.nrows(), |i, j| {
            (-(source.row(i) - target.row(j)).norm_squared() / (2.0 * sigma2)).exp()
        });
        let col_sums = DVector::from_fn(target.nrows(), |j, _| k.column(j).sum());
        let p = DMatrix::from_fn(source.nrows(), target.nrows(), |i, j| k[(i, j)] / col_sums[j]);

        let px = &p * &target;
        let p1 = p.column_sum();
        assert!((px - &e.px).norm() < 1e-12);
        assert!((p1 - &e.p1).norm() < 1e-12);
    }

    #[test]
    fn test_far_target_hits_epsilon_guard() {
        let source = DMatrix::from_row_slice(1, 2, &[0.0, 0.0]);
        let target = DMatrix::from_row_slice(1, 2, &[1e6, 1e6]);
        let e = expectation_step(&source, &target, 1e-3, 0.0, &DirectGaussTransform).unwrap();
        assert!(e.n_p.is_finite());
        assert!(e.px.iter().all(|v| v.is_finite()));
        assert!(e.pt1.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_backends_agree() {
        let (source, target) = cloud();
        let a = expectation_step(&source, &target, 0.2, 0.1, &DirectGaussTransform).unwrap();
        let b = expectation_step(&source, &target, 0.2, 0.1, &ParallelGaussTransform).unwrap();
        assert_eq!(a.p1, b.p1);
        assert_eq!(a.px, b.px);
        assert_eq!(a.pt1, b.pt1);
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let (source, target) = cloud();
        assert!(expectation_step(&source, &target, 0.0, 0.0, &DirectGaussTransform).is_err());
        assert!(expectation_step(&source, &target, 1.0, 1.0, &DirectGaussTransform).is_err());
        let target_3d = DMatrix::zeros(2, 3);
        assert!(matches!(
            expectation_step(&source, &target_3d, 1.0, 0.0, &DirectGaussTransform),
            Err(Error::DimensionMismatch { .. })
        ));
    }
}
