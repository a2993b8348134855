//! Small dense helpers shared by the expectation and maximization steps.
//!
//! Point sets are N×D matrices, one point per row.

use cv_core::{Error, Result};
use nalgebra::{DMatrix, DVector};

/// Mean squared distance over all source/target pairs, per dimension:
/// `Σ_ij ‖s_i − t_j‖² / (N_s·N_t·D)`.
///
/// Uses `Σ_ij ‖s_i − t_j‖² = N_t·Σ‖s_i‖² + N_s·Σ‖t_j‖² − 2·(Σs_i)·(Σt_j)`
/// so the cost is linear in the point counts. Both sets are first expressed
/// relative to the source centroid, which leaves every pairwise distance
/// unchanged and keeps the expansion free of cancellation when the clouds
/// sit far from the origin.
pub fn mean_square_norm(source: &DMatrix<f64>, target: &DMatrix<f64>) -> f64 {
    let ns = source.nrows() as f64;
    let nt = target.nrows() as f64;
    let ndim = source.ncols() as f64;
    if ns == 0.0 || nt == 0.0 || ndim == 0.0 {
        return 0.0;
    }

    let origin = source.row_mean().transpose();
    let source = center_rows(source, &origin);
    let target = center_rows(target, &origin);

    let cross = source.row_sum().dot(&target.row_sum());
    let total = nt * source.norm_squared() + ns * target.norm_squared() - 2.0 * cross;
    // cancellation can leave a tiny negative for coincident sets
    (total / (ns * nt * ndim)).max(0.0)
}

/// `points − 1·meanᵗ`
pub fn center_rows(points: &DMatrix<f64>, mean: &DVector<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(points.nrows(), points.ncols(), |i, d| points[(i, d)] - mean[d])
}

/// Add `t` to every row.
pub fn translate_rows(mut points: DMatrix<f64>, t: &DVector<f64>) -> DMatrix<f64> {
    for d in 0..points.ncols() {
        for i in 0..points.nrows() {
            points[(i, d)] += t[d];
        }
    }
    points
}

/// `trace(Xᵗ·diag(w)·X) = Σ_j w_j ‖x_j‖²`
pub fn weighted_trace(points: &DMatrix<f64>, w: &DVector<f64>) -> f64 {
    points
        .row_iter()
        .zip(w.iter())
        .map(|(row, &wj)| wj * row.norm_squared())
        .sum()
}

/// `Xᵗ·diag(w)·X`
pub fn weighted_gram(points: &DMatrix<f64>, w: &DVector<f64>) -> DMatrix<f64> {
    let weighted = DMatrix::from_fn(points.nrows(), points.ncols(), |i, d| w[i] * points[(i, d)]);
    points.transpose() * weighted
}

/// Gaussian radial basis matrix `G_ij = exp(−‖a_i − b_j‖² / (2β²))`.
pub fn gaussian_kernel(a: &DMatrix<f64>, b: &DMatrix<f64>, beta: f64) -> DMatrix<f64> {
    let inv = 1.0 / (2.0 * beta * beta);
    DMatrix::from_fn(a.nrows(), b.nrows(), |i, j| {
        let dist_sq: f64 = (0..a.ncols())
            .map(|d| {
                let diff = a[(i, d)] - b[(j, d)];
                diff * diff
            })
            .sum();
        (-dist_sq * inv).exp()
    })
}

/// Solve `lhs·X = rhs`, falling back to the pseudo-inverse when `lhs` is
/// singular.
pub fn solve_linear(lhs: &DMatrix<f64>, rhs: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    if lhs.nrows() != lhs.ncols() {
        return Err(Error::LinearAlgebra(format!(
            "system matrix must be square, got {}x{}",
            lhs.nrows(),
            lhs.ncols()
        )));
    }
    if lhs.nrows() != rhs.nrows() {
        return Err(Error::dimension_mismatch(lhs.nrows(), rhs.nrows()));
    }

    if let Some(x) = lhs.clone().lu().solve(rhs) {
        if x.iter().all(|v| v.is_finite()) {
            return Ok(x);
        }
    }

    let pinv = lhs
        .clone()
        .pseudo_inverse(1e-12)
        .map_err(|e| Error::LinearAlgebra(e.to_string()))?;
    Ok(pinv * rhs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_square_norm_matches_brute_force() {
        let source = DMatrix::from_row_slice(3, 2, &[0.0, 0.0, 1.0, 0.5, -2.0, 3.0]);
        let target = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 4.0, -1.0]);

        let mut brute = 0.0;
        for i in 0..3 {
            for j in 0..2 {
                brute += (source.row(i) - target.row(j)).norm_squared();
            }
        }
        brute /= (3 * 2 * 2) as f64;

        assert!((mean_square_norm(&source, &target) - brute).abs() < 1e-12);
        assert!(mean_square_norm(&target, &target) > 0.0);
    }

    #[test]
    fn test_mean_square_norm_is_translation_invariant() {
        let source = DMatrix::from_fn(50, 3, |i, d| ((i * 7 + d * 13) % 11) as f64 * 0.2 - 1.0);
        let target = DMatrix::from_fn(40, 3, |i, d| ((i * 5 + d * 3) % 9) as f64 * 0.25 - 1.0);
        let reference = mean_square_norm(&source, &target);

        for &offset in &[1e7, 1e9, 1e10] {
            let shifted_source = source.map(|v| v + offset);
            let shifted_target = target.map(|v| v + offset);
            let shifted = mean_square_norm(&shifted_source, &shifted_target);
            assert!(
                ((shifted - reference) / reference).abs() < 1e-4,
                "offset {offset:e}: {shifted} vs {reference}"
            );
        }
    }

    #[test]
    fn test_mean_square_norm_single_coincident_point() {
        let p = DMatrix::from_row_slice(1, 3, &[1e8, -1e8, 3.0]);
        assert_eq!(mean_square_norm(&p, &p), 0.0);
    }

    #[test]
    fn test_weighted_helpers() {
        let x = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let w = DVector::from_vec(vec![0.5, 2.0]);

        let gram = weighted_gram(&x, &w);
        let expected = x.transpose() * DMatrix::from_diagonal(&w) * &x;
        assert!((gram - &expected).norm() < 1e-12);
        assert!((weighted_trace(&x, &w) - expected.trace()).abs() < 1e-12);
    }

    #[test]
    fn test_center_and_translate_are_inverse() {
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let mean = DVector::from_vec(vec![3.0, 4.0]);
        let centered = center_rows(&x, &mean);
        assert!(centered.row_sum().norm() < 1e-12);
        assert_eq!(translate_rows(centered, &mean), x);
    }

    #[test]
    fn test_gaussian_kernel_diagonal_is_one() {
        let x = DMatrix::from_row_slice(3, 2, &[0.0, 0.0, 1.0, 0.0, 0.0, 2.0]);
        let g = gaussian_kernel(&x, &x, 1.5);
        for i in 0..3 {
            assert_eq!(g[(i, i)], 1.0);
        }
        assert!((g[(0, 1)] - (-1.0f64 / 4.5).exp()).abs() < 1e-15);
        assert_eq!(g, g.transpose());
    }

    #[test]
    fn test_solve_linear_singular_falls_back() {
        let lhs = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 0.0]);
        let rhs = DMatrix::from_row_slice(2, 1, &[2.0, 0.0]);
        let x = solve_linear(&lhs, &rhs).unwrap();
        assert!((x[(0, 0)] - 2.0).abs() < 1e-12);
        assert!(x[(1, 0)].abs() < 1e-12);

        let regular = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 3.0]);
        let b = DMatrix::from_row_slice(2, 1, &[3.0, 5.0]);
        let x = solve_linear(&regular, &b).unwrap();
        assert!((&regular * x - b).norm() < 1e-12);
    }
}
