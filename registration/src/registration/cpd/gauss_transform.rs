//! Discrete Gauss transform
//!
//! For source points `s_i`, bandwidth `h` and weights `w_ik`, evaluates at
//! every target point `t_j`:
//!
//! ```text
//! G(t_j)_k = Σ_i w_ik · exp(−‖t_j − s_i‖² / h²)
//! ```
//!
//! The evaluation strategy is behind [`GaussTransformBackend`] so a faster
//! (tree based, GPU, ...) implementation can be swapped in without touching
//! the EM code. Every backend must return the exact dense sum.

use cv_core::{Error, Result};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use std::fmt::Debug;

/// Source × target pair count above which [`GaussTransformMethod::Auto`]
/// switches to the parallel backend.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 4096;

/// Kernel-sum evaluation strategy.
pub trait GaussTransformBackend: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    /// `source` is N_s×D, `target` N_t×D and `weights` N_s×K; returns N_t×K.
    ///
    /// Shapes and bandwidth are validated by [`GaussTransform`] before this
    /// is called.
    fn weighted_sums(
        &self,
        source: &DMatrix<f64>,
        target: &DMatrix<f64>,
        h: f64,
        weights: &DMatrix<f64>,
    ) -> DMatrix<f64>;
}

/// Sequential dense double sum.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectGaussTransform;

impl GaussTransformBackend for DirectGaussTransform {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn weighted_sums(
        &self,
        source: &DMatrix<f64>,
        target: &DMatrix<f64>,
        h: f64,
        weights: &DMatrix<f64>,
    ) -> DMatrix<f64> {
        let inv_h2 = 1.0 / (h * h);
        let k = weights.ncols();
        let mut out = DMatrix::zeros(target.nrows(), k);
        let mut acc = vec![0.0; k];

        for j in 0..target.nrows() {
            acc.iter_mut().for_each(|a| *a = 0.0);
            kernel_row(source, target, j, inv_h2, weights, &mut acc);
            for (c, &v) in acc.iter().enumerate() {
                out[(j, c)] = v;
            }
        }
        out
    }
}

/// Dense double sum split over target rows on the Rayon pool.
///
/// Each row is accumulated in the same order as [`DirectGaussTransform`],
/// so both backends give bit-identical results.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelGaussTransform;

impl GaussTransformBackend for ParallelGaussTransform {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn weighted_sums(
        &self,
        source: &DMatrix<f64>,
        target: &DMatrix<f64>,
        h: f64,
        weights: &DMatrix<f64>,
    ) -> DMatrix<f64> {
        let inv_h2 = 1.0 / (h * h);
        let k = weights.ncols();

        let rows: Vec<Vec<f64>> = (0..target.nrows())
            .into_par_iter()
            .map(|j| {
                let mut acc = vec![0.0; k];
                kernel_row(source, target, j, inv_h2, weights, &mut acc);
                acc
            })
            .collect();

        DMatrix::from_fn(target.nrows(), k, |j, c| rows[j][c])
    }
}

/// Accumulate the weighted kernel sums for target row `j` into `acc`.
#[inline]
fn kernel_row(
    source: &DMatrix<f64>,
    target: &DMatrix<f64>,
    j: usize,
    inv_h2: f64,
    weights: &DMatrix<f64>,
    acc: &mut [f64],
) {
    let dim = source.ncols();
    for i in 0..source.nrows() {
        let mut dist_sq = 0.0;
        for d in 0..dim {
            let diff = target[(j, d)] - source[(i, d)];
            dist_sq += diff * diff;
        }
        let g = (-dist_sq * inv_h2).exp();
        for (c, a) in acc.iter_mut().enumerate() {
            *a += weights[(i, c)] * g;
        }
    }
}

/// Backend selection exposed through configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GaussTransformMethod {
    Direct,
    Parallel,
    /// Parallel once the pair count reaches [`DEFAULT_PARALLEL_THRESHOLD`].
    #[default]
    Auto,
}

impl GaussTransformMethod {
    pub fn backend(self, n_source: usize, n_target: usize) -> &'static dyn GaussTransformBackend {
        match self {
            GaussTransformMethod::Direct => &DirectGaussTransform,
            GaussTransformMethod::Parallel => &ParallelGaussTransform,
            GaussTransformMethod::Auto => {
                if n_source.saturating_mul(n_target) >= DEFAULT_PARALLEL_THRESHOLD {
                    &ParallelGaussTransform
                } else {
                    &DirectGaussTransform
                }
            }
        }
    }
}

/// Weights accepted by [`GaussTransform::compute_with`].
#[derive(Debug, Clone, Copy)]
pub enum Weights<'w> {
    /// Same weight for every source point.
    Scalar(f64),
    /// One weight per source point.
    PerPoint(&'w DVector<f64>),
    /// One column of per-source-point weights per output dimension.
    PerDimension(&'w DMatrix<f64>),
}

/// Gauss transform bound to a set of source points and a bandwidth.
#[derive(Debug, Clone, Copy)]
pub struct GaussTransform<'a> {
    source: &'a DMatrix<f64>,
    h: f64,
    backend: &'a dyn GaussTransformBackend,
}

impl<'a> GaussTransform<'a> {
    pub fn new(source: &'a DMatrix<f64>, h: f64) -> Result<Self> {
        Self::with_backend(source, h, &DirectGaussTransform)
    }

    pub fn with_backend(
        source: &'a DMatrix<f64>,
        h: f64,
        backend: &'a dyn GaussTransformBackend,
    ) -> Result<Self> {
        if !(h.is_finite() && h > 0.0) {
            return Err(Error::invalid_argument(format!(
                "Gauss transform bandwidth must be positive and finite, got {h}"
            )));
        }
        if source.ncols() == 0 {
            return Err(Error::invalid_argument(
                "Gauss transform source points have no coordinates",
            ));
        }
        Ok(Self { source, h, backend })
    }

    pub fn bandwidth(&self) -> f64 {
        self.h
    }

    pub fn backend(&self) -> &dyn GaussTransformBackend {
        self.backend
    }

    /// Unit-weight kernel sum at every target point.
    pub fn compute(&self, target: &DMatrix<f64>) -> Result<DVector<f64>> {
        let out = self.compute_with(target, Weights::Scalar(1.0))?;
        Ok(out.column(0).into_owned())
    }

    pub fn compute_weighted(
        &self,
        target: &DMatrix<f64>,
        weights: &DVector<f64>,
    ) -> Result<DVector<f64>> {
        let out = self.compute_with(target, Weights::PerPoint(weights))?;
        Ok(out.column(0).into_owned())
    }

    /// One output column per weight column.
    pub fn compute_multi(
        &self,
        target: &DMatrix<f64>,
        weights: &DMatrix<f64>,
    ) -> Result<DMatrix<f64>> {
        self.compute_with(target, Weights::PerDimension(weights))
    }

    pub fn compute_with(&self, target: &DMatrix<f64>, weights: Weights<'_>) -> Result<DMatrix<f64>> {
        if target.ncols() != self.source.ncols() {
            return Err(Error::dimension_mismatch(self.source.ncols(), target.ncols()));
        }

        let n = self.source.nrows();
        let owned;
        let weights = match weights {
            Weights::Scalar(w) => {
                owned = DMatrix::from_element(n, 1, w);
                &owned
            }
            Weights::PerPoint(w) => {
                if w.len() != n {
                    return Err(Error::dimension_mismatch(n, w.len()));
                }
                owned = DMatrix::from_column_slice(n, 1, w.as_slice());
                &owned
            }
            Weights::PerDimension(w) => {
                if w.nrows() != n {
                    return Err(Error::dimension_mismatch(n, w.nrows()));
                }
                w
            }
        };

        Ok(self
            .backend
            .weighted_sums(self.source, target, self.h, weights))
    }
}
