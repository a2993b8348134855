//! Value records produced by the EM loop.
//!
//! A record is built fresh every iteration and replaces the previous one;
//! nothing here is mutated in place by the driver.

use super::TransformType;
use cv_core::{Error, Result};
use nalgebra::{DMatrix, DVector};

/// Soft-correspondence statistics of one expectation step.
#[derive(Debug, Clone)]
pub struct EstepResult {
    /// Per target point: probability of being explained by the mixture (N_t)
    pub pt1: DVector<f64>,
    /// Per source point: total responsibility received (N_s)
    pub p1: DVector<f64>,
    /// Responsibility-weighted sum of target positions per source point (N_s×D)
    pub px: DMatrix<f64>,
    /// Total responsibility mass, `Σ p1`
    pub n_p: f64,
}

/// Common accessors of the per-family parameter records.
pub trait TransformRecord {
    fn sigma2(&self) -> f64;
    fn q(&self) -> f64;
}

/// Similarity transform `x ↦ s·R·x + t`.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidResult {
    pub rot: DMatrix<f64>,
    pub t: DVector<f64>,
    pub scale: f64,
    pub sigma2: f64,
    pub q: f64,
}

impl RigidResult {
    pub fn identity(ndim: usize, sigma2: f64, q: f64) -> Self {
        Self {
            rot: DMatrix::identity(ndim, ndim),
            t: DVector::zeros(ndim),
            scale: 1.0,
            sigma2,
            q,
        }
    }

    pub fn ndim(&self) -> usize {
        self.rot.nrows()
    }

    /// Inverse mapping `(Rᵗ, −Rᵗ·t/s, 1/s)`.
    pub fn inverse(&self) -> Result<Self> {
        if self.scale == 0.0 || !self.scale.is_finite() {
            return Err(Error::NumericalDegeneracy(format!(
                "rigid transform with scale {} has no inverse",
                self.scale
            )));
        }
        let rot = self.rot.transpose();
        let t = -(&rot * &self.t) / self.scale;
        Ok(Self {
            rot,
            t,
            scale: 1.0 / self.scale,
            sigma2: self.sigma2,
            q: self.q,
        })
    }

    /// (D+1)×(D+1) homogeneous matrix.
    pub fn to_homogeneous(&self) -> DMatrix<f64> {
        homogeneous(&(&self.rot * self.scale), &self.t)
    }
}

impl TransformRecord for RigidResult {
    fn sigma2(&self) -> f64 {
        self.sigma2
    }

    fn q(&self) -> f64 {
        self.q
    }
}

/// Affine transform `x ↦ B·x + t`.
#[derive(Debug, Clone, PartialEq)]
pub struct AffineResult {
    pub affine: DMatrix<f64>,
    pub t: DVector<f64>,
    pub sigma2: f64,
    pub q: f64,
}

impl AffineResult {
    pub fn identity(ndim: usize, sigma2: f64, q: f64) -> Self {
        Self {
            affine: DMatrix::identity(ndim, ndim),
            t: DVector::zeros(ndim),
            sigma2,
            q,
        }
    }

    pub fn ndim(&self) -> usize {
        self.affine.nrows()
    }

    pub fn inverse(&self) -> Result<Self> {
        let affine = self.affine.clone().try_inverse().ok_or_else(|| {
            Error::NumericalDegeneracy("affine matrix is singular".to_string())
        })?;
        let t = -(&affine * &self.t);
        Ok(Self {
            affine,
            t,
            sigma2: self.sigma2,
            q: self.q,
        })
    }

    pub fn to_homogeneous(&self) -> DMatrix<f64> {
        homogeneous(&self.affine, &self.t)
    }
}

impl TransformRecord for AffineResult {
    fn sigma2(&self) -> f64 {
        self.sigma2
    }

    fn q(&self) -> f64 {
        self.q
    }
}

/// Gaussian RBF displacement field anchored at the source points:
/// `x ↦ x + Σ_i coeff_i · exp(−‖x − y_i‖² / (2β²))`.
#[derive(Debug, Clone, PartialEq)]
pub struct NonRigidResult {
    /// Kernel between control points, N×N
    pub kernel: DMatrix<f64>,
    /// Displacement coefficients, N×D
    pub coeff: DMatrix<f64>,
    /// Kernel centres (the source points), N×D
    pub control_points: DMatrix<f64>,
    pub beta: f64,
    pub sigma2: f64,
    pub q: f64,
}

impl NonRigidResult {
    /// Displacement of every control point, `kernel·coeff`.
    pub fn displacements(&self) -> DMatrix<f64> {
        &self.kernel * &self.coeff
    }
}

impl TransformRecord for NonRigidResult {
    fn sigma2(&self) -> f64 {
        self.sigma2
    }

    fn q(&self) -> f64 {
        self.q
    }
}

/// Parameters of any transform family.
#[derive(Debug, Clone, PartialEq)]
pub enum CpdParams {
    Rigid(RigidResult),
    Affine(AffineResult),
    NonRigid(NonRigidResult),
}

impl CpdParams {
    pub fn transform_type(&self) -> TransformType {
        match self {
            CpdParams::Rigid(_) => TransformType::Rigid,
            CpdParams::Affine(_) => TransformType::Affine,
            CpdParams::NonRigid(_) => TransformType::NonRigid,
        }
    }

    pub fn as_rigid(&self) -> Option<&RigidResult> {
        match self {
            CpdParams::Rigid(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_affine(&self) -> Option<&AffineResult> {
        match self {
            CpdParams::Affine(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_nonrigid(&self) -> Option<&NonRigidResult> {
        match self {
            CpdParams::NonRigid(r) => Some(r),
            _ => None,
        }
    }
}

impl TransformRecord for CpdParams {
    fn sigma2(&self) -> f64 {
        match self {
            CpdParams::Rigid(r) => r.sigma2,
            CpdParams::Affine(r) => r.sigma2,
            CpdParams::NonRigid(r) => r.sigma2,
        }
    }

    fn q(&self) -> f64 {
        match self {
            CpdParams::Rigid(r) => r.q,
            CpdParams::Affine(r) => r.q,
            CpdParams::NonRigid(r) => r.q,
        }
    }
}

/// Terminal state of the EM loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    /// |Δq| dropped below the tolerance
    Converged,
    /// Iteration budget exhausted; the last record is still returned
    MaxIterationReached,
}

/// Output of a registration run.
#[derive(Debug, Clone)]
pub struct CpdRegistration<P> {
    /// Last parameter record
    pub params: P,
    pub state: RegistrationState,
    /// EM iterations performed
    pub num_iterations: usize,
    /// Objective after each iteration
    pub objective_history: Vec<f64>,
}

impl<P> CpdRegistration<P> {
    pub fn converged(&self) -> bool {
        self.state == RegistrationState::Converged
    }

    pub fn map_params<Q>(self, f: impl FnOnce(P) -> Q) -> CpdRegistration<Q> {
        CpdRegistration {
            params: f(self.params),
            state: self.state,
            num_iterations: self.num_iterations,
            objective_history: self.objective_history,
        }
    }
}

fn homogeneous(linear: &DMatrix<f64>, t: &DVector<f64>) -> DMatrix<f64> {
    let d = linear.nrows();
    let mut m = DMatrix::identity(d + 1, d + 1);
    m.view_mut((0, 0), (d, d)).copy_from(linear);
    m.view_mut((0, d), (d, 1)).copy_from(t);
    m
}
