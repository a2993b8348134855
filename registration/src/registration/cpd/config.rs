//! Registration options.

use super::gauss_transform::GaussTransformMethod;
use cv_core::{Error, Result};

/// Hyper-parameters of the non-rigid (Gaussian RBF) deformation field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NonRigidOption {
    /// Width of the Gaussian kernel between control points
    pub beta: f64,
    /// Smoothness regularization weight
    pub lambda: f64,
}

impl Default for NonRigidOption {
    fn default() -> Self {
        Self {
            beta: 2.0,
            lambda: 2.0,
        }
    }
}

impl NonRigidOption {
    pub fn validate(&self) -> Result<()> {
        if !(self.beta.is_finite() && self.beta > 0.0) {
            return Err(Error::invalid_argument(format!(
                "beta must be positive, got {}",
                self.beta
            )));
        }
        if !(self.lambda.is_finite() && self.lambda > 0.0) {
            return Err(Error::invalid_argument(format!(
                "lambda must be positive, got {}",
                self.lambda
            )));
        }
        Ok(())
    }
}

/// Options for Coherent Point Drift registration
#[derive(Debug, Clone, PartialEq)]
pub struct CpdOption {
    /// Prior mass of the uniform outlier component, in [0, 1)
    pub outlier_weight: f64,
    /// EM iteration cap
    pub max_iteration: usize,
    /// Convergence threshold on the objective change |Δq|
    pub tolerance: f64,
    /// Variance floor; smaller estimates are clamped to it
    pub min_sigma2: f64,
    /// Kernel-sum backend
    pub gauss_transform: GaussTransformMethod,
    pub nonrigid: NonRigidOption,
    /// Starting variance, `None` = mean squared pairwise distance
    pub initial_sigma2: Option<f64>,
}

impl Default for CpdOption {
    fn default() -> Self {
        Self {
            outlier_weight: 0.0,
            max_iteration: 50,
            tolerance: 1e-3,
            min_sigma2: f32::EPSILON as f64,
            gauss_transform: GaussTransformMethod::default(),
            nonrigid: NonRigidOption::default(),
            initial_sigma2: None,
        }
    }
}

impl CpdOption {
    /// Tight tolerance, generous iteration budget
    pub fn precise() -> Self {
        Self {
            max_iteration: 200,
            tolerance: 1e-8,
            ..Default::default()
        }
    }

    /// Loose tolerance for coarse alignment
    pub fn fast() -> Self {
        Self {
            max_iteration: 20,
            tolerance: 1e-2,
            ..Default::default()
        }
    }

    /// Reserve `outlier_weight` of the mixture for unmatched points
    pub fn robust(outlier_weight: f64) -> Self {
        Self {
            outlier_weight,
            ..Default::default()
        }
    }

    pub fn with_outlier_weight(mut self, outlier_weight: f64) -> Self {
        self.outlier_weight = outlier_weight;
        self
    }

    pub fn with_max_iteration(mut self, max_iteration: usize) -> Self {
        self.max_iteration = max_iteration;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_gauss_transform(mut self, method: GaussTransformMethod) -> Self {
        self.gauss_transform = method;
        self
    }

    pub fn with_nonrigid(mut self, beta: f64, lambda: f64) -> Self {
        self.nonrigid = NonRigidOption { beta, lambda };
        self
    }

    pub fn with_initial_sigma2(mut self, sigma2: f64) -> Self {
        self.initial_sigma2 = Some(sigma2);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.outlier_weight) {
            return Err(Error::invalid_argument(format!(
                "outlier weight must be in [0, 1), got {}",
                self.outlier_weight
            )));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(Error::invalid_argument(format!(
                "tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        if !(self.min_sigma2.is_finite() && self.min_sigma2 > 0.0) {
            return Err(Error::invalid_argument(format!(
                "variance floor must be positive, got {}",
                self.min_sigma2
            )));
        }
        if let Some(sigma2) = self.initial_sigma2 {
            if !(sigma2.is_finite() && sigma2 > 0.0) {
                return Err(Error::invalid_argument(format!(
                    "initial variance must be positive, got {sigma2}"
                )));
            }
        }
        self.nonrigid.validate()
    }
}
