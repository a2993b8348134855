//! Registration Module
//!
//! Implements probabilistic point set registration:
//! - CPD (Coherent Point Drift) for rigid, affine and non-rigid transforms

pub mod cpd;

pub use cpd::{
    registration_cpd, registration_cpd_by_name, transform, CpdOption, CpdParams,
    CpdRegistration, TransformType,
};
pub use cv_core::{Error, Result};
