//! Point set registration algorithms
//!
//! This crate provides Coherent Point Drift (CPD) registration:
//! - Rigid CPD (rotation, translation, scale)
//! - Affine CPD
//! - Non-rigid CPD (Gaussian radial-basis deformation field)
//! - Swappable Gauss transform backends (direct, Rayon-parallel)

pub mod registration;

pub use registration::cpd::{
    registration_cpd, registration_cpd_by_name, transform, AffineCpd, AffineResult,
    CoherentPointDrift, CpdModel, CpdOption, CpdParams, CpdRegistration, EstepResult,
    GaussTransform, GaussTransformBackend, GaussTransformMethod, NonRigidCpd, NonRigidOption,
    NonRigidResult, PointSet, RegistrationState, RigidCpd, RigidResult, TransformRecord,
    TransformType,
};
pub use registration::{Error, Result};
