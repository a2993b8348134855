//! Coherent Point Drift (CPD) registration
//!
//! Aligns a source point set to a target point set by treating the source
//! as the centroids of a Gaussian mixture and fitting a transform with EM:
//! - Rigid: rotation, translation and uniform scale
//! - Affine: linear map and translation
//! - Non-rigid: Gaussian radial-basis displacement field
//!
//! Based on "Point Set Registration: Coherent Point Drift" by Myronenko and Song.

pub mod config;
pub mod driver;
pub mod estep;
pub mod gauss_transform;
pub mod math;
pub mod model;
pub mod point_set;
pub mod result;

mod affine;
mod nonrigid;
mod rigid;

pub use affine::AffineCpd;
pub use config::{CpdOption, NonRigidOption};
pub use driver::CoherentPointDrift;
pub use estep::expectation_step;
pub use gauss_transform::{
    DirectGaussTransform, GaussTransform, GaussTransformBackend, GaussTransformMethod,
    ParallelGaussTransform, Weights,
};
pub use model::CpdModel;
pub use nonrigid::NonRigidCpd;
pub use point_set::PointSet;
pub use result::{
    AffineResult, CpdParams, CpdRegistration, EstepResult, NonRigidResult, RegistrationState,
    RigidResult, TransformRecord,
};
pub use rigid::RigidCpd;

use cv_core::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Transform family fitted by [`registration_cpd`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformType {
    Rigid,
    Affine,
    NonRigid,
}

impl TransformType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformType::Rigid => "rigid",
            TransformType::Affine => "affine",
            TransformType::NonRigid => "nonrigid",
        }
    }
}

impl fmt::Display for TransformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransformType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rigid" => Ok(TransformType::Rigid),
            "affine" => Ok(TransformType::Affine),
            "nonrigid" => Ok(TransformType::NonRigid),
            other => Err(Error::invalid_argument(format!(
                "Unknown transform_type {other}"
            ))),
        }
    }
}

/// Coherent Point Drift registration
///
/// Estimates the `transform_type` transform that maps `source` onto
/// `target`. The two sets may have different sizes but must share their
/// dimensionality.
///
/// # Arguments
///
/// * `source` - Points to be moved
/// * `target` - Fixed points
/// * `transform_type` - Transform family to fit
/// * `option` - Outlier weight, iteration budget, tolerance, ...
///
/// # Returns
///
/// The last parameter record together with the convergence state. Running
/// out of iterations is not an error.
///
/// The iteration budget is `option.max_iteration` as given, 50 with
/// [`CpdOption::default`]. Callers used to a budget of 100 for one-shot
/// registration should ask for it explicitly with
/// `CpdOption::default().with_max_iteration(100)`.
///
/// # Example
///
/// ```no_run
/// # use cv_registration::registration::cpd::{registration_cpd, CpdOption, TransformType};
/// # use cv_core::PointCloud;
/// # let source: PointCloud<f64> = PointCloud::default();
/// # let target: PointCloud<f64> = PointCloud::default();
/// let result = registration_cpd(&source, &target, TransformType::Rigid, &CpdOption::default())?;
/// if let Some(rigid) = result.params.as_rigid() {
///     println!("scale {:.3}, sigma2 {:.2e}", rigid.scale, rigid.sigma2);
/// }
/// # Ok::<(), cv_core::Error>(())
/// ```
pub fn registration_cpd<S: PointSet, T: PointSet>(
    source: &S,
    target: &T,
    transform_type: TransformType,
    option: &CpdOption,
) -> Result<CpdRegistration<CpdParams>> {
    let source = source.to_matrix();
    let target = target.to_matrix();

    match transform_type {
        TransformType::Rigid => Ok(CoherentPointDrift::new(RigidCpd, option.clone())
            .registration(&source, &target)?
            .map_params(CpdParams::Rigid)),
        TransformType::Affine => Ok(CoherentPointDrift::new(AffineCpd, option.clone())
            .registration(&source, &target)?
            .map_params(CpdParams::Affine)),
        TransformType::NonRigid => {
            let model = NonRigidCpd::from(option.nonrigid);
            Ok(CoherentPointDrift::new(model, option.clone())
                .registration(&source, &target)?
                .map_params(CpdParams::NonRigid))
        }
    }
}

/// [`registration_cpd`] with the family given by name
/// (`"rigid"`, `"affine"` or `"nonrigid"`).
///
/// An unknown name fails with [`Error::InvalidArgument`] before any
/// computation starts.
pub fn registration_cpd_by_name<S: PointSet, T: PointSet>(
    source: &S,
    target: &T,
    transform_type: &str,
    option: &CpdOption,
) -> Result<CpdRegistration<CpdParams>> {
    let transform_type: TransformType = transform_type.parse()?;
    registration_cpd(source, target, transform_type, option)
}

/// Apply previously estimated parameters to a (possibly different) point
/// set, returning the same kind of container.
pub fn transform<P: PointSet>(points: &P, params: &CpdParams) -> Result<P> {
    let coords = points.to_matrix();
    let moved = match params {
        CpdParams::Rigid(p) => RigidCpd.transform(&coords, p)?,
        CpdParams::Affine(p) => AffineCpd.transform(&coords, p)?,
        CpdParams::NonRigid(p) => NonRigidCpd::default().transform(&coords, p)?,
    };
    points.with_coordinates(&moved)
}
