//! Core types shared across the registration workspace.
//!
//! - [`PointCloud`]: point container with optional colours and normals
//! - [`Error`] / [`Result`]: error taxonomy used by every crate
//! - [`runtime`]: global Rayon thread pool configuration

pub mod error;
pub mod point_cloud;
pub mod runtime;

pub use error::{Error, Result};
pub use point_cloud::{PointCloud, PointCloudf32, PointCloudf64};
pub use runtime::{current_cpu_threads, init_global_thread_pool, ThreadPoolConfig};
