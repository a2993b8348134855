pub use cv_core as core;
pub use cv_registration as registration;

pub use cv_registration::{registration_cpd, transform, CpdOption, CpdParams, TransformType};

/// Initialize the global Rayon thread pool used by the parallel Gauss
/// transform.
///
/// Call this once at application startup before registering large point
/// sets. Repeated calls are idempotent and return the first initialization
/// result.
///
/// Priority order:
/// 1. explicit `num_threads`
/// 2. `RUSTCV_CPU_THREADS` env var
/// 3. Rayon default
pub fn init_thread_pool(num_threads: Option<usize>) -> cv_core::Result<()> {
    cv_core::init_global_thread_pool(num_threads)
}
