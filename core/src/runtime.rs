//! Global Rayon pool used by the parallel Gauss transform.

use crate::{Error, Result};
use rayon::ThreadPoolBuilder;
use std::env;
use std::sync::OnceLock;

/// Environment variable consulted when no explicit thread count is given.
pub const CPU_THREADS_ENV: &str = "RUSTCV_CPU_THREADS";

static THREAD_POOL_INIT: OnceLock<Result<()>> = OnceLock::new();

/// Thread pool sizing, resolved from an explicit count or the environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThreadPoolConfig {
    /// `None` leaves the choice to Rayon.
    pub num_threads: Option<usize>,
}

impl ThreadPoolConfig {
    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads: Some(num_threads),
        }
    }

    /// Read [`CPU_THREADS_ENV`]; an unset variable yields the Rayon default.
    pub fn from_env() -> Result<Self> {
        match env::var(CPU_THREADS_ENV) {
            Ok(raw) => parse_thread_count(&raw).map(Self::with_threads),
            Err(env::VarError::NotPresent) => Ok(Self::default()),
            Err(e) => Err(Error::InvalidArgument(format!(
                "failed to read {CPU_THREADS_ENV}: {e}"
            ))),
        }
    }

    fn build_global(self) -> Result<()> {
        let mut builder = ThreadPoolBuilder::new();
        if let Some(n) = self.num_threads {
            if n == 0 {
                return Err(Error::InvalidArgument(format!(
                    "{CPU_THREADS_ENV} must be >= 1"
                )));
            }
            builder = builder.num_threads(n);
        }
        builder
            .build_global()
            .map_err(|e| Error::InvalidArgument(e.to_string()))
    }
}

/// Initialize the global Rayon thread pool.
///
/// Priority:
/// 1. `num_threads` argument
/// 2. `RUSTCV_CPU_THREADS` environment variable
/// 3. Rayon default
///
/// Only the first call has an effect; later calls return its outcome.
pub fn init_global_thread_pool(num_threads: Option<usize>) -> Result<()> {
    THREAD_POOL_INIT
        .get_or_init(|| {
            let config = match num_threads {
                Some(n) => ThreadPoolConfig::with_threads(n),
                None => ThreadPoolConfig::from_env()?,
            };
            config.build_global()
        })
        .clone()
}

pub fn current_cpu_threads() -> usize {
    rayon::current_num_threads()
}

fn parse_thread_count(raw: &str) -> Result<usize> {
    let parsed: usize = raw.trim().parse().map_err(|_| {
        Error::InvalidArgument(format!(
            "{CPU_THREADS_ENV} must be a positive integer, got '{raw}'"
        ))
    })?;
    if parsed == 0 {
        return Err(Error::InvalidArgument(format!(
            "{CPU_THREADS_ENV} must be >= 1"
        )));
    }
    Ok(parsed)
}
