//! Explicit thread-count handle for voxel-parallel kernels.

use std::num::NonZeroUsize;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{DtkError, Result};

/// Number of worker threads a kernel may use.
///
/// Each kernel call builds its own pool; nothing touches the global rayon
/// pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Parallelism {
    threads: Option<NonZeroUsize>,
}

impl Parallelism {
    /// Use every available core.
    pub fn all_cores() -> Self {
        Self { threads: None }
    }

    /// Use `threads` workers; zero falls back to all cores.
    pub fn with_threads(threads: usize) -> Self {
        Self {
            threads: NonZeroUsize::new(threads),
        }
    }

    pub fn sequential() -> Self {
        Self::with_threads(1)
    }

    /// Resolved worker count.
    pub fn threads(&self) -> usize {
        self.threads
            .or_else(|| std::thread::available_parallelism().ok())
            .map_or(1, NonZeroUsize::get)
    }

    fn pool(&self) -> Result<ThreadPool> {
        ThreadPoolBuilder::new()
            .num_threads(self.threads())
            .build()
            .map_err(|e| DtkError::invalid_configuration(format!("failed to build thread pool: {e}")))
    }

    /// Run `f` on every `slab_len`-sized chunk of `output`, in parallel.
    ///
    /// `f` receives the slab number and the chunk it exclusively owns. The
    /// per-slab results come back in slab order; the first error aborts.
    pub fn map_slabs<T, R, F>(&self, output: &mut [T], slab_len: usize, f: F) -> Result<Vec<R>>
    where
        T: Send,
        R: Send,
        F: Fn(usize, &mut [T]) -> Result<R> + Send + Sync,
    {
        if output.is_empty() || slab_len == 0 {
            return Ok(Vec::new());
        }
        let pool = self.pool()?;
        pool.install(|| {
            output
                .par_chunks_mut(slab_len)
                .enumerate()
                .map(|(slab, chunk)| f(slab, chunk))
                .collect()
        })
    }

    /// Run a closure inside this handle's pool.
    pub fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> Result<R> {
        Ok(self.pool()?.install(op))
    }
}
