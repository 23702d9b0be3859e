//! Concurrency strategies and the thread pools behind them.

use rayon::{ThreadPool, ThreadPoolBuilder};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
#[cfg(test)]
use std::sync::Weak;

use crate::error::{ChainError, Result};

/// How a batch is spread over threads. Chosen once when the job is built.
#[derive(Clone)]
pub enum ConcurrencyStrategy {
    /// One image after another. Synchronous runs stay on the caller thread.
    Sequential,
    /// A pool of exactly `n` threads, created for the job.
    FixedPool(NonZeroUsize),
    /// A pool sized to the machine's available parallelism, created for the job.
    ElasticPool,
    /// A caller-supplied pool. The job borrows it and never shuts it down.
    Executor(Arc<ThreadPool>),
}

impl ConcurrencyStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            ConcurrencyStrategy::Sequential => "sequential",
            ConcurrencyStrategy::FixedPool(_) => "fixed",
            ConcurrencyStrategy::ElasticPool => "elastic",
            ConcurrencyStrategy::Executor(_) => "executor",
        }
    }

    /// Worker count this strategy will use.
    pub fn threads(&self) -> usize {
        match self {
            ConcurrencyStrategy::Sequential => 1,
            ConcurrencyStrategy::FixedPool(n) => n.get(),
            ConcurrencyStrategy::ElasticPool => elastic_threads(),
            ConcurrencyStrategy::Executor(pool) => pool.current_num_threads(),
        }
    }

    /// Resolve to a pool. Job-owned pools shut down when the last handle drops.
    pub(crate) fn pool(&self) -> Result<PoolHandle> {
        match self {
            ConcurrencyStrategy::Sequential => OwnedPool::create(1, "sequential"),
            ConcurrencyStrategy::FixedPool(n) => OwnedPool::create(n.get(), "fixed"),
            ConcurrencyStrategy::ElasticPool => OwnedPool::create(elastic_threads(), "elastic"),
            ConcurrencyStrategy::Executor(pool) => Ok(PoolHandle::Borrowed(Arc::clone(pool))),
        }
    }
}

impl fmt::Debug for ConcurrencyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConcurrencyStrategy::Sequential => f.write_str("Sequential"),
            ConcurrencyStrategy::FixedPool(n) => f.debug_tuple("FixedPool").field(n).finish(),
            ConcurrencyStrategy::ElasticPool => f.write_str("ElasticPool"),
            ConcurrencyStrategy::Executor(pool) => f
                .debug_struct("Executor")
                .field("threads", &pool.current_num_threads())
                .finish(),
        }
    }
}

fn elastic_threads() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// A pool created by a batch job.
pub(crate) struct OwnedPool {
    pool: ThreadPool,
    label: &'static str,
}

impl OwnedPool {
    fn create(threads: usize, label: &'static str) -> Result<PoolHandle> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |i| format!("rasterchain-{}-{}", label, i))
            .panic_handler(|_| tracing::error!("Batch worker panicked"))
            .build()
            .map_err(|e| ChainError::processing(format!("failed to create thread pool: {}", e)))?;

        tracing::debug!(strategy = label, threads, "Created batch thread pool");
        Ok(PoolHandle::Owned(Arc::new(OwnedPool { pool, label })))
    }
}

impl Drop for OwnedPool {
    fn drop(&mut self) {
        tracing::debug!(strategy = self.label, "Shutting down batch thread pool");
    }
}

/// A pool the job may run on, either owned by the job or borrowed from the caller.
#[derive(Clone)]
pub(crate) enum PoolHandle {
    Owned(Arc<OwnedPool>),
    Borrowed(Arc<ThreadPool>),
}

impl PoolHandle {
    pub(crate) fn pool(&self) -> &ThreadPool {
        match self {
            PoolHandle::Owned(owned) => &owned.pool,
            PoolHandle::Borrowed(pool) => pool,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_owned(&self) -> bool {
        matches!(self, PoolHandle::Owned(_))
    }

    #[cfg(test)]
    pub(crate) fn downgrade_owned(&self) -> Option<Weak<OwnedPool>> {
        match self {
            PoolHandle::Owned(owned) => Some(Arc::downgrade(owned)),
            PoolHandle::Borrowed(_) => None,
        }
    }
}
