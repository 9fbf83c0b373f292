//! Multi-threaded backend on rayon thread pools.
//!
//! Pools are built lazily and shared process-wide, one per requested thread count.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use wisp_core::{Result, Scalar, WispError};

use crate::backend::Backend;
use crate::config::{BackendKind, RuntimeConfig};
use crate::context::ThreadContext;
use crate::launch::LaunchConfig;

/// Global registry of thread pools keyed by thread count (0 = rayon's default).
static POOLS: OnceLock<Mutex<HashMap<usize, Arc<ThreadPool>>>> = OnceLock::new();

fn pools() -> &'static Mutex<HashMap<usize, Arc<ThreadPool>>> {
    POOLS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Get or create the pool with `num_threads` workers.
pub fn get_pool(num_threads: usize) -> Result<Arc<ThreadPool>> {
    let mut map = pools().lock();
    if let Some(pool) = map.get(&num_threads) {
        return Ok(Arc::clone(pool));
    }
    let pool = ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("wisp-worker-{i}"))
        .build()
        .map_err(|e| WispError::ThreadPool(format!("{num_threads} threads: {e}")))?;
    let pool = Arc::new(pool);
    tracing::info!(threads = pool.current_num_threads(), "built kernel thread pool");
    map.insert(num_threads, Arc::clone(&pool));
    Ok(pool)
}

/// Runs blocks of logical threads concurrently; accumulation is atomic.
#[derive(Debug, Clone)]
pub struct Parallel {
    pool: Arc<ThreadPool>,
    block_dim: usize,
}

impl Parallel {
    pub fn new(config: &RuntimeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            pool: get_pool(config.num_threads.unwrap_or(0))?,
            block_dim: config.block_dim,
        })
    }

    pub fn block_dim(&self) -> usize {
        self.block_dim
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl Backend for Parallel {
    const KIND: BackendKind = BackendKind::Parallel;

    fn from_config(config: &RuntimeConfig) -> Result<Self> {
        Self::new(config)
    }

    #[inline]
    fn accumulate<T: Scalar>(cell: &T::Cell, value: T) -> T {
        T::fetch_add_cell(cell, value)
    }

    #[inline]
    fn deplete<T: Scalar>(cell: &T::Cell, value: T) -> T {
        T::fetch_sub_cell(cell, value)
    }

    fn launch<F>(&self, dim: usize, kernel: F) -> Result<()>
    where
        F: Fn(&ThreadContext<Self>) + Sync,
    {
        let cfg = LaunchConfig::new(dim, self.block_dim)?;
        tracing::debug!(
            dim,
            grid_dim = cfg.grid_dim,
            block_dim = cfg.block_dim,
            "parallel launch"
        );
        if dim == 0 {
            return Ok(());
        }

        self.pool.install(|| {
            (0..cfg.grid_dim).into_par_iter().for_each(|block_idx| {
                for thread_idx in 0..cfg.block_len(block_idx) {
                    if let Some(tid) = cfg.thread_index(block_idx, thread_idx) {
                        kernel(&ThreadContext::new(tid));
                    }
                }
            });
        });
        Ok(())
    }
}
