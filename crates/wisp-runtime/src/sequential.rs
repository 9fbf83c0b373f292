use wisp_core::{Result, Scalar};

use crate::backend::Backend;
use crate::config::{BackendKind, RuntimeConfig};
use crate::context::ThreadContext;

/// Runs one logical thread at a time on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

impl Backend for Sequential {
    const KIND: BackendKind = BackendKind::Sequential;

    fn from_config(_config: &RuntimeConfig) -> Result<Self> {
        Ok(Sequential)
    }

    #[inline]
    fn accumulate<T: Scalar>(cell: &T::Cell, value: T) -> T {
        let prev = T::load_cell(cell);
        T::store_cell(cell, prev.plus(value));
        prev
    }

    #[inline]
    fn deplete<T: Scalar>(cell: &T::Cell, value: T) -> T {
        let prev = T::load_cell(cell);
        T::store_cell(cell, prev.minus(value));
        prev
    }

    fn launch<F>(&self, dim: usize, kernel: F) -> Result<()>
    where
        F: Fn(&ThreadContext<Self>) + Sync,
    {
        tracing::debug!(dim, "sequential launch");
        let mut ctx = ThreadContext::new(0);
        for tid in 0..dim {
            ctx.set_tid(tid);
            kernel(&ctx);
        }
        Ok(())
    }
}
