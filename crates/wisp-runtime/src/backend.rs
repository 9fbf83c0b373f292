//! The seam between backend-agnostic kernels and the two executors.

use wisp_core::{Result, Scalar};

use crate::config::{BackendKind, RuntimeConfig};
use crate::context::ThreadContext;
#[cfg(feature = "parallel")]
use crate::parallel::Parallel;
use crate::sequential::Sequential;

/// An executor for data-parallel kernels.
///
/// A backend decides how logical threads are scheduled and how shared
/// accumulation is carried out. Everything else a kernel does is identical on
/// every backend.
pub trait Backend: Send + Sync + Sized + 'static {
    const KIND: BackendKind;

    /// Build the backend from launch settings. `config.backend` is not consulted.
    fn from_config(config: &RuntimeConfig) -> Result<Self>;

    /// Add `value` into `cell`, returning the previous contents.
    fn accumulate<T: Scalar>(cell: &T::Cell, value: T) -> T;

    /// Subtract `value` from `cell`, returning the previous contents.
    fn deplete<T: Scalar>(cell: &T::Cell, value: T) -> T;

    /// Run `kernel` once for every logical thread in `0..dim`.
    ///
    /// Returns once every logical thread has finished.
    fn launch<F>(&self, dim: usize, kernel: F) -> Result<()>
    where
        F: Fn(&ThreadContext<Self>) + Sync;
}

/// A kernel that can be dispatched on any backend.
///
/// Closures can only be launched on a backend known at compile time; a type
/// implementing `Kernel` can also go through [`Runtime`].
pub trait Kernel: Sync {
    fn run<B: Backend>(&self, ctx: &ThreadContext<B>);
}

/// A backend chosen from a [`RuntimeConfig`].
#[derive(Debug)]
pub enum Runtime {
    Sequential(Sequential),
    #[cfg(feature = "parallel")]
    Parallel(Parallel),
}

impl Runtime {
    pub fn new(config: &RuntimeConfig) -> Result<Self> {
        config.validate()?;
        match config.backend {
            BackendKind::Sequential => Ok(Self::Sequential(Sequential::from_config(config)?)),
            #[cfg(feature = "parallel")]
            BackendKind::Parallel => Ok(Self::Parallel(Parallel::from_config(config)?)),
            #[cfg(not(feature = "parallel"))]
            BackendKind::Parallel => Err(wisp_core::WispError::Config(
                "parallel backend requested but the `parallel` feature is disabled".into(),
            )),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Sequential(_) => BackendKind::Sequential,
            #[cfg(feature = "parallel")]
            Self::Parallel(_) => BackendKind::Parallel,
        }
    }

    pub fn launch<K: Kernel>(&self, dim: usize, kernel: &K) -> Result<()> {
        match self {
            Self::Sequential(backend) => backend.launch(dim, |ctx| kernel.run(ctx)),
            #[cfg(feature = "parallel")]
            Self::Parallel(backend) => backend.launch(dim, |ctx| kernel.run(ctx)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wisp_core::{Array, Buffer};

    struct Iota<'a> {
        out: Buffer<'a, i32>,
    }

    impl Kernel for Iota<'_> {
        fn run<B: Backend>(&self, ctx: &ThreadContext<B>) {
            let tid = ctx.tid();
            ctx.store(self.out, tid, tid as i32 * 2);
        }
    }

    #[test]
    fn test_runtime_sequential() {
        let config = RuntimeConfig {
            backend: BackendKind::Sequential,
            ..RuntimeConfig::default()
        };
        let runtime = Runtime::new(&config).unwrap();
        assert_eq!(runtime.kind(), BackendKind::Sequential);

        let out = Array::<i32>::zeros(5);
        runtime.launch(5, &Iota { out: out.buffer() }).unwrap();
        assert_eq!(out.to_vec(), vec![0, 2, 4, 6, 8]);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_runtime_parallel() {
        let config = RuntimeConfig {
            backend: BackendKind::Parallel,
            block_dim: 4,
            num_threads: Some(2),
        };
        let runtime = Runtime::new(&config).unwrap();
        assert_eq!(runtime.kind(), BackendKind::Parallel);

        let out = Array::<i32>::zeros(10);
        runtime.launch(10, &Iota { out: out.buffer() }).unwrap();
        assert_eq!(out.to_vec(), (0..10).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_runtime_rejects_invalid_config() {
        let config = RuntimeConfig {
            block_dim: 0,
            ..RuntimeConfig::default()
        };
        assert!(Runtime::new(&config).is_err());
    }
}
