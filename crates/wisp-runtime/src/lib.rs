//! # wisp-runtime
//!
//! Memory access, atomics and thread-index dispatch for generated kernels.
//!
//! Kernels are written once against [`ThreadContext`] and run on either backend:
//!
//! - [`Sequential`]: one logical thread at a time, driven by a loop that sets the
//!   context's thread index before each iteration. Accumulation is a plain
//!   read-modify-write.
//! - [`Parallel`] (feature `parallel`, on by default): blocks of logical threads
//!   on a rayon pool. The thread index is derived from block/thread coordinates
//!   and every accumulation is a true atomic fetch-and-add.
//!
//! [`DefaultBackend`] picks one at compile time; [`Runtime`] picks one from a
//! [`RuntimeConfig`] at run time.

pub mod backend;
pub mod config;
pub mod context;
pub mod launch;
#[cfg(feature = "parallel")]
pub mod parallel;
pub mod sequential;
pub mod sort;

pub use backend::{Backend, Kernel, Runtime};
pub use config::{BackendKind, RuntimeConfig};
pub use context::ThreadContext;
pub use launch::{grid_1d, LaunchConfig};
#[cfg(feature = "parallel")]
pub use parallel::Parallel;
pub use sequential::Sequential;
pub use sort::{RadixSortKey, SegmentedSortKey, SortBackend};

/// The backend selected at build time.
#[cfg(feature = "parallel")]
pub type DefaultBackend = Parallel;

/// The backend selected at build time.
#[cfg(not(feature = "parallel"))]
pub type DefaultBackend = Sequential;
