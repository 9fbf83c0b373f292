//! # wisp-builtin
//!
//! Elementary primitives that generated kernels call, each paired with a
//! reverse-mode adjoint.
//!
//! The adjoint protocol: for a forward `f(x1..xn) -> y`,
//! `adj_f(x1..xn, &mut adj_x1..&mut adj_xn, adj_y)` adds each input's share of
//! `adj_y` into its accumulator (`acc += contribution`, never `acc = ...`),
//! using the forward inputs rather than recomputed outputs. Backward code calls
//! adjoints in reverse execution order.
//!
//! - `scalar_ops`: arithmetic/comparison for every scalar type (integer adjoints are no-ops)
//! - `float_ops`: transcendental, rounding and leaky comparisons for `f32`/`f64`
//! - `generic`: `select`, `copy`, `neg`, `unot` and casts over arbitrary values
//! - `diagnostics`: `print`, `expect_eq`, `expect_near`

pub mod scalar_ops;
pub mod float_ops;
pub mod generic;
pub mod diagnostics;

pub use scalar_ops::*;
pub use float_ops::*;
pub use generic::*;
pub use diagnostics::*;
