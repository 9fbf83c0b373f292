//! # wisp-core
//!
//! Shared foundation for the wisp kernel runtime.
//!
//! Provides:
//! - The scalar type model (`DType`, `Scalar`) for 8–64 bit integers and 32/64-bit floats
//! - Atomic element cells so one buffer can be shared by many logical threads
//! - Host-owned `Array` storage and the nullable `Buffer` view kernels operate on
//! - `Vec3` and the `Value` bound used by generic (aggregate) primitives
//! - `Printable`, the single formatting capability behind kernel diagnostics

pub mod dtype;
pub mod scalar;
pub mod array;
pub mod vec3;
pub mod value;
pub mod format;
pub mod error;

pub use dtype::DType;
pub use scalar::{cast, Scalar};
pub use array::{Array, Buffer};
pub use vec3::Vec3;
pub use value::Value;
pub use format::{format_g, Printable};
pub use error::WispError;

pub type Result<T> = std::result::Result<T, WispError>;
