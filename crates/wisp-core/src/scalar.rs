//! Scalar element model.
//!
//! Every element type a kernel can touch implements [`Scalar`], which ties the
//! Rust type to its [`DType`] and to an atomic cell type. Buffers are slices of
//! cells, so the same storage can be written by one logical thread at a time
//! (plain read-modify-write) or by many at once (true fetch-and-add).

use std::fmt;
use std::sync::atomic::{
    AtomicI16, AtomicI32, AtomicI64, AtomicI8, AtomicU16, AtomicU32, AtomicU64, AtomicU8,
    Ordering,
};

use crate::DType;

/// A scalar element type: signed/unsigned integers of 8–64 bits, `f32` or `f64`.
///
/// Integer arithmetic here wraps on overflow, matching the two's-complement
/// behaviour kernels expect from device hardware.
pub trait Scalar:
    Copy + Default + PartialEq + PartialOrd + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    const DTYPE: DType;

    /// Whether gradients flow through values of this type. False for integers.
    const DIFFERENTIABLE: bool;

    /// Interior-mutable storage cell for one element.
    type Cell: Send + Sync;

    fn new_cell(value: Self) -> Self::Cell;

    fn load_cell(cell: &Self::Cell) -> Self;

    fn store_cell(cell: &Self::Cell, value: Self);

    /// Atomic fetch-and-add. Returns the previous value.
    fn fetch_add_cell(cell: &Self::Cell, value: Self) -> Self;

    /// Atomic fetch-and-subtract. Returns the previous value.
    fn fetch_sub_cell(cell: &Self::Cell, value: Self) -> Self;

    fn plus(self, rhs: Self) -> Self;

    fn minus(self, rhs: Self) -> Self;

    fn to_f64(self) -> f64;

    /// Lossy conversion with `as` semantics (floats truncate toward zero and saturate).
    fn from_f64(value: f64) -> Self;

    fn to_i128(self) -> i128;

    /// Conversion with `as` semantics: integers keep their low bits.
    fn from_i128(value: i128) -> Self;
}

/// Convert between scalar types with Rust `as` semantics.
///
/// Integer to integer conversions go through `i128` so no bits are lost on the
/// way; anything involving a float goes through `f64`.
#[inline]
pub fn cast<T: Scalar, U: Scalar>(x: T) -> U {
    if T::DTYPE.is_float() || U::DTYPE.is_float() {
        U::from_f64(x.to_f64())
    } else {
        U::from_i128(x.to_i128())
    }
}

macro_rules! impl_int_scalar {
    ($($ty:ty => $atomic:ty, $dtype:ident);* $(;)?) => {$(
        impl Scalar for $ty {
            const DTYPE: DType = DType::$dtype;
            const DIFFERENTIABLE: bool = false;
            type Cell = $atomic;

            #[inline]
            fn new_cell(value: Self) -> Self::Cell {
                <$atomic>::new(value)
            }

            #[inline]
            fn load_cell(cell: &Self::Cell) -> Self {
                cell.load(Ordering::Relaxed)
            }

            #[inline]
            fn store_cell(cell: &Self::Cell, value: Self) {
                cell.store(value, Ordering::Relaxed)
            }

            #[inline]
            fn fetch_add_cell(cell: &Self::Cell, value: Self) -> Self {
                cell.fetch_add(value, Ordering::Relaxed)
            }

            #[inline]
            fn fetch_sub_cell(cell: &Self::Cell, value: Self) -> Self {
                cell.fetch_sub(value, Ordering::Relaxed)
            }

            #[inline]
            fn plus(self, rhs: Self) -> Self {
                self.wrapping_add(rhs)
            }

            #[inline]
            fn minus(self, rhs: Self) -> Self {
                self.wrapping_sub(rhs)
            }

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f64(value: f64) -> Self {
                value as $ty
            }

            #[inline]
            fn to_i128(self) -> i128 {
                self as i128
            }

            #[inline]
            fn from_i128(value: i128) -> Self {
                value as $ty
            }
        }
    )*};
}

impl_int_scalar! {
    i8 => AtomicI8, I8;
    u8 => AtomicU8, U8;
    i16 => AtomicI16, I16;
    u16 => AtomicU16, U16;
    i32 => AtomicI32, I32;
    u32 => AtomicU32, U32;
    i64 => AtomicI64, I64;
    u64 => AtomicU64, U64;
}

// Floats are stored as their bit pattern; add/sub go through a CAS loop.
macro_rules! impl_float_scalar {
    ($($ty:ty => $atomic:ty, $dtype:ident);* $(;)?) => {$(
        impl Scalar for $ty {
            const DTYPE: DType = DType::$dtype;
            const DIFFERENTIABLE: bool = true;
            type Cell = $atomic;

            #[inline]
            fn new_cell(value: Self) -> Self::Cell {
                <$atomic>::new(value.to_bits())
            }

            #[inline]
            fn load_cell(cell: &Self::Cell) -> Self {
                <$ty>::from_bits(cell.load(Ordering::Relaxed))
            }

            #[inline]
            fn store_cell(cell: &Self::Cell, value: Self) {
                cell.store(value.to_bits(), Ordering::Relaxed)
            }

            #[inline]
            fn fetch_add_cell(cell: &Self::Cell, value: Self) -> Self {
                let prev = match cell.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                    Some((<$ty>::from_bits(bits) + value).to_bits())
                }) {
                    Ok(bits) | Err(bits) => bits,
                };
                <$ty>::from_bits(prev)
            }

            #[inline]
            fn fetch_sub_cell(cell: &Self::Cell, value: Self) -> Self {
                let prev = match cell.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                    Some((<$ty>::from_bits(bits) - value).to_bits())
                }) {
                    Ok(bits) | Err(bits) => bits,
                };
                <$ty>::from_bits(prev)
            }

            #[inline]
            fn plus(self, rhs: Self) -> Self {
                self + rhs
            }

            #[inline]
            fn minus(self, rhs: Self) -> Self {
                self - rhs
            }

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f64(value: f64) -> Self {
                value as $ty
            }

            #[inline]
            fn to_i128(self) -> i128 {
                self as i128
            }

            #[inline]
            fn from_i128(value: i128) -> Self {
                value as $ty
            }
        }
    )*};
}

impl_float_scalar! {
    f32 => AtomicU32, F32;
    f64 => AtomicU64, F64;
}
