//! Debug printing and soft assertions callable from kernels.
//!
//! None of these alter control flow: a failed expectation is reported through
//! `tracing` and execution continues. Their adjoints never touch a gradient.

use wisp_core::{Printable, Vec3};

/// Print a value on its own line (C `%g` for floats, rows on separate lines).
pub fn print<T: Printable + ?Sized>(value: &T) {
    println!("{}", value.to_kernel_string());
}

/// Print a value together with its adjoint during the backward pass.
pub fn adj_print<T: Printable + ?Sized>(value: &T, adj_value: &T) {
    println!("{} adj: {}", value.to_kernel_string(), adj_value.to_kernel_string());
}

/// Report when `actual != expected`. Returns whether the values matched.
pub fn expect_eq<T: PartialEq + Printable>(actual: &T, expected: &T) -> bool {
    if actual == expected {
        return true;
    }
    tracing::error!(
        expected = %expected.to_kernel_string(),
        actual = %actual.to_kernel_string(),
        "expect_eq() failed"
    );
    false
}

pub fn adj_expect_eq<T>(_actual: &T, _expected: &T, _adj_actual: &mut T, _adj_expected: &mut T) {}

/// Values [`expect_near`] can compare against a tolerance of the same type.
pub trait NearEq: Copy + Printable {
    /// Whether `self` and `other` are further apart than `tolerance`.
    fn exceeds(self, other: Self, tolerance: Self) -> bool;
}

macro_rules! impl_near_eq_signed {
    ($($ty:ty),*) => {$(
        impl NearEq for $ty {
            #[inline]
            fn exceeds(self, other: Self, tolerance: Self) -> bool {
                tolerance < 0 || self.abs_diff(other) > tolerance.unsigned_abs()
            }
        }
    )*};
}

macro_rules! impl_near_eq_unsigned {
    ($($ty:ty),*) => {$(
        impl NearEq for $ty {
            #[inline]
            fn exceeds(self, other: Self, tolerance: Self) -> bool {
                self.abs_diff(other) > tolerance
            }
        }
    )*};
}

macro_rules! impl_near_eq_float {
    ($($ty:ty),*) => {$(
        impl NearEq for $ty {
            /// A NaN difference never exceeds, matching a plain `>` comparison.
            #[inline]
            fn exceeds(self, other: Self, tolerance: Self) -> bool {
                (self - other).abs() > tolerance
            }
        }
    )*};
}

impl_near_eq_signed!(i8, i16, i32, i64);
impl_near_eq_unsigned!(u8, u16, u32, u64);
impl_near_eq_float!(f32, f64);

/// Component-wise: fails if any component is off by more than its tolerance.
impl NearEq for Vec3 {
    fn exceeds(self, other: Self, tolerance: Self) -> bool {
        self.x.exceeds(other.x, tolerance.x)
            || self.y.exceeds(other.y, tolerance.y)
            || self.z.exceeds(other.z, tolerance.z)
    }
}

/// Report when `|actual - expected| > tolerance`. Returns whether the check passed.
pub fn expect_near<T: NearEq>(actual: T, expected: T, tolerance: T) -> bool {
    if actual.exceeds(expected, tolerance) {
        tracing::error!(
            tolerance = %tolerance.to_kernel_string(),
            expected = %expected.to_kernel_string(),
            actual = %actual.to_kernel_string(),
            "expect_near() failed"
        );
        return false;
    }
    true
}

#[allow(clippy::too_many_arguments)]
pub fn adj_expect_near<T>(
    _actual: T,
    _expected: T,
    _tolerance: T,
    _adj_actual: &mut T,
    _adj_expected: &mut T,
    _adj_tolerance: &mut T,
) {
}
