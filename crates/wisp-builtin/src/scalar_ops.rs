//! Arithmetic and comparison primitives shared by every scalar type.
//!
//! Each forward operation `f(x1..xn) -> y` is paired with
//! `adj_f(x1..xn, &mut adj_x1..&mut adj_xn, adj_y)`, which adds each input's
//! contribution into its accumulator. Adjoints only ever add; they never
//! overwrite.
//!
//! Integers are non-differentiable: every integer adjoint is a no-op.
//! Integer division and modulo use Rust's native truncating `/` and `%`.

use wisp_core::Scalar;

/// Arithmetic primitives with adjoints, implemented for every scalar type.
pub trait ScalarOps: Scalar {
    fn add(a: Self, b: Self) -> Self;
    fn adj_add(a: Self, b: Self, adj_a: &mut Self, adj_b: &mut Self, adj_ret: Self);

    fn sub(a: Self, b: Self) -> Self;
    fn adj_sub(a: Self, b: Self, adj_a: &mut Self, adj_b: &mut Self, adj_ret: Self);

    fn mul(a: Self, b: Self) -> Self;
    fn adj_mul(a: Self, b: Self, adj_a: &mut Self, adj_b: &mut Self, adj_ret: Self);

    fn div(a: Self, b: Self) -> Self;
    fn adj_div(a: Self, b: Self, adj_a: &mut Self, adj_b: &mut Self, adj_ret: Self);

    fn modulo(a: Self, b: Self) -> Self;
    fn adj_modulo(a: Self, b: Self, adj_a: &mut Self, adj_b: &mut Self, adj_ret: Self);

    fn min(a: Self, b: Self) -> Self;
    fn adj_min(a: Self, b: Self, adj_a: &mut Self, adj_b: &mut Self, adj_ret: Self);

    fn max(a: Self, b: Self) -> Self;
    fn adj_max(a: Self, b: Self, adj_a: &mut Self, adj_b: &mut Self, adj_ret: Self);

    fn abs(x: Self) -> Self;
    fn adj_abs(x: Self, adj_x: &mut Self, adj_ret: Self);

    fn sign(x: Self) -> Self;
    fn adj_sign(x: Self, adj_x: &mut Self, adj_ret: Self);

    fn clamp(x: Self, a: Self, b: Self) -> Self;
    #[allow(clippy::too_many_arguments)]
    fn adj_clamp(
        x: Self,
        a: Self,
        b: Self,
        adj_x: &mut Self,
        adj_a: &mut Self,
        adj_b: &mut Self,
        adj_ret: Self,
    );

    fn floordiv(a: Self, b: Self) -> Self;
    fn adj_floordiv(a: Self, b: Self, adj_a: &mut Self, adj_b: &mut Self, adj_ret: Self);
}

// Shared by signed and unsigned integers; `abs` and `sign` differ.
macro_rules! int_ops_common {
    () => {
        #[inline]
        fn add(a: Self, b: Self) -> Self {
            a.wrapping_add(b)
        }
        #[inline]
        fn adj_add(_a: Self, _b: Self, _adj_a: &mut Self, _adj_b: &mut Self, _adj_ret: Self) {}

        #[inline]
        fn sub(a: Self, b: Self) -> Self {
            a.wrapping_sub(b)
        }
        #[inline]
        fn adj_sub(_a: Self, _b: Self, _adj_a: &mut Self, _adj_b: &mut Self, _adj_ret: Self) {}

        #[inline]
        fn mul(a: Self, b: Self) -> Self {
            a.wrapping_mul(b)
        }
        #[inline]
        fn adj_mul(_a: Self, _b: Self, _adj_a: &mut Self, _adj_b: &mut Self, _adj_ret: Self) {}

        #[inline]
        fn div(a: Self, b: Self) -> Self {
            a.wrapping_div(b)
        }
        #[inline]
        fn adj_div(_a: Self, _b: Self, _adj_a: &mut Self, _adj_b: &mut Self, _adj_ret: Self) {}

        #[inline]
        fn modulo(a: Self, b: Self) -> Self {
            a.wrapping_rem(b)
        }
        #[inline]
        fn adj_modulo(_a: Self, _b: Self, _adj_a: &mut Self, _adj_b: &mut Self, _adj_ret: Self) {}

        #[inline]
        fn min(a: Self, b: Self) -> Self {
            if a < b { a } else { b }
        }
        #[inline]
        fn adj_min(_a: Self, _b: Self, _adj_a: &mut Self, _adj_b: &mut Self, _adj_ret: Self) {}

        #[inline]
        fn max(a: Self, b: Self) -> Self {
            if a > b { a } else { b }
        }
        #[inline]
        fn adj_max(_a: Self, _b: Self, _adj_a: &mut Self, _adj_b: &mut Self, _adj_ret: Self) {}

        #[inline]
        fn adj_abs(_x: Self, _adj_x: &mut Self, _adj_ret: Self) {}

        #[inline]
        fn adj_sign(_x: Self, _adj_x: &mut Self, _adj_ret: Self) {}

        #[inline]
        fn clamp(x: Self, a: Self, b: Self) -> Self {
            <Self as ScalarOps>::min(<Self as ScalarOps>::max(a, x), b)
        }
        #[inline]
        fn adj_clamp(
            _x: Self,
            _a: Self,
            _b: Self,
            _adj_x: &mut Self,
            _adj_a: &mut Self,
            _adj_b: &mut Self,
            _adj_ret: Self,
        ) {
        }

        /// Truncating division, identical to `div` for integers.
        #[inline]
        fn floordiv(a: Self, b: Self) -> Self {
            a.wrapping_div(b)
        }
        #[inline]
        fn adj_floordiv(_a: Self, _b: Self, _adj_a: &mut Self, _adj_b: &mut Self, _adj_ret: Self) {}
    };
}

macro_rules! impl_signed_int_ops {
    ($($ty:ty),*) => {$(
        impl ScalarOps for $ty {
            int_ops_common!();

            #[inline]
            fn abs(x: Self) -> Self {
                x.wrapping_abs()
            }

            #[inline]
            fn sign(x: Self) -> Self {
                if x < 0 { -1 } else { 1 }
            }
        }
    )*};
}

macro_rules! impl_unsigned_int_ops {
    ($($ty:ty),*) => {$(
        impl ScalarOps for $ty {
            int_ops_common!();

            #[inline]
            fn abs(x: Self) -> Self {
                x
            }

            #[inline]
            fn sign(_x: Self) -> Self {
                1
            }
        }
    )*};
}

impl_signed_int_ops!(i8, i16, i32, i64);
impl_unsigned_int_ops!(u8, u16, u32, u64);

macro_rules! impl_float_ops {
    ($($ty:ty),*) => {$(
        impl ScalarOps for $ty {
            #[inline]
            fn add(a: Self, b: Self) -> Self {
                a + b
            }
            #[inline]
            fn adj_add(_a: Self, _b: Self, adj_a: &mut Self, adj_b: &mut Self, adj_ret: Self) {
                *adj_a += adj_ret;
                *adj_b += adj_ret;
            }

            #[inline]
            fn sub(a: Self, b: Self) -> Self {
                a - b
            }
            #[inline]
            fn adj_sub(_a: Self, _b: Self, adj_a: &mut Self, adj_b: &mut Self, adj_ret: Self) {
                *adj_a += adj_ret;
                *adj_b -= adj_ret;
            }

            #[inline]
            fn mul(a: Self, b: Self) -> Self {
                a * b
            }
            #[inline]
            fn adj_mul(a: Self, b: Self, adj_a: &mut Self, adj_b: &mut Self, adj_ret: Self) {
                *adj_a += b * adj_ret;
                *adj_b += a * adj_ret;
            }

            #[inline]
            fn div(a: Self, b: Self) -> Self {
                a / b
            }
            #[inline]
            fn adj_div(a: Self, b: Self, adj_a: &mut Self, adj_b: &mut Self, adj_ret: Self) {
                *adj_a += adj_ret / b;
                *adj_b -= adj_ret * (a / b) / b;
            }

            /// C `fmod`: the result has the sign of `a`.
            #[inline]
            fn modulo(a: Self, b: Self) -> Self {
                a % b
            }
            #[inline]
            fn adj_modulo(_a: Self, _b: Self, _adj_a: &mut Self, _adj_b: &mut Self, _adj_ret: Self) {
                tracing::warn!("adj_mod not implemented for floating point types");
            }

            #[inline]
            fn min(a: Self, b: Self) -> Self {
                if a < b { a } else { b }
            }
            #[inline]
            fn adj_min(a: Self, b: Self, adj_a: &mut Self, adj_b: &mut Self, adj_ret: Self) {
                if a < b {
                    *adj_a += adj_ret;
                } else {
                    *adj_b += adj_ret;
                }
            }

            #[inline]
            fn max(a: Self, b: Self) -> Self {
                if a > b { a } else { b }
            }
            #[inline]
            fn adj_max(a: Self, b: Self, adj_a: &mut Self, adj_b: &mut Self, adj_ret: Self) {
                if a > b {
                    *adj_a += adj_ret;
                } else {
                    *adj_b += adj_ret;
                }
            }

            #[inline]
            fn abs(x: Self) -> Self {
                x.abs()
            }
            #[inline]
            fn adj_abs(x: Self, adj_x: &mut Self, adj_ret: Self) {
                if x < 0.0 {
                    *adj_x -= adj_ret;
                } else {
                    *adj_x += adj_ret;
                }
            }

            /// `-1` for `x <= 0`, `+1` otherwise. Zero is not special-cased.
            #[inline]
            fn sign(x: Self) -> Self {
                if x <= 0.0 { -1.0 } else { 1.0 }
            }
            #[inline]
            fn adj_sign(_x: Self, _adj_x: &mut Self, _adj_ret: Self) {}

            #[inline]
            fn clamp(x: Self, a: Self, b: Self) -> Self {
                <Self as ScalarOps>::min(<Self as ScalarOps>::max(a, x), b)
            }
            #[inline]
            fn adj_clamp(
                x: Self,
                a: Self,
                b: Self,
                adj_x: &mut Self,
                adj_a: &mut Self,
                adj_b: &mut Self,
                adj_ret: Self,
            ) {
                if x < a {
                    *adj_a += adj_ret;
                } else if x > b {
                    *adj_b += adj_ret;
                } else {
                    *adj_x += adj_ret;
                }
            }

            /// Truncates `a / b` toward zero.
            #[inline]
            fn floordiv(a: Self, b: Self) -> Self {
                (a / b).trunc()
            }
            #[inline]
            fn adj_floordiv(_a: Self, _b: Self, _adj_a: &mut Self, _adj_b: &mut Self, _adj_ret: Self) {}
        }
    )*};
}

impl_float_ops!(f32, f64);

// Free-function entry points, the form generated kernel code calls.

#[inline]
pub fn add<T: ScalarOps>(a: T, b: T) -> T {
    <T as ScalarOps>::add(a, b)
}

#[inline]
pub fn adj_add<T: ScalarOps>(a: T, b: T, adj_a: &mut T, adj_b: &mut T, adj_ret: T) {
    <T as ScalarOps>::adj_add(a, b, adj_a, adj_b, adj_ret)
}

#[inline]
pub fn sub<T: ScalarOps>(a: T, b: T) -> T {
    <T as ScalarOps>::sub(a, b)
}

#[inline]
pub fn adj_sub<T: ScalarOps>(a: T, b: T, adj_a: &mut T, adj_b: &mut T, adj_ret: T) {
    <T as ScalarOps>::adj_sub(a, b, adj_a, adj_b, adj_ret)
}

#[inline]
pub fn mul<T: ScalarOps>(a: T, b: T) -> T {
    <T as ScalarOps>::mul(a, b)
}

#[inline]
pub fn adj_mul<T: ScalarOps>(a: T, b: T, adj_a: &mut T, adj_b: &mut T, adj_ret: T) {
    <T as ScalarOps>::adj_mul(a, b, adj_a, adj_b, adj_ret)
}

#[inline]
pub fn div<T: ScalarOps>(a: T, b: T) -> T {
    <T as ScalarOps>::div(a, b)
}

#[inline]
pub fn adj_div<T: ScalarOps>(a: T, b: T, adj_a: &mut T, adj_b: &mut T, adj_ret: T) {
    <T as ScalarOps>::adj_div(a, b, adj_a, adj_b, adj_ret)
}

/// Remainder (`mod`): truncating `%` for integers, `fmod` for floats.
#[inline]
pub fn modulo<T: ScalarOps>(a: T, b: T) -> T {
    <T as ScalarOps>::modulo(a, b)
}

/// Unsupported for floats: reports a warning and accumulates nothing.
#[inline]
pub fn adj_modulo<T: ScalarOps>(a: T, b: T, adj_a: &mut T, adj_b: &mut T, adj_ret: T) {
    <T as ScalarOps>::adj_modulo(a, b, adj_a, adj_b, adj_ret)
}

#[inline]
pub fn min<T: ScalarOps>(a: T, b: T) -> T {
    <T as ScalarOps>::min(a, b)
}

/// Routes the gradient to `a` when `a < b`, otherwise (ties included) to `b`.
#[inline]
pub fn adj_min<T: ScalarOps>(a: T, b: T, adj_a: &mut T, adj_b: &mut T, adj_ret: T) {
    <T as ScalarOps>::adj_min(a, b, adj_a, adj_b, adj_ret)
}

#[inline]
pub fn max<T: ScalarOps>(a: T, b: T) -> T {
    <T as ScalarOps>::max(a, b)
}

/// Routes the gradient to `a` when `a > b`, otherwise (ties included) to `b`.
#[inline]
pub fn adj_max<T: ScalarOps>(a: T, b: T, adj_a: &mut T, adj_b: &mut T, adj_ret: T) {
    <T as ScalarOps>::adj_max(a, b, adj_a, adj_b, adj_ret)
}

#[inline]
pub fn abs<T: ScalarOps>(x: T) -> T {
    <T as ScalarOps>::abs(x)
}

#[inline]
pub fn adj_abs<T: ScalarOps>(x: T, adj_x: &mut T, adj_ret: T) {
    <T as ScalarOps>::adj_abs(x, adj_x, adj_ret)
}

#[inline]
pub fn sign<T: ScalarOps>(x: T) -> T {
    <T as ScalarOps>::sign(x)
}

#[inline]
pub fn adj_sign<T: ScalarOps>(x: T, adj_x: &mut T, adj_ret: T) {
    <T as ScalarOps>::adj_sign(x, adj_x, adj_ret)
}

/// `min(max(a, x), b)`.
#[inline]
pub fn clamp<T: ScalarOps>(x: T, a: T, b: T) -> T {
    <T as ScalarOps>::clamp(x, a, b)
}

/// Routes the gradient to `a` iff `x < a`, to `b` iff `x > b`, else to `x`.
#[allow(clippy::too_many_arguments)]
#[inline]
pub fn adj_clamp<T: ScalarOps>(
    x: T,
    a: T,
    b: T,
    adj_x: &mut T,
    adj_a: &mut T,
    adj_b: &mut T,
    adj_ret: T,
) {
    <T as ScalarOps>::adj_clamp(x, a, b, adj_x, adj_a, adj_b, adj_ret)
}

#[inline]
pub fn floordiv<T: ScalarOps>(a: T, b: T) -> T {
    <T as ScalarOps>::floordiv(a, b)
}

#[inline]
pub fn adj_floordiv<T: ScalarOps>(a: T, b: T, adj_a: &mut T, adj_b: &mut T, adj_ret: T) {
    <T as ScalarOps>::adj_floordiv(a, b, adj_a, adj_b, adj_ret)
}

/// Loop-condition helper for range loops with a step of either sign.
///
/// A zero step never iterates.
#[inline]
pub fn range_cmp(iter: i32, end: i32, step: i32) -> bool {
    if step == 0 {
        false
    } else if step > 0 {
        iter < end
    } else {
        iter > end
    }
}
