//! Transcendental, rounding and leaky-comparison primitives for `f32`/`f64`.
//!
//! Adjoints use the closed-form derivative evaluated at the forward inputs.
//! Piecewise-constant operations (`round`, `rint`, `trunc`, `floor`, `ceil`,
//! `step`, `nonzero`) have no-op adjoints. `atan2` has no adjoint yet: calling
//! it only emits a warning.

use crate::scalar_ops::ScalarOps;

/// Floating-point-only primitives with adjoints.
pub trait FloatOps: ScalarOps {
    fn log(x: Self) -> Self;
    fn adj_log(x: Self, adj_x: &mut Self, adj_ret: Self);

    fn exp(x: Self) -> Self;
    fn adj_exp(x: Self, adj_x: &mut Self, adj_ret: Self);

    fn pow(a: Self, b: Self) -> Self;
    fn adj_pow(a: Self, b: Self, adj_a: &mut Self, adj_b: &mut Self, adj_ret: Self);

    fn sqrt(x: Self) -> Self;
    fn adj_sqrt(x: Self, adj_x: &mut Self, adj_ret: Self);

    fn sin(x: Self) -> Self;
    fn adj_sin(x: Self, adj_x: &mut Self, adj_ret: Self);

    fn cos(x: Self) -> Self;
    fn adj_cos(x: Self, adj_x: &mut Self, adj_ret: Self);

    fn tan(x: Self) -> Self;
    fn adj_tan(x: Self, adj_x: &mut Self, adj_ret: Self);

    fn asin(x: Self) -> Self;
    fn adj_asin(x: Self, adj_x: &mut Self, adj_ret: Self);

    fn acos(x: Self) -> Self;
    fn adj_acos(x: Self, adj_x: &mut Self, adj_ret: Self);

    fn atan(x: Self) -> Self;
    fn adj_atan(x: Self, adj_x: &mut Self, adj_ret: Self);

    fn atan2(y: Self, x: Self) -> Self;
    fn adj_atan2(y: Self, x: Self, adj_y: &mut Self, adj_x: &mut Self, adj_ret: Self);

    fn sinh(x: Self) -> Self;
    fn adj_sinh(x: Self, adj_x: &mut Self, adj_ret: Self);

    fn cosh(x: Self) -> Self;
    fn adj_cosh(x: Self, adj_x: &mut Self, adj_ret: Self);

    fn tanh(x: Self) -> Self;
    fn adj_tanh(x: Self, adj_x: &mut Self, adj_ret: Self);

    fn round(x: Self) -> Self;
    fn rint(x: Self) -> Self;
    fn trunc(x: Self) -> Self;
    fn floor(x: Self) -> Self;
    fn ceil(x: Self) -> Self;
    fn step(x: Self) -> Self;
    fn nonzero(x: Self) -> Self;

    fn leaky_min(a: Self, b: Self, r: Self) -> Self;
    #[allow(clippy::too_many_arguments)]
    fn adj_leaky_min(
        a: Self,
        b: Self,
        r: Self,
        adj_a: &mut Self,
        adj_b: &mut Self,
        adj_r: &mut Self,
        adj_ret: Self,
    );

    fn leaky_max(a: Self, b: Self, r: Self) -> Self;
    #[allow(clippy::too_many_arguments)]
    fn adj_leaky_max(
        a: Self,
        b: Self,
        r: Self,
        adj_a: &mut Self,
        adj_b: &mut Self,
        adj_r: &mut Self,
        adj_ret: Self,
    );
}

macro_rules! impl_float_transcendental {
    ($($ty:ty),*) => {$(
        impl FloatOps for $ty {
            #[inline]
            fn log(x: Self) -> Self {
                x.ln()
            }
            #[inline]
            fn adj_log(x: Self, adj_x: &mut Self, adj_ret: Self) {
                *adj_x += (1.0 / x) * adj_ret;
            }

            #[inline]
            fn exp(x: Self) -> Self {
                x.exp()
            }
            #[inline]
            fn adj_exp(x: Self, adj_x: &mut Self, adj_ret: Self) {
                *adj_x += x.exp() * adj_ret;
            }

            #[inline]
            fn pow(a: Self, b: Self) -> Self {
                a.powf(b)
            }
            #[inline]
            fn adj_pow(a: Self, b: Self, adj_a: &mut Self, adj_b: &mut Self, adj_ret: Self) {
                *adj_a += b * a.powf(b - 1.0) * adj_ret;
                *adj_b += a.ln() * a.powf(b) * adj_ret;
            }

            #[inline]
            fn sqrt(x: Self) -> Self {
                x.sqrt()
            }
            #[inline]
            fn adj_sqrt(x: Self, adj_x: &mut Self, adj_ret: Self) {
                *adj_x += 0.5 * (1.0 / x.sqrt()) * adj_ret;
            }

            #[inline]
            fn sin(x: Self) -> Self {
                x.sin()
            }
            #[inline]
            fn adj_sin(x: Self, adj_x: &mut Self, adj_ret: Self) {
                *adj_x += x.cos() * adj_ret;
            }

            #[inline]
            fn cos(x: Self) -> Self {
                x.cos()
            }
            #[inline]
            fn adj_cos(x: Self, adj_x: &mut Self, adj_ret: Self) {
                *adj_x -= x.sin() * adj_ret;
            }

            #[inline]
            fn tan(x: Self) -> Self {
                x.tan()
            }
            #[inline]
            fn adj_tan(x: Self, adj_x: &mut Self, adj_ret: Self) {
                let cos_x = x.cos();
                *adj_x += (1.0 / (cos_x * cos_x)) * adj_ret;
            }

            /// Input is clamped to `[-1, 1]` first.
            #[inline]
            fn asin(x: Self) -> Self {
                x.clamp(-1.0, 1.0).asin()
            }
            #[inline]
            fn adj_asin(x: Self, adj_x: &mut Self, adj_ret: Self) {
                let d = (1.0 - x * x).sqrt();
                if d > 0.0 {
                    *adj_x += (1.0 / d) * adj_ret;
                }
            }

            /// Input is clamped to `[-1, 1]` first.
            #[inline]
            fn acos(x: Self) -> Self {
                x.clamp(-1.0, 1.0).acos()
            }
            #[inline]
            fn adj_acos(x: Self, adj_x: &mut Self, adj_ret: Self) {
                let d = (1.0 - x * x).sqrt();
                if d > 0.0 {
                    *adj_x -= (1.0 / d) * adj_ret;
                }
            }

            #[inline]
            fn atan(x: Self) -> Self {
                x.atan()
            }
            #[inline]
            fn adj_atan(x: Self, adj_x: &mut Self, adj_ret: Self) {
                *adj_x += adj_ret / (x * x + 1.0);
            }

            #[inline]
            fn atan2(y: Self, x: Self) -> Self {
                y.atan2(x)
            }
            #[inline]
            fn adj_atan2(_y: Self, _x: Self, _adj_y: &mut Self, _adj_x: &mut Self, _adj_ret: Self) {
                tracing::warn!("atan2 adjoint not implemented");
            }

            #[inline]
            fn sinh(x: Self) -> Self {
                x.sinh()
            }
            #[inline]
            fn adj_sinh(x: Self, adj_x: &mut Self, adj_ret: Self) {
                *adj_x += x.cosh() * adj_ret;
            }

            #[inline]
            fn cosh(x: Self) -> Self {
                x.cosh()
            }
            #[inline]
            fn adj_cosh(x: Self, adj_x: &mut Self, adj_ret: Self) {
                *adj_x += x.sinh() * adj_ret;
            }

            #[inline]
            fn tanh(x: Self) -> Self {
                x.tanh()
            }
            #[inline]
            fn adj_tanh(x: Self, adj_x: &mut Self, adj_ret: Self) {
                let tanh_x = x.tanh();
                *adj_x += (1.0 - tanh_x * tanh_x) * adj_ret;
            }

            /// Halfway cases round away from zero.
            #[inline]
            fn round(x: Self) -> Self {
                x.round()
            }

            /// Halfway cases round to even.
            #[inline]
            fn rint(x: Self) -> Self {
                x.round_ties_even()
            }

            #[inline]
            fn trunc(x: Self) -> Self {
                x.trunc()
            }

            #[inline]
            fn floor(x: Self) -> Self {
                x.floor()
            }

            #[inline]
            fn ceil(x: Self) -> Self {
                x.ceil()
            }

            /// `1` for negative input, `0` otherwise.
            #[inline]
            fn step(x: Self) -> Self {
                if x < 0.0 { 1.0 } else { 0.0 }
            }

            #[inline]
            fn nonzero(x: Self) -> Self {
                if x == 0.0 { 0.0 } else { 1.0 }
            }

            #[inline]
            fn leaky_min(a: Self, b: Self, _r: Self) -> Self {
                <Self as ScalarOps>::min(a, b)
            }
            #[inline]
            fn adj_leaky_min(
                a: Self,
                b: Self,
                r: Self,
                adj_a: &mut Self,
                adj_b: &mut Self,
                _adj_r: &mut Self,
                adj_ret: Self,
            ) {
                if a < b {
                    *adj_a += adj_ret;
                    *adj_b += r * adj_ret;
                } else {
                    *adj_a += r * adj_ret;
                    *adj_b += adj_ret;
                }
            }

            #[inline]
            fn leaky_max(a: Self, b: Self, _r: Self) -> Self {
                <Self as ScalarOps>::max(a, b)
            }
            #[inline]
            fn adj_leaky_max(
                a: Self,
                b: Self,
                r: Self,
                adj_a: &mut Self,
                adj_b: &mut Self,
                _adj_r: &mut Self,
                adj_ret: Self,
            ) {
                if a > b {
                    *adj_a += adj_ret;
                    *adj_b += r * adj_ret;
                } else {
                    *adj_a += r * adj_ret;
                    *adj_b += adj_ret;
                }
            }
        }
    )*};
}

impl_float_transcendental!(f32, f64);

macro_rules! unary_entry_points {
    ($($name:ident, $adj:ident);* $(;)?) => {$(
        #[inline]
        pub fn $name<T: FloatOps>(x: T) -> T {
            <T as FloatOps>::$name(x)
        }

        #[inline]
        pub fn $adj<T: FloatOps>(x: T, adj_x: &mut T, adj_ret: T) {
            <T as FloatOps>::$adj(x, adj_x, adj_ret)
        }
    )*};
}

unary_entry_points! {
    log, adj_log;
    exp, adj_exp;
    sqrt, adj_sqrt;
    sin, adj_sin;
    cos, adj_cos;
    tan, adj_tan;
    asin, adj_asin;
    acos, adj_acos;
    atan, adj_atan;
    sinh, adj_sinh;
    cosh, adj_cosh;
    tanh, adj_tanh;
}

// Piecewise-constant: zero subgradient almost everywhere.
macro_rules! piecewise_constant_entry_points {
    ($($name:ident, $adj:ident);* $(;)?) => {$(
        #[inline]
        pub fn $name<T: FloatOps>(x: T) -> T {
            <T as FloatOps>::$name(x)
        }

        #[inline]
        pub fn $adj<T: FloatOps>(_x: T, _adj_x: &mut T, _adj_ret: T) {}
    )*};
}

piecewise_constant_entry_points! {
    round, adj_round;
    rint, adj_rint;
    trunc, adj_trunc;
    floor, adj_floor;
    ceil, adj_ceil;
    step, adj_step;
    nonzero, adj_nonzero;
}

#[inline]
pub fn pow<T: FloatOps>(a: T, b: T) -> T {
    <T as FloatOps>::pow(a, b)
}

#[inline]
pub fn adj_pow<T: FloatOps>(a: T, b: T, adj_a: &mut T, adj_b: &mut T, adj_ret: T) {
    <T as FloatOps>::adj_pow(a, b, adj_a, adj_b, adj_ret)
}

#[inline]
pub fn atan2<T: FloatOps>(y: T, x: T) -> T {
    <T as FloatOps>::atan2(y, x)
}

/// Unsupported: reports a warning and accumulates nothing.
#[inline]
pub fn adj_atan2<T: FloatOps>(y: T, x: T, adj_y: &mut T, adj_x: &mut T, adj_ret: T) {
    <T as FloatOps>::adj_atan2(y, x, adj_y, adj_x, adj_ret)
}

/// `min(a, b)` whose adjoint leaks `r * adj_ret` into the branch not selected.
#[inline]
pub fn leaky_min<T: FloatOps>(a: T, b: T, r: T) -> T {
    <T as FloatOps>::leaky_min(a, b, r)
}

#[allow(clippy::too_many_arguments)]
#[inline]
pub fn adj_leaky_min<T: FloatOps>(
    a: T,
    b: T,
    r: T,
    adj_a: &mut T,
    adj_b: &mut T,
    adj_r: &mut T,
    adj_ret: T,
) {
    <T as FloatOps>::adj_leaky_min(a, b, r, adj_a, adj_b, adj_r, adj_ret)
}

/// `max(a, b)` whose adjoint leaks `r * adj_ret` into the branch not selected.
#[inline]
pub fn leaky_max<T: FloatOps>(a: T, b: T, r: T) -> T {
    <T as FloatOps>::leaky_max(a, b, r)
}

#[allow(clippy::too_many_arguments)]
#[inline]
pub fn adj_leaky_max<T: FloatOps>(
    a: T,
    b: T,
    r: T,
    adj_a: &mut T,
    adj_b: &mut T,
    adj_r: &mut T,
    adj_ret: T,
) {
    <T as FloatOps>::adj_leaky_max(a, b, r, adj_a, adj_b, adj_r, adj_ret)
}
