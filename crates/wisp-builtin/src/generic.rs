//! Type-generic primitives: selection, copy, negation, boolean not and casts.

use wisp_core::{cast, Scalar, Value};

/// Returns `b` when `cond` is true, else `a`.
#[inline]
pub fn select<T: Copy>(cond: bool, a: T, b: T) -> T {
    if cond {
        b
    } else {
        a
    }
}

/// Routes the whole output gradient to the branch that was selected.
#[allow(clippy::too_many_arguments)]
#[inline]
pub fn adj_select<T: Value>(
    cond: bool,
    _a: T,
    _b: T,
    _adj_cond: &mut bool,
    adj_a: &mut T,
    adj_b: &mut T,
    adj_ret: T,
) {
    if cond {
        *adj_b += adj_ret;
    } else {
        *adj_a += adj_ret;
    }
}

#[inline]
pub fn copy<T: Copy>(dest: &mut T, src: T) {
    *dest = src;
}

/// No-op: copy re-assigns an existing variable, so no gradient flows through it.
#[inline]
pub fn adj_copy<T: Value>(_dest: &mut T, _src: T, _adj_dest: &mut T, _adj_src: &mut T) {}

/// Computed as `0 - x` so it applies to any aggregate with subtraction.
#[inline]
pub fn neg<T: Value>(x: T) -> T {
    T::default() - x
}

#[inline]
pub fn adj_neg<T: Value>(_x: T, adj_x: &mut T, adj_ret: T) {
    *adj_x += T::default() - adj_ret;
}

#[inline]
pub fn unot(b: bool) -> bool {
    !b
}

#[inline]
pub fn adj_unot(_b: bool, _adj_b: &mut bool, _adj_ret: bool) {}

/// Accumulate a cast's gradient back into its source, unless the source is an integer.
#[inline]
fn accumulate_cast<T: Scalar, U: Scalar>(adj_x: &mut T, adj_ret: U) {
    if T::DIFFERENTIABLE {
        *adj_x = adj_x.plus(cast(adj_ret));
    }
}

#[inline]
pub fn cast_float<T: Scalar>(x: T) -> f32 {
    cast(x)
}

#[inline]
pub fn adj_cast_float<T: Scalar>(_x: T, adj_x: &mut T, adj_ret: f32) {
    accumulate_cast(adj_x, adj_ret)
}

#[inline]
pub fn cast_int<T: Scalar>(x: T) -> i32 {
    cast(x)
}

/// No-op: the result is an integer, so there is no gradient to pass back.
#[inline]
pub fn adj_cast_int<T: Scalar>(_x: T, _adj_x: &mut T, _adj_ret: i32) {}

macro_rules! float_constructors {
    ($($name:ident, $adj:ident => $ty:ty);* $(;)?) => {$(
        #[inline]
        pub fn $name<T: Scalar>(x: T) -> $ty {
            cast(x)
        }

        #[inline]
        pub fn $adj<T: Scalar>(_x: T, adj_x: &mut T, adj_ret: $ty) {
            accumulate_cast(adj_x, adj_ret)
        }
    )*};
}

macro_rules! int_constructors {
    ($($name:ident, $adj:ident => $ty:ty);* $(;)?) => {$(
        #[inline]
        pub fn $name<T: Scalar>(x: T) -> $ty {
            cast(x)
        }

        #[inline]
        pub fn $adj<T: Scalar>(_x: T, _adj_x: &mut T, _adj_ret: $ty) {}
    )*};
}

float_constructors! {
    float32, adj_float32 => f32;
    float64, adj_float64 => f64;
}

int_constructors! {
    int8, adj_int8 => i8;
    uint8, adj_uint8 => u8;
    int16, adj_int16 => i16;
    uint16, adj_uint16 => u16;
    int32, adj_int32 => i32;
    uint32, adj_uint32 => u32;
    int64, adj_int64 => i64;
    uint64, adj_uint64 => u64;
}
