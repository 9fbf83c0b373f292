//! Structural formatting for kernel diagnostics.
//!
//! One [`Printable`] capability covers scalars, vectors and matrices: nested
//! fixed-size arrays print their innermost level space-separated and each
//! outer level on its own line. Floats use C `%g` formatting.

use crate::Vec3;

/// Significant digits used by `%g`.
const G_PRECISION: usize = 6;

/// A value that kernel diagnostics can print.
pub trait Printable {
    /// Nesting depth: 0 for scalars, 1 for vectors, 2 for matrices.
    const RANK: usize;

    fn write_to(&self, out: &mut String);

    fn to_kernel_string(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }
}

macro_rules! impl_printable_int {
    ($($ty:ty),*) => {$(
        impl Printable for $ty {
            const RANK: usize = 0;

            fn write_to(&self, out: &mut String) {
                out.push_str(&self.to_string());
            }
        }
    )*};
}

impl_printable_int!(i8, u8, i16, u16, i32, u32, i64, u64, usize, isize);

impl Printable for f32 {
    const RANK: usize = 0;

    fn write_to(&self, out: &mut String) {
        out.push_str(&format_g(f64::from(*self)));
    }
}

impl Printable for f64 {
    const RANK: usize = 0;

    fn write_to(&self, out: &mut String) {
        out.push_str(&format_g(*self));
    }
}

impl Printable for bool {
    const RANK: usize = 0;

    fn write_to(&self, out: &mut String) {
        out.push_str(if *self { "true" } else { "false" });
    }
}

impl Printable for str {
    const RANK: usize = 0;

    fn write_to(&self, out: &mut String) {
        out.push_str(self);
    }
}

impl Printable for String {
    const RANK: usize = 0;

    fn write_to(&self, out: &mut String) {
        out.push_str(self);
    }
}

impl Printable for Vec3 {
    const RANK: usize = 1;

    fn write_to(&self, out: &mut String) {
        self.to_array().write_to(out);
    }
}

impl<T: Printable, const N: usize> Printable for [T; N] {
    const RANK: usize = T::RANK + 1;

    fn write_to(&self, out: &mut String) {
        let sep = if T::RANK == 0 { " " } else { "\n" };
        for (i, item) in self.iter().enumerate() {
            if i > 0 {
                out.push_str(sep);
            }
            item.write_to(out);
        }
    }
}

/// Format a float like C's `printf("%g")`.
pub fn format_g(value: f64) -> String {
    if value.is_nan() {
        return "nan".into();
    }
    if value.is_infinite() {
        return (if value < 0.0 { "-inf" } else { "inf" }).into();
    }
    if value == 0.0 {
        return (if value.is_sign_negative() { "-0" } else { "0" }).into();
    }

    // The exponent is taken after rounding to the target precision.
    let sci = format!("{:.*e}", G_PRECISION - 1, value);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);

    if exp < -4 || exp >= G_PRECISION as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exp.abs())
    } else {
        let decimals = (G_PRECISION as i32 - 1 - exp) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_g() {
        assert_eq!(format_g(5.0), "5");
        assert_eq!(format_g(0.125), "0.125");
        assert_eq!(format_g(-2.5), "-2.5");
        assert_eq!(format_g(1.0 / 3.0), "0.333333");
        assert_eq!(format_g(123456.7), "123457");
        assert_eq!(format_g(1.0e6), "1e+06");
        assert_eq!(format_g(1.5e-5), "1.5e-05");
        assert_eq!(format_g(0.0001), "0.0001");
        assert_eq!(format_g(0.0), "0");
        assert_eq!(format_g(f64::INFINITY), "inf");
    }

    #[test]
    fn test_structural_shapes() {
        assert_eq!(3i32.to_kernel_string(), "3");
        assert_eq!(Vec3::new(1.0, 0.5, -2.0).to_kernel_string(), "1 0.5 -2");
        assert_eq!([[1.0f32, 2.0], [3.0, 4.0]].to_kernel_string(), "1 2\n3 4");
        assert_eq!(<[[f32; 2]; 2] as Printable>::RANK, 2);
        assert_eq!("hello".to_kernel_string(), "hello");
    }
}
