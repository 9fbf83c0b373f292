//! Checks every differentiable adjoint against central finite differences.
//!
//! For a forward `f` and random point `x`, `adj_f(x, adj_ret = 1)` must match
//! `(f(x + h) - f(x - h)) / 2h` in each input, away from kinks.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use wisp_builtin::*;

const H: f64 = 1e-6;
const SAMPLES: usize = 64;

fn assert_close(analytic: f64, numeric: f64, what: &str, x: &[f64]) {
    let tol = 1e-5 * (1.0 + numeric.abs());
    assert!(
        (analytic - numeric).abs() <= tol,
        "{what} at {x:?}: adjoint {analytic} vs finite difference {numeric}"
    );
}

fn check_unary(
    name: &str,
    f: fn(f64) -> f64,
    adj: fn(f64, &mut f64, f64),
    lo: f64,
    hi: f64,
    rng: &mut StdRng,
) {
    for _ in 0..SAMPLES {
        let x = rng.gen_range(lo..hi);
        let numeric = (f(x + H) - f(x - H)) / (2.0 * H);

        // Start from a non-zero accumulator to catch `=` instead of `+=`.
        let mut adj_x = 0.25;
        adj(x, &mut adj_x, 1.0);
        assert_close(adj_x - 0.25, numeric, name, &[x]);
    }
}

type Binary = fn(f64, f64) -> f64;
type AdjBinary = fn(f64, f64, &mut f64, &mut f64, f64);

fn check_binary(
    name: &str,
    f: Binary,
    adj: AdjBinary,
    sample: impl Fn(&mut StdRng) -> (f64, f64),
    rng: &mut StdRng,
) {
    for _ in 0..SAMPLES {
        let (a, b) = sample(rng);
        let da = (f(a + H, b) - f(a - H, b)) / (2.0 * H);
        let db = (f(a, b + H) - f(a, b - H)) / (2.0 * H);

        let (mut adj_a, mut adj_b) = (0.0, 0.0);
        adj(a, b, &mut adj_a, &mut adj_b, 1.0);
        assert_close(adj_a, da, &format!("{name} d/da"), &[a, b]);
        assert_close(adj_b, db, &format!("{name} d/db"), &[a, b]);
    }
}

/// Two values at least `gap` apart, so comparisons are away from their kink.
fn separated(rng: &mut StdRng, gap: f64) -> (f64, f64) {
    loop {
        let a: f64 = rng.gen_range(-5.0..5.0);
        let b = rng.gen_range(-5.0..5.0);
        if (a - b).abs() > gap {
            return (a, b);
        }
    }
}

#[test]
fn test_unary_adjoints() {
    let mut rng = StdRng::seed_from_u64(7);

    check_unary("log", log, adj_log, 0.1, 10.0, &mut rng);
    check_unary("exp", exp, adj_exp, -4.0, 4.0, &mut rng);
    check_unary("sqrt", sqrt, adj_sqrt, 0.05, 10.0, &mut rng);
    check_unary("sin", sin, adj_sin, -6.0, 6.0, &mut rng);
    check_unary("cos", cos, adj_cos, -6.0, 6.0, &mut rng);
    check_unary("tan", tan, adj_tan, -1.2, 1.2, &mut rng);
    check_unary("asin", asin, adj_asin, -0.95, 0.95, &mut rng);
    check_unary("acos", acos, adj_acos, -0.95, 0.95, &mut rng);
    check_unary("atan", atan, adj_atan, -8.0, 8.0, &mut rng);
    check_unary("sinh", sinh, adj_sinh, -3.0, 3.0, &mut rng);
    check_unary("cosh", cosh, adj_cosh, -3.0, 3.0, &mut rng);
    check_unary("tanh", tanh, adj_tanh, -3.0, 3.0, &mut rng);
}

#[test]
fn test_abs_and_neg_adjoints() {
    let mut rng = StdRng::seed_from_u64(11);

    check_unary("abs", abs, adj_abs, 0.01, 5.0, &mut rng);
    check_unary("abs", abs, adj_abs, -5.0, -0.01, &mut rng);
    check_unary("neg", neg, adj_neg, -5.0, 5.0, &mut rng);
}

#[test]
fn test_arithmetic_adjoints() {
    let mut rng = StdRng::seed_from_u64(13);
    let any = |rng: &mut StdRng| -> (f64, f64) { (rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0)) };
    let nonzero_b = |rng: &mut StdRng| -> (f64, f64) {
        let b: f64 = rng.gen_range(0.5..4.0);
        let b = if rng.gen_bool(0.5) { b } else { -b };
        (rng.gen_range(-5.0..5.0), b)
    };

    check_binary("add", add, adj_add, any, &mut rng);
    check_binary("sub", sub, adj_sub, any, &mut rng);
    check_binary("mul", mul, adj_mul, any, &mut rng);
    check_binary("div", div, adj_div, nonzero_b, &mut rng);
}

#[test]
fn test_pow_adjoint() {
    let mut rng = StdRng::seed_from_u64(17);
    check_binary(
        "pow",
        pow,
        adj_pow,
        |rng| (rng.gen_range(0.2..3.0), rng.gen_range(-2.0..2.0)),
        &mut rng,
    );
}

#[test]
fn test_min_max_adjoints() {
    let mut rng = StdRng::seed_from_u64(19);
    check_binary("min", min, adj_min, |rng| separated(rng, 1e-3), &mut rng);
    check_binary("max", max, adj_max, |rng| separated(rng, 1e-3), &mut rng);
}

#[test]
fn test_clamp_adjoint() {
    let mut rng = StdRng::seed_from_u64(23);
    for _ in 0..SAMPLES {
        let x: f64 = rng.gen_range(-6.0..6.0);
        let (lo, hi) = (-2.0, 3.0);
        if (x - lo).abs() < 1e-3 || (x - hi).abs() < 1e-3 {
            continue;
        }

        let dx = (clamp(x + H, lo, hi) - clamp(x - H, lo, hi)) / (2.0 * H);
        let dlo = (clamp(x, lo + H, hi) - clamp(x, lo - H, hi)) / (2.0 * H);
        let dhi = (clamp(x, lo, hi + H) - clamp(x, lo, hi - H)) / (2.0 * H);

        let (mut gx, mut glo, mut ghi) = (0.0, 0.0, 0.0);
        adj_clamp(x, lo, hi, &mut gx, &mut glo, &mut ghi, 1.0);
        assert_close(gx, dx, "clamp d/dx", &[x]);
        assert_close(glo, dlo, "clamp d/da", &[x]);
        assert_close(ghi, dhi, "clamp d/db", &[x]);
    }
}

#[test]
fn test_leaky_adjoints_against_leaky_forward() {
    // The leaky adjoint is the gradient of a blend where the unselected
    // operand contributes with slope `r`.
    let r = 0.1;
    let leaky_min_fwd = |a: f64, b: f64| if a < b { a + r * b } else { r * a + b };
    let leaky_max_fwd = |a: f64, b: f64| if a > b { a + r * b } else { r * a + b };

    let mut rng = StdRng::seed_from_u64(29);
    for _ in 0..SAMPLES {
        let (a, b) = separated(&mut rng, 1e-3);

        let (mut ga, mut gb, mut gr) = (0.0, 0.0, 0.0);
        adj_leaky_min(a, b, r, &mut ga, &mut gb, &mut gr, 1.0);
        assert_close(ga, (leaky_min_fwd(a + H, b) - leaky_min_fwd(a - H, b)) / (2.0 * H), "leaky_min d/da", &[a, b]);
        assert_close(gb, (leaky_min_fwd(a, b + H) - leaky_min_fwd(a, b - H)) / (2.0 * H), "leaky_min d/db", &[a, b]);
        assert_eq!(gr, 0.0);

        let (mut ga, mut gb) = (0.0, 0.0);
        adj_leaky_max(a, b, r, &mut ga, &mut gb, &mut gr, 1.0);
        assert_close(ga, (leaky_max_fwd(a + H, b) - leaky_max_fwd(a - H, b)) / (2.0 * H), "leaky_max d/da", &[a, b]);
        assert_close(gb, (leaky_max_fwd(a, b + H) - leaky_max_fwd(a, b - H)) / (2.0 * H), "leaky_max d/db", &[a, b]);
        assert_eq!(gr, 0.0);
    }
}

#[test]
fn test_select_and_cast_adjoints() {
    let mut rng = StdRng::seed_from_u64(31);
    for _ in 0..SAMPLES {
        let x: f64 = rng.gen_range(-5.0..5.0);

        let mut g = 0.0;
        adj_float64(x, &mut g, 1.0);
        assert_close(g, (float64(x + H) - float64(x - H)) / (2.0 * H), "float64", &[x]);

        let (mut ga, mut gb, mut gc) = (0.0, 0.0, false);
        let cond = x > 0.0;
        adj_select(cond, x, 2.0 * x, &mut gc, &mut ga, &mut gb, 1.0);
        let slope = (select(cond, x + H, 2.0 * (x + H)) - select(cond, x - H, 2.0 * (x - H))) / (2.0 * H);
        assert_close(ga + 2.0 * gb, slope, "select", &[x]);
    }
}
