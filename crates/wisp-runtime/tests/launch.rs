//! End-to-end launches: forward and backward kernels built from the
//! builtin primitives, run on each backend.

use std::io::Write;

use wisp_builtin::{adj_mul, adj_sin, mul, sin};
use wisp_core::{Array, Buffer};
use wisp_runtime::{
    Backend, BackendKind, DefaultBackend, Kernel, Runtime, RuntimeConfig, Sequential,
    ThreadContext,
};

fn assert_close(a: &[f32], b: &[f32], tol: f32) {
    assert_eq!(a.len(), b.len(), "length mismatch");
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        assert!((x - y).abs() < tol, "mismatch at {i}: {x} vs {y} (tol={tol})");
    }
}

/// `y[i] = x[i] * sin(x[i])`, `loss += y[i]`.
struct Forward<'a> {
    x: Buffer<'a, f32>,
    y: Buffer<'a, f32>,
    loss: Buffer<'a, f32>,
}

impl Kernel for Forward<'_> {
    fn run<B: Backend>(&self, ctx: &ThreadContext<B>) {
        let i = ctx.tid();
        let x = ctx.load(self.x, i);
        let y = mul(x, sin(x));
        ctx.store(self.y, i, y);
        ctx.atomic_add(self.loss, y);
    }
}

/// Hand-written reverse of [`Forward`]: adjoints in reverse order.
struct Backward<'a> {
    x: Buffer<'a, f32>,
    adj_x: Buffer<'a, f32>,
    adj_y: Buffer<'a, f32>,
    adj_loss: Buffer<'a, f32>,
}

impl Kernel for Backward<'_> {
    fn run<B: Backend>(&self, ctx: &ThreadContext<B>) {
        let i = ctx.tid();
        // forward replay
        let x = ctx.load(self.x, i);
        let s = sin(x);

        let mut adj_y = 0.0f32;
        ctx.adj_atomic_add(self.adj_loss, &mut adj_y);
        ctx.adj_store(self.adj_y, i, &mut adj_y);

        let (mut adj_x, mut adj_s) = (0.0f32, 0.0f32);
        adj_mul(x, s, &mut adj_x, &mut adj_s, adj_y);
        adj_sin(x, &mut adj_x, adj_s);
        ctx.adj_load(self.adj_x, i, adj_x);
    }
}

fn run_forward_backward(runtime: &Runtime, xs: &[f32]) -> (Vec<f32>, f32, Vec<f32>) {
    let x = Array::from_slice(xs);
    let y = Array::<f32>::zeros(xs.len());
    let loss = Array::<f32>::zeros(1);
    runtime
        .launch(
            xs.len(),
            &Forward {
                x: x.buffer(),
                y: y.buffer(),
                loss: loss.buffer(),
            },
        )
        .unwrap();

    let adj_x = Array::<f32>::zeros(xs.len());
    let adj_loss = Array::from_slice(&[1.0f32]);
    runtime
        .launch(
            xs.len(),
            &Backward {
                x: x.buffer(),
                adj_x: adj_x.buffer(),
                // outputs only feed the loss; their own gradient is not tracked
                adj_y: Buffer::null(),
                adj_loss: adj_loss.buffer(),
            },
        )
        .unwrap();

    (y.to_vec(), loss.get(0), adj_x.to_vec())
}

fn expected(xs: &[f32]) -> (Vec<f32>, f32, Vec<f32>) {
    let y: Vec<f32> = xs.iter().map(|x| x * x.sin()).collect();
    let loss = y.iter().sum();
    let grad = xs.iter().map(|x| x.sin() + x * x.cos()).collect();
    (y, loss, grad)
}

fn sample_inputs(n: usize) -> Vec<f32> {
    (0..n).map(|i| (i as f32 * 0.37).sin() * 3.0).collect()
}

#[test]
fn test_forward_backward_sequential() {
    let runtime = Runtime::new(&RuntimeConfig {
        backend: BackendKind::Sequential,
        ..RuntimeConfig::default()
    })
    .unwrap();

    let xs = sample_inputs(100);
    let (y, loss, grad) = run_forward_backward(&runtime, &xs);
    let (ey, eloss, egrad) = expected(&xs);
    assert_close(&y, &ey, 1e-6);
    assert!((loss - eloss).abs() < 1e-3);
    assert_close(&grad, &egrad, 1e-5);
}

#[cfg(feature = "parallel")]
#[test]
fn test_forward_backward_parallel_matches_sequential() {
    let xs = sample_inputs(5000);
    let seq = run_forward_backward(&Runtime::Sequential(Sequential), &xs);
    let par = run_forward_backward(
        &Runtime::new(&RuntimeConfig {
            backend: BackendKind::Parallel,
            block_dim: 128,
            num_threads: Some(4),
        })
        .unwrap(),
        &xs,
    );

    assert_close(&par.0, &seq.0, 1e-6);
    assert_close(&par.2, &seq.2, 1e-6);
    // summation order differs between backends
    assert!((par.1 - seq.1).abs() < 1e-2 * (1.0 + seq.1.abs()));
}

#[test]
fn test_gradient_accumulates_across_readers() {
    // every thread reads x[0]; all of their gradient lands in adj_x[0]
    let x = Array::from_slice(&[2.0f32]);
    let adj_x = Array::<f32>::zeros(1);
    let backend = DefaultBackend::from_config(&RuntimeConfig::default()).unwrap();

    backend
        .launch(1000, |ctx| {
            let v = ctx.load(x.buffer(), 0);
            let (mut adj_a, mut adj_b) = (0.0f32, 0.0f32);
            adj_mul(v, v, &mut adj_a, &mut adj_b, 1.0);
            ctx.adj_load(adj_x.buffer(), 0, adj_a + adj_b);
        })
        .unwrap();

    assert_eq!(adj_x.get(0), 4000.0);
}

#[test]
fn test_untracked_outputs_are_left_alone() {
    let x = Array::from_slice(&[1.0f32, 2.0, 3.0]);
    let snapshot = x.to_vec();

    Sequential
        .launch(x.len(), |ctx| {
            let i = ctx.tid();
            let v = ctx.load(x.buffer(), i);
            ctx.store(Buffer::null(), i, v * 10.0);
            ctx.atomic_add(Buffer::<f32>::null(), v);
            ctx.atomic_sub_at(Buffer::<f32>::null(), i, v);
            ctx.adj_load(Buffer::<f32>::null(), i, v);

            let mut adj = 0.0f32;
            ctx.adj_store(Buffer::null(), i, &mut adj);
            assert_eq!(adj, 0.0);
        })
        .unwrap();

    assert_eq!(x.to_vec(), snapshot);
}

#[test]
fn test_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"backend": "sequential", "block_dim": 32}}"#).unwrap();

    let config = RuntimeConfig::from_file(file.path()).unwrap();
    assert_eq!(config.backend, BackendKind::Sequential);
    assert_eq!(config.block_dim, 32);

    let runtime = Runtime::new(&config).unwrap();
    let (y, _, _) = run_forward_backward(&runtime, &[0.5, 1.5]);
    assert_close(&y, &expected(&[0.5, 1.5]).0, 1e-6);
}

#[test]
fn test_missing_config_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = RuntimeConfig::from_file(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, wisp_core::WispError::Io(_)));
}
