//! Per-logical-thread execution context and the memory operations kernels use.
//!
//! Every buffer access from kernel code goes through a [`ThreadContext`], so the
//! choice between plain and atomic accumulation is made once by the backend type
//! parameter rather than at each call site.

use std::fmt;
use std::marker::PhantomData;

use wisp_core::{Buffer, Scalar};

use crate::backend::Backend;
use crate::sequential::Sequential;

/// The calling logical thread's view of a launch.
pub struct ThreadContext<B: Backend> {
    tid: usize,
    _backend: PhantomData<fn() -> B>,
}

impl<B: Backend> ThreadContext<B> {
    pub(crate) fn new(tid: usize) -> Self {
        Self {
            tid,
            _backend: PhantomData,
        }
    }

    /// Linear index of the calling logical thread.
    #[inline]
    pub fn tid(&self) -> usize {
        self.tid
    }

    /// Read `buf[index]`.
    ///
    /// Loading from a null buffer is a precondition violation and panics, as
    /// does an index past the end of the buffer.
    #[inline]
    pub fn load<T: Scalar>(&self, buf: Buffer<'_, T>, index: usize) -> T {
        match buf.cell(index) {
            Some(cell) => T::load_cell(cell),
            None => panic!("load from a null {} buffer at index {index}", T::DTYPE),
        }
    }

    /// Write `buf[index] = value`. A null buffer discards the write.
    #[inline]
    pub fn store<T: Scalar>(&self, buf: Buffer<'_, T>, index: usize, value: T) {
        if let Some(cell) = buf.cell(index) {
            T::store_cell(cell, value);
        }
    }

    /// Add `value` into the first element of `buf`, returning its previous value.
    ///
    /// A null buffer is left alone and yields zero.
    #[inline]
    pub fn atomic_add<T: Scalar>(&self, buf: Buffer<'_, T>, value: T) -> T {
        match buf.cell(0) {
            Some(cell) => B::accumulate(cell, value),
            None => T::default(),
        }
    }

    /// [`atomic_add`](Self::atomic_add) on `buf[index]`.
    #[inline]
    pub fn atomic_add_at<T: Scalar>(&self, buf: Buffer<'_, T>, index: usize, value: T) -> T {
        self.atomic_add(buf.offset(index), value)
    }

    /// Subtract `value` from the first element of `buf`, returning its previous value.
    ///
    /// A null buffer is left alone and yields zero.
    #[inline]
    pub fn atomic_sub<T: Scalar>(&self, buf: Buffer<'_, T>, value: T) -> T {
        match buf.cell(0) {
            Some(cell) => B::deplete(cell, value),
            None => T::default(),
        }
    }

    /// [`atomic_sub`](Self::atomic_sub) on `buf[index]`.
    #[inline]
    pub fn atomic_sub_at<T: Scalar>(&self, buf: Buffer<'_, T>, index: usize, value: T) -> T {
        self.atomic_sub(buf.offset(index), value)
    }

    /// Backward of [`load`](Self::load): `adj_buf[index] += adj_ret`.
    ///
    /// Many threads may read the same source element, so the accumulation is
    /// atomic on the parallel backend. No-op for a null adjoint buffer and for
    /// integer element types.
    #[inline]
    pub fn adj_load<T: Scalar>(&self, adj_buf: Buffer<'_, T>, index: usize, adj_ret: T) {
        if !T::DIFFERENTIABLE {
            return;
        }
        if let Some(cell) = adj_buf.cell(index) {
            B::accumulate(cell, adj_ret);
        }
    }

    /// Backward of [`store`](Self::store): `adj_value += adj_buf[index]`.
    #[inline]
    pub fn adj_store<T: Scalar>(&self, adj_buf: Buffer<'_, T>, index: usize, adj_value: &mut T) {
        if let Some(cell) = adj_buf.cell(index) {
            *adj_value = adj_value.plus(T::load_cell(cell));
        }
    }

    /// Backward of [`atomic_add`](Self::atomic_add): `adj_value += adj_buf[0]`.
    #[inline]
    pub fn adj_atomic_add<T: Scalar>(&self, adj_buf: Buffer<'_, T>, adj_value: &mut T) {
        self.adj_store(adj_buf, 0, adj_value)
    }

    #[inline]
    pub fn adj_atomic_add_at<T: Scalar>(
        &self,
        adj_buf: Buffer<'_, T>,
        index: usize,
        adj_value: &mut T,
    ) {
        self.adj_store(adj_buf, index, adj_value)
    }

    /// Backward of [`atomic_sub`](Self::atomic_sub): `adj_value -= adj_buf[0]`.
    #[inline]
    pub fn adj_atomic_sub<T: Scalar>(&self, adj_buf: Buffer<'_, T>, adj_value: &mut T) {
        self.adj_atomic_sub_at(adj_buf, 0, adj_value)
    }

    #[inline]
    pub fn adj_atomic_sub_at<T: Scalar>(
        &self,
        adj_buf: Buffer<'_, T>,
        index: usize,
        adj_value: &mut T,
    ) {
        if let Some(cell) = adj_buf.cell(index) {
            *adj_value = adj_value.minus(T::load_cell(cell));
        }
    }
}

impl ThreadContext<Sequential> {
    /// Set the logical thread index seen by the next kernel call.
    ///
    /// Only the sequential backend has a settable index; the parallel backend
    /// derives it from block coordinates.
    pub fn set_tid(&mut self, tid: usize) {
        self.tid = tid;
    }
}

impl<B: Backend> fmt::Debug for ThreadContext<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadContext")
            .field("backend", &B::KIND)
            .field("tid", &self.tid)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wisp_core::Array;

    type Ctx = ThreadContext<Sequential>;

    #[test]
    fn test_load_store() {
        let ctx = Ctx::new(0);
        let a = Array::from_slice(&[1.0f32, 2.0, 3.0]);
        assert_eq!(ctx.load(a.buffer(), 1), 2.0);
        ctx.store(a.buffer(), 2, 9.0);
        assert_eq!(a.to_vec(), vec![1.0, 2.0, 9.0]);
    }

    #[test]
    #[should_panic]
    fn test_load_null_faults() {
        let ctx = Ctx::new(0);
        ctx.load(Buffer::<f32>::null(), 0);
    }

    #[test]
    fn test_null_buffer_is_noop() {
        let ctx = Ctx::new(0);
        let null = Buffer::<f32>::null();

        ctx.store(null, 3, 1.0);
        assert_eq!(ctx.atomic_add(null, 1.0), 0.0);
        assert_eq!(ctx.atomic_sub_at(null, 5, 1.0), 0.0);
        ctx.adj_load(null, 2, 1.0);

        let mut adj = 0.5f32;
        ctx.adj_store(null, 0, &mut adj);
        ctx.adj_atomic_add(null, &mut adj);
        ctx.adj_atomic_sub_at(null, 4, &mut adj);
        assert_eq!(adj, 0.5);
    }

    #[test]
    fn test_atomic_overloads() {
        let ctx = Ctx::new(0);
        let a = Array::from_slice(&[10i32, 20, 30]);
        assert_eq!(ctx.atomic_add(a.buffer(), 5), 10);
        assert_eq!(ctx.atomic_add_at(a.buffer(), 2, 1), 30);
        assert_eq!(ctx.atomic_sub_at(a.buffer(), 1, 4), 20);
        assert_eq!(a.to_vec(), vec![15, 16, 31]);
    }

    #[test]
    fn test_adj_load_skips_integers() {
        let ctx = Ctx::new(0);
        let ints = Array::<i32>::zeros(2);
        ctx.adj_load(ints.buffer(), 1, 7);
        assert_eq!(ints.to_vec(), vec![0, 0]);

        let grads = Array::<f64>::zeros(2);
        ctx.adj_load(grads.buffer(), 1, 0.5);
        ctx.adj_load(grads.buffer(), 1, 0.25);
        assert_eq!(grads.to_vec(), vec![0.0, 0.75]);
    }

    #[test]
    fn test_store_adjoints_flow_back() {
        let ctx = Ctx::new(0);
        let adj_out = Array::from_slice(&[2.0f32, 3.0]);

        let mut adj_value = 1.0f32;
        ctx.adj_store(adj_out.buffer(), 1, &mut adj_value);
        assert_eq!(adj_value, 4.0);

        ctx.adj_atomic_add(adj_out.buffer(), &mut adj_value);
        assert_eq!(adj_value, 6.0);

        ctx.adj_atomic_sub_at(adj_out.buffer(), 1, &mut adj_value);
        assert_eq!(adj_value, 3.0);

        // the adjoint buffer itself is read-only here
        assert_eq!(adj_out.to_vec(), vec![2.0, 3.0]);
    }

    #[test]
    fn test_set_tid() {
        let mut ctx = Ctx::new(0);
        ctx.set_tid(41);
        assert_eq!(ctx.tid(), 41);
    }
}
