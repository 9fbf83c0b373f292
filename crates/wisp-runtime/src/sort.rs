//! Key/value sort entry points.
//!
//! Only the interface lives here: a backend that can sort implements
//! [`SortBackend`], with the host implementation on [`Sequential`](crate::Sequential)
//! and the threaded one on [`Parallel`](crate::Parallel) supplied by the crate
//! that owns the sorting algorithm.

use wisp_core::{Result, Scalar};

/// Key types accepted by [`SortBackend::radix_sort_pairs`].
pub trait RadixSortKey: Scalar {}

impl RadixSortKey for i32 {}
impl RadixSortKey for f32 {}
impl RadixSortKey for i64 {}

/// Key types accepted by [`SortBackend::segmented_sort_pairs`].
pub trait SegmentedSortKey: Scalar {}

impl SegmentedSortKey for i32 {}
impl SegmentedSortKey for f32 {}

pub trait SortBackend {
    /// Make sure scratch memory for sorting `n` pairs is allocated.
    fn radix_sort_reserve(&self, n: usize) -> Result<()>;

    /// Sort `keys` ascending, permuting `values` alongside.
    ///
    /// `keys` and `values` have the same length.
    fn radix_sort_pairs<K: RadixSortKey>(&self, keys: &mut [K], values: &mut [i32]) -> Result<()>;

    /// Sort each segment `segment_start[s]..segment_end[s]` of `keys` independently,
    /// permuting `values` alongside.
    fn segmented_sort_pairs<K: SegmentedSortKey>(
        &self,
        keys: &mut [K],
        values: &mut [i32],
        segment_start: &[i32],
        segment_end: &[i32],
    ) -> Result<()>;
}
