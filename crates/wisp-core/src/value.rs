use std::ops::{Add, AddAssign, Sub};

/// Bound for the generic primitives (`select`, `copy`, `neg`) and their adjoints.
///
/// Any fixed-size value with a zero (`Default`), component-wise `+`/`-` and an
/// in-place `+=` qualifies: every scalar, [`Vec3`](crate::Vec3), and aggregates
/// defined by callers.
pub trait Value:
    Copy + Default + Add<Output = Self> + Sub<Output = Self> + AddAssign + Send + Sync + 'static
{
}

impl<T> Value for T where
    T: Copy + Default + Add<Output = T> + Sub<Output = T> + AddAssign + Send + Sync + 'static
{
}
