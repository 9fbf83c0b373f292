use std::fmt;

use crate::{DType, Scalar};

/// Host-owned element storage that kernels read and write through [`Buffer`] views.
///
/// Elements live in atomic cells, so an `Array` can be shared by reference across
/// every logical thread of a launch; writes go through `&self`.
pub struct Array<T: Scalar> {
    cells: Box<[T::Cell]>,
}

impl<T: Scalar> Array<T> {
    /// Allocate `len` elements set to zero.
    pub fn zeros(len: usize) -> Self {
        Self {
            cells: (0..len).map(|_| T::new_cell(T::default())).collect(),
        }
    }

    /// Allocate `len` elements set to `value`.
    pub fn full(len: usize, value: T) -> Self {
        Self {
            cells: (0..len).map(|_| T::new_cell(value)).collect(),
        }
    }

    /// Copy host data into a new array.
    pub fn from_slice(data: &[T]) -> Self {
        Self {
            cells: data.iter().map(|&v| T::new_cell(v)).collect(),
        }
    }

    /// Element type of this array.
    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Size in bytes of the element payload.
    pub fn nbytes(&self) -> usize {
        T::DTYPE.storage_bytes(self.len())
    }

    /// Read one element. Panics if `index` is out of range.
    pub fn get(&self, index: usize) -> T {
        T::load_cell(&self.cells[index])
    }

    /// Overwrite one element. Panics if `index` is out of range.
    pub fn set(&self, index: usize, value: T) {
        T::store_cell(&self.cells[index], value)
    }

    /// Set every element to `value`.
    pub fn fill(&self, value: T) {
        for cell in self.cells.iter() {
            T::store_cell(cell, value);
        }
    }

    /// Copy the contents back to host memory.
    pub fn to_vec(&self) -> Vec<T> {
        self.cells.iter().map(T::load_cell).collect()
    }

    /// Borrow the array as a non-null kernel buffer.
    pub fn buffer(&self) -> Buffer<'_, T> {
        Buffer::from_cells(&self.cells)
    }
}

impl<T: Scalar> Clone for Array<T> {
    fn clone(&self) -> Self {
        Self::from_slice(&self.to_vec())
    }
}

impl<T: Scalar> fmt::Debug for Array<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Array")
            .field("dtype", &T::DTYPE)
            .field("data", &self.to_vec())
            .finish()
    }
}

impl<T: Scalar> From<Vec<T>> for Array<T> {
    fn from(data: Vec<T>) -> Self {
        Self::from_slice(&data)
    }
}

/// A non-owning, possibly null view of externally owned storage.
///
/// Null is a meaningful state: it marks an array whose values (or gradients)
/// are not tracked. Stores and gradient accumulation into a null buffer are
/// silent no-ops; loads from one are a precondition violation.
pub struct Buffer<'a, T: Scalar> {
    cells: Option<&'a [T::Cell]>,
}

impl<'a, T: Scalar> Buffer<'a, T> {
    /// The null buffer ("not tracked").
    pub const fn null() -> Self {
        Self { cells: None }
    }

    /// View a slice of cells owned elsewhere.
    pub fn from_cells(cells: &'a [T::Cell]) -> Self {
        Self { cells: Some(cells) }
    }

    /// Whether this is the null buffer.
    pub fn is_null(&self) -> bool {
        self.cells.is_none()
    }

    /// Number of addressable elements (zero when null).
    pub fn len(&self) -> usize {
        self.cells.map_or(0, <[T::Cell]>::len)
    }

    /// Whether the view addresses no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The view starting `index` elements further in. Null stays null.
    ///
    /// Panics if `index` is past the end of a non-null view.
    pub fn offset(&self, index: usize) -> Self {
        Self {
            cells: self.cells.map(|cells| &cells[index..]),
        }
    }

    /// The cell at `index`, or `None` for the null buffer.
    ///
    /// Panics if `index` is out of range of a non-null view.
    #[inline]
    pub fn cell(&self, index: usize) -> Option<&'a T::Cell> {
        self.cells.map(|cells| &cells[index])
    }

    /// The underlying cells, or `None` for the null buffer.
    pub fn cells(&self) -> Option<&'a [T::Cell]> {
        self.cells
    }
}

impl<T: Scalar> Clone for Buffer<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Scalar> Copy for Buffer<'_, T> {}

impl<T: Scalar> Default for Buffer<'_, T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T: Scalar> fmt::Debug for Buffer<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cells {
            Some(cells) => write!(f, "Buffer<{}>[{}]", T::DTYPE, cells.len()),
            None => write!(f, "Buffer<{}>(null)", T::DTYPE),
        }
    }
}

impl<'a, T: Scalar> From<&'a Array<T>> for Buffer<'a, T> {
    fn from(array: &'a Array<T>) -> Self {
        array.buffer()
    }
}

impl<'a, T: Scalar> From<Option<&'a Array<T>>> for Buffer<'a, T> {
    fn from(array: Option<&'a Array<T>>) -> Self {
        array.map_or_else(Buffer::null, Array::buffer)
    }
}
