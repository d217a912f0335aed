use std::cell::Cell;

use crate::batch::{BatchMatrix, BatchScalar};
use crate::device::Device;
use crate::dtype::Element;
use crate::matrix::Matrix;

// Privileged access: raw memory and strides for trusted internal code
//
// The public entity API is bounds-checked and refuses to write while a
// buffer is shared. Fillers, data copy and the evaluator need to walk the
// flat buffer directly instead, so each buffer-backed entity can hand out a
// LowerAccess: a borrow of its elements plus the strides needed to traverse
// them.
//
// Writing through a LowerAccess bypasses the exclusivity check, so `write`
// is `unsafe`: callers must have checked `available_for_write` themselves
// (or own a buffer they just allocated). The borrow does not count as a
// holder.
//
//   Matrix        row_stride = distance between rows,  matrix_stride = 0
//   BatchScalar   row_stride = 1,                      matrix_stride = 1
//   BatchMatrix   row_stride = distance between rows,  matrix_stride = distance between elements

/// Borrowed low-level view of a buffer-backed entity.
pub struct LowerAccess<'a, T: Element> {
    cells: &'a [Cell<T>],
    row_stride: usize,
    matrix_stride: usize,
}

impl<'a, T: Element> LowerAccess<'a, T> {
    /// Read-only pointer to the entity's first element.
    pub fn raw_memory(&self) -> *const T {
        self.cells.as_ptr() as *const T
    }

    /// Mutable pointer to the entity's first element. Skips the
    /// write-exclusivity check.
    ///
    /// `Cell<T>` has the same layout as `T`, and writing through a pointer
    /// derived from a `Cell` is allowed while no `&T` to the element exists.
    pub fn mutable_raw_memory(&self) -> *mut T {
        self.cells.as_ptr() as *mut T
    }

    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    pub fn matrix_stride(&self) -> usize {
        self.matrix_stride
    }

    /// Read the element at flat offset `at` from the start.
    pub fn read(&self, at: usize) -> T {
        self.cells[at].get()
    }

    /// Write the element at flat offset `at` from the start.
    ///
    /// Panics if `at` lies past the end of the allocation.
    ///
    /// Safe code cannot write through a lowered entity:
    ///
    /// ```compile_fail,E0133
    /// use tensile_core::{lower_access, Matrix};
    ///
    /// let m: Matrix<f32> = Matrix::new(1, 1).unwrap();
    /// let alias = m.clone();
    /// lower_access(&m).write(0, 42.0);
    /// ```
    ///
    /// # Safety
    ///
    /// The lowered entity must be the only handle on its buffer
    /// (`available_for_write`), or the buffer must have been allocated by the
    /// caller and not shared yet. Every other handle assumes its elements
    /// only change through an exclusive owner.
    pub unsafe fn write(&self, at: usize, value: T) {
        self.cells[at].set(value)
    }
}

/// Entities that can be lowered to their raw storage.
pub trait Lower {
    type Elem: Element;

    fn lower(&self) -> LowerAccess<'_, Self::Elem>;
}

impl<T: Element, D: Device> Lower for Matrix<T, D> {
    type Elem = T;

    fn lower(&self) -> LowerAccess<'_, T> {
        LowerAccess {
            cells: self.cells(),
            row_stride: self.row_stride(),
            matrix_stride: 0,
        }
    }
}

impl<T: Element, D: Device> Lower for BatchScalar<T, D> {
    type Elem = T;

    fn lower(&self) -> LowerAccess<'_, T> {
        LowerAccess {
            cells: self.cells(),
            row_stride: 1,
            matrix_stride: 1,
        }
    }
}

impl<T: Element, D: Device> Lower for BatchMatrix<T, D> {
    type Elem = T;

    fn lower(&self) -> LowerAccess<'_, T> {
        LowerAccess {
            cells: self.cells(),
            row_stride: self.row_stride(),
            matrix_stride: self.matrix_stride(),
        }
    }
}

/// Obtain privileged access to a buffer-backed entity.
pub fn lower_access<E: Lower>(entity: &E) -> LowerAccess<'_, E::Elem> {
    entity.lower()
}
