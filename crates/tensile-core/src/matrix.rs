use std::cell::Cell;
use std::fmt;
use std::ops::Range;

use crate::buffer::SharedBuffer;
use crate::category::Data;
use crate::device::{Cpu, Device};
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::shape::Shape;

// Matrix: row-major 2-D entity over a SharedBuffer
//
// A matrix is a view: a buffer handle (whose start may sit anywhere inside
// the allocation) plus rows, cols and a row stride. Element (r, c) lives at
// `start + r * row_stride + c`. A freshly allocated matrix is contiguous
// (row_stride == cols); sub-matrices inherit the parent's stride, so their
// rows are separated by gaps.
//
//   parent 4x5, sub_matrix(1..3, 2..5):
//
//     . . . . .
//     . . X X X      start = 1 * 5 + 2
//     . . X X X      rows = 2, cols = 3, row_stride = 5
//     . . . . .
//
// Cloning a Matrix is shallow: both handles see the same elements and the
// holder count goes up, so neither can be written until the other is gone
// (or `make_exclusive` detaches one of them).

/// Dense row-major matrix with shared, copy-cheap storage.
#[derive(Clone)]
pub struct Matrix<T: Element, D: Device = Cpu> {
    mem: SharedBuffer<T, D>,
    rows: usize,
    cols: usize,
    row_stride: usize,
}

impl<T: Element, D: Device> Matrix<T, D> {
    /// Allocate a zero-filled `rows x cols` matrix.
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        let len = Shape::matrix(rows, cols).checked_elem_count()?;
        let mem = SharedBuffer::allocate(len)?;
        Ok(Matrix {
            mem,
            rows,
            cols,
            row_stride: cols,
        })
    }

    /// Build a matrix from row-major data.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        let shape = Shape::matrix(rows, cols);
        let expected = shape.checked_elem_count()?;
        if data.len() != expected {
            return Err(Error::ElementCountMismatch {
                shape,
                expected,
                got: data.len(),
            });
        }
        let mem = SharedBuffer::from_slice(&data)?;
        Ok(Matrix {
            mem,
            rows,
            cols,
            row_stride: cols,
        })
    }

    /// Wrap an existing buffer handle. The caller guarantees that the
    /// rectangle fits inside the buffer.
    pub(crate) fn from_parts(
        mem: SharedBuffer<T, D>,
        rows: usize,
        cols: usize,
        row_stride: usize,
    ) -> Self {
        Matrix {
            mem,
            rows,
            cols,
            row_stride,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Distance, in elements, between the starts of two consecutive rows.
    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    pub fn is_contiguous(&self) -> bool {
        self.row_stride == self.cols || self.rows <= 1
    }

    /// The underlying buffer handle.
    pub fn buffer(&self) -> &SharedBuffer<T, D> {
        &self.mem
    }

    pub(crate) fn cells(&self) -> &[Cell<T>] {
        self.mem.cells()
    }

    fn check_index(&self, row: usize, col: usize) -> Result<usize> {
        if row >= self.rows || col >= self.cols {
            return Err(Error::IndexOutOfBounds {
                index: vec![row, col],
                shape: self.shape(),
            });
        }
        Ok(row * self.row_stride + col)
    }

    /// Read element `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        let idx = self.check_index(row, col)?;
        Ok(self.cells()[idx].get())
    }

    /// Whether no other handle (clone or sub-view) shares the storage.
    pub fn available_for_write(&self) -> bool {
        self.mem.is_exclusive()
    }

    /// Write element `(row, col)`.
    ///
    /// Fails with [`Error::IndexOutOfBounds`] for an index outside the
    /// matrix and with [`Error::SharedWrite`] while the storage is shared.
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        let idx = self.check_index(row, col)?;
        self.mem.ensure_exclusive()?;
        self.cells()[idx].set(value);
        Ok(())
    }

    /// Shallow view of the half-open rectangle `rows x cols`.
    pub fn sub_matrix(&self, rows: Range<usize>, cols: Range<usize>) -> Result<Self> {
        check_range("row", &rows, self.rows)?;
        check_range("col", &cols, self.cols)?;
        let mem = self.mem.offset(rows.start * self.row_stride + cols.start);
        Ok(Matrix {
            mem,
            rows: rows.len(),
            cols: cols.len(),
            row_stride: self.row_stride,
        })
    }

    /// Visible elements in row-major order.
    pub fn to_vec(&self) -> Vec<T> {
        let cells = self.cells();
        let mut out = Vec::with_capacity(self.rows * self.cols);
        for r in 0..self.rows {
            let row = &cells[r * self.row_stride..r * self.row_stride + self.cols];
            out.extend(row.iter().map(Cell::get));
        }
        out
    }

    /// Detach from any other holder by copying the visible elements into a
    /// fresh contiguous buffer. A no-op when the storage is already
    /// exclusive.
    pub fn make_exclusive(&mut self) -> Result<()> {
        if self.available_for_write() {
            return Ok(());
        }
        log::debug!(
            "make_exclusive: copying {} matrix shared by {} handles",
            self.shape(),
            self.mem.holder_count()
        );
        self.mem = SharedBuffer::from_slice(&self.to_vec())?;
        self.row_stride = self.cols;
        Ok(())
    }
}

pub(crate) fn check_range(axis: &'static str, range: &Range<usize>, extent: usize) -> Result<()> {
    if range.start > range.end || range.end > extent {
        return Err(Error::SubViewOutOfBounds {
            axis,
            start: range.start,
            end: range.end,
            extent,
        });
    }
    Ok(())
}

impl<T: Element, D: Device> Data for Matrix<T, D> {
    type Elem = T;
    type Dev = D;

    fn shape(&self) -> Shape {
        Shape::matrix(self.rows, self.cols)
    }
}

/// Value equality: same extents and same visible elements.
impl<T: Element, D: Device> PartialEq for Matrix<T, D> {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows && self.cols == other.cols && self.to_vec() == other.to_vec()
    }
}

impl<T: Element, D: Device> fmt::Debug for Matrix<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Matrix(shape={}, dtype={}, row_stride={}, data={:?})",
            self.shape(),
            T::DTYPE,
            self.row_stride,
            self.to_vec()
        )
    }
}
