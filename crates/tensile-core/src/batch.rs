use std::cell::Cell;
use std::fmt;
use std::ops::Range;

use crate::buffer::SharedBuffer;
use crate::category::Data;
use crate::device::{Cpu, Device};
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::matrix::{check_range, Matrix};
use crate::shape::Shape;

// Batches: one buffer, many logical elements
//
// A BatchScalar is a buffer of `len` values. A BatchMatrix keeps all of its
// matrices in one buffer, back to back:
//
//   element b, entry (r, c)  at  start + b * matrix_stride + r * row_stride + c
//
// `element(b)` returns a Matrix view into that slice (zero copy) and
// `sub_batch` narrows every element to the same rectangle, exactly like
// `Matrix::sub_matrix` does for one matrix. Both views bump the holder
// count, so the batch itself becomes read-only while they are alive.

/// A batch of scalars stored contiguously.
#[derive(Clone)]
pub struct BatchScalar<T: Element, D: Device = Cpu> {
    mem: SharedBuffer<T, D>,
    len: usize,
}

impl<T: Element, D: Device> BatchScalar<T, D> {
    /// Allocate `len` zero values.
    pub fn new(len: usize) -> Result<Self> {
        Ok(BatchScalar {
            mem: SharedBuffer::allocate(len)?,
            len,
        })
    }

    pub fn from_vec(data: Vec<T>) -> Result<Self> {
        Ok(BatchScalar {
            mem: SharedBuffer::from_slice(&data)?,
            len: data.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn buffer(&self) -> &SharedBuffer<T, D> {
        &self.mem
    }

    pub(crate) fn cells(&self) -> &[Cell<T>] {
        self.mem.cells()
    }

    /// Copy of the value at `index`.
    pub fn get(&self, index: usize) -> Result<T> {
        if index >= self.len {
            return Err(Error::IndexOutOfBounds {
                index: vec![index],
                shape: self.shape(),
            });
        }
        Ok(self.cells()[index].get())
    }

    pub fn available_for_write(&self) -> bool {
        self.mem.is_exclusive()
    }

    pub fn set(&mut self, index: usize, value: T) -> Result<()> {
        if index >= self.len {
            return Err(Error::IndexOutOfBounds {
                index: vec![index],
                shape: self.shape(),
            });
        }
        self.mem.ensure_exclusive()?;
        self.cells()[index].set(value);
        Ok(())
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.cells()[..self.len].iter().map(Cell::get).collect()
    }

    /// Copy into a fresh buffer if the storage is shared.
    pub fn make_exclusive(&mut self) -> Result<()> {
        if !self.available_for_write() {
            self.mem = SharedBuffer::from_slice(&self.to_vec())?;
        }
        Ok(())
    }
}

impl<T: Element, D: Device> Data for BatchScalar<T, D> {
    type Elem = T;
    type Dev = D;

    fn shape(&self) -> Shape {
        Shape::batch_scalar(self.len)
    }
}

impl<T: Element, D: Device> PartialEq for BatchScalar<T, D> {
    fn eq(&self, other: &Self) -> bool {
        self.to_vec() == other.to_vec()
    }
}

impl<T: Element, D: Device> fmt::Debug for BatchScalar<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BatchScalar(shape={}, dtype={}, data={:?})",
            self.shape(),
            T::DTYPE,
            self.to_vec()
        )
    }
}

/// A batch of equally sized matrices stored in one buffer.
#[derive(Clone)]
pub struct BatchMatrix<T: Element, D: Device = Cpu> {
    mem: SharedBuffer<T, D>,
    batch: usize,
    rows: usize,
    cols: usize,
    row_stride: usize,
    matrix_stride: usize,
}

impl<T: Element, D: Device> BatchMatrix<T, D> {
    /// Allocate `batch` zero-filled `rows x cols` matrices.
    pub fn new(batch: usize, rows: usize, cols: usize) -> Result<Self> {
        let len = Shape::batch_matrix(batch, rows, cols).checked_elem_count()?;
        Ok(BatchMatrix {
            mem: SharedBuffer::allocate(len)?,
            batch,
            rows,
            cols,
            row_stride: cols,
            matrix_stride: Shape::matrix(rows, cols).checked_elem_count()?,
        })
    }

    /// Build from data laid out element after element, each row-major.
    pub fn from_vec(batch: usize, rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        let shape = Shape::batch_matrix(batch, rows, cols);
        let expected = shape.checked_elem_count()?;
        if data.len() != expected {
            return Err(Error::ElementCountMismatch {
                shape,
                expected,
                got: data.len(),
            });
        }
        Ok(BatchMatrix {
            mem: SharedBuffer::from_slice(&data)?,
            batch,
            rows,
            cols,
            row_stride: cols,
            matrix_stride: Shape::matrix(rows, cols).checked_elem_count()?,
        })
    }

    /// Deep-copy a sequence of equally shaped matrices into one batch.
    pub fn from_matrices(rows: usize, cols: usize, items: &[Matrix<T, D>]) -> Result<Self> {
        let mut data = Vec::with_capacity(
            Shape::batch_matrix(items.len(), rows, cols).checked_elem_count()?,
        );
        for m in items {
            if m.rows() != rows || m.cols() != cols {
                return Err(Error::ShapeMismatch {
                    expected: Shape::matrix(rows, cols),
                    got: m.shape(),
                });
            }
            data.extend(m.to_vec());
        }
        Self::from_vec(items.len(), rows, cols, data)
    }

    pub fn batch(&self) -> usize {
        self.batch
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    /// Distance, in elements, between the starts of two consecutive matrices.
    pub fn matrix_stride(&self) -> usize {
        self.matrix_stride
    }

    pub fn buffer(&self) -> &SharedBuffer<T, D> {
        &self.mem
    }

    pub(crate) fn cells(&self) -> &[Cell<T>] {
        self.mem.cells()
    }

    fn check_index(&self, b: usize, row: usize, col: usize) -> Result<usize> {
        if b >= self.batch || row >= self.rows || col >= self.cols {
            return Err(Error::IndexOutOfBounds {
                index: vec![b, row, col],
                shape: self.shape(),
            });
        }
        Ok(b * self.matrix_stride + row * self.row_stride + col)
    }

    pub fn get(&self, b: usize, row: usize, col: usize) -> Result<T> {
        let idx = self.check_index(b, row, col)?;
        Ok(self.cells()[idx].get())
    }

    pub fn available_for_write(&self) -> bool {
        self.mem.is_exclusive()
    }

    pub fn set(&mut self, b: usize, row: usize, col: usize, value: T) -> Result<()> {
        let idx = self.check_index(b, row, col)?;
        self.mem.ensure_exclusive()?;
        self.cells()[idx].set(value);
        Ok(())
    }

    /// Matrix view of batch element `b`, sharing this batch's buffer.
    pub fn element(&self, b: usize) -> Result<Matrix<T, D>> {
        if b >= self.batch {
            return Err(Error::IndexOutOfBounds {
                index: vec![b],
                shape: self.shape(),
            });
        }
        Ok(Matrix::from_parts(
            self.mem.offset(b * self.matrix_stride),
            self.rows,
            self.cols,
            self.row_stride,
        ))
    }

    /// Narrow every batch element to the half-open rectangle `rows x cols`.
    pub fn sub_batch(&self, rows: Range<usize>, cols: Range<usize>) -> Result<Self> {
        check_range("row", &rows, self.rows)?;
        check_range("col", &cols, self.cols)?;
        Ok(BatchMatrix {
            mem: self.mem.offset(rows.start * self.row_stride + cols.start),
            batch: self.batch,
            rows: rows.len(),
            cols: cols.len(),
            row_stride: self.row_stride,
            matrix_stride: self.matrix_stride,
        })
    }

    /// Visible elements, batch element after batch element, each row-major.
    pub fn to_vec(&self) -> Vec<T> {
        let cells = self.cells();
        let mut out = Vec::with_capacity(self.batch * self.rows * self.cols);
        for b in 0..self.batch {
            for r in 0..self.rows {
                let at = b * self.matrix_stride + r * self.row_stride;
                out.extend(cells[at..at + self.cols].iter().map(Cell::get));
            }
        }
        out
    }

    /// Copy into a fresh contiguous buffer if the storage is shared.
    pub fn make_exclusive(&mut self) -> Result<()> {
        if self.available_for_write() {
            return Ok(());
        }
        log::debug!(
            "make_exclusive: copying {} batch shared by {} handles",
            self.shape(),
            self.mem.holder_count()
        );
        self.mem = SharedBuffer::from_slice(&self.to_vec())?;
        self.row_stride = self.cols;
        self.matrix_stride = self.rows * self.cols;
        Ok(())
    }
}

impl<T: Element, D: Device> Data for BatchMatrix<T, D> {
    type Elem = T;
    type Dev = D;

    fn shape(&self) -> Shape {
        Shape::batch_matrix(self.batch, self.rows, self.cols)
    }
}

impl<T: Element, D: Device> PartialEq for BatchMatrix<T, D> {
    fn eq(&self, other: &Self) -> bool {
        self.shape() == other.shape() && self.to_vec() == other.to_vec()
    }
}

impl<T: Element, D: Device> fmt::Debug for BatchMatrix<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BatchMatrix(shape={}, dtype={}, data={:?})",
            self.shape(),
            T::DTYPE,
            self.to_vec()
        )
    }
}
