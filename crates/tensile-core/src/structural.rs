use std::marker::PhantomData;

use crate::access::lower_access;
use crate::category::Data;
use crate::device::{Cpu, Device};
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::matrix::Matrix;
use crate::scalar::Scalar;
use crate::shape::Shape;

// Structural matrices: shape plus a parameter, no storage
//
// These stand in for a Matrix whose entries are known up front. They are
// read-only by construction: there is no buffer, so there is nothing to
// write. `to_matrix` materialises one when a real buffer is needed (the
// evaluator does this for leaves).

/// A `rows x cols` matrix whose every entry equals one value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrivialMatrix<T: Element, D: Device = Cpu> {
    rows: usize,
    cols: usize,
    value: Scalar<T, D>,
}

impl<T: Element, D: Device> TrivialMatrix<T, D> {
    /// Accepts either a raw element or a [`Scalar`].
    pub fn new(rows: usize, cols: usize, value: impl Into<Scalar<T, D>>) -> Self {
        TrivialMatrix {
            rows,
            cols,
            value: value.into(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn value(&self) -> Scalar<T, D> {
        self.value
    }

    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        check_index(row, col, self.shape())?;
        Ok(self.value.value())
    }

    pub fn to_matrix(&self) -> Result<Matrix<T, D>> {
        materialize(self.rows, self.cols, |_, _| self.value.value())
    }
}

impl<T: Element, D: Device> Data for TrivialMatrix<T, D> {
    type Elem = T;
    type Dev = D;

    fn shape(&self) -> Shape {
        Shape::matrix(self.rows, self.cols)
    }
}

/// A `rows x cols` matrix of zeros.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZeroMatrix<T: Element, D: Device = Cpu> {
    rows: usize,
    cols: usize,
    marker: PhantomData<(T, D)>,
}

impl<T: Element, D: Device> ZeroMatrix<T, D> {
    pub fn new(rows: usize, cols: usize) -> Self {
        ZeroMatrix {
            rows,
            cols,
            marker: PhantomData,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        check_index(row, col, self.shape())?;
        Ok(T::zero())
    }

    pub fn to_matrix(&self) -> Result<Matrix<T, D>> {
        Matrix::new(self.rows, self.cols)
    }
}

impl<T: Element, D: Device> Data for ZeroMatrix<T, D> {
    type Elem = T;
    type Dev = D;

    fn shape(&self) -> Shape {
        Shape::matrix(self.rows, self.cols)
    }
}

/// A row vector of `cols` entries: one at `hot`, zero elsewhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OneHotVector<T: Element, D: Device = Cpu> {
    cols: usize,
    hot: usize,
    marker: PhantomData<(T, D)>,
}

impl<T: Element, D: Device> OneHotVector<T, D> {
    /// Fails when `hot` is not a valid column.
    pub fn new(cols: usize, hot: usize) -> Result<Self> {
        if hot >= cols {
            return Err(Error::IndexOutOfBounds {
                index: vec![0, hot],
                shape: Shape::matrix(1, cols),
            });
        }
        Ok(OneHotVector {
            cols,
            hot,
            marker: PhantomData,
        })
    }

    pub fn rows(&self) -> usize {
        1
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn hot_pos(&self) -> usize {
        self.hot
    }

    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        check_index(row, col, self.shape())?;
        Ok(if col == self.hot { T::one() } else { T::zero() })
    }

    pub fn to_matrix(&self) -> Result<Matrix<T, D>> {
        let hot = self.hot;
        materialize(1, self.cols, |_, c| if c == hot { T::one() } else { T::zero() })
    }
}

impl<T: Element, D: Device> Data for OneHotVector<T, D> {
    type Elem = T;
    type Dev = D;

    fn shape(&self) -> Shape {
        Shape::matrix(1, self.cols)
    }
}

fn check_index(row: usize, col: usize, shape: Shape) -> Result<()> {
    if row >= shape.rows() || col >= shape.cols() {
        return Err(Error::IndexOutOfBounds {
            index: vec![row, col],
            shape,
        });
    }
    Ok(())
}

fn materialize<T: Element, D: Device>(
    rows: usize,
    cols: usize,
    f: impl Fn(usize, usize) -> T,
) -> Result<Matrix<T, D>> {
    let out = Matrix::new(rows, cols)?;
    let low = lower_access(&out);
    for r in 0..rows {
        for c in 0..cols {
            // SAFETY: `out` was allocated above and is not shared yet.
            unsafe { low.write(r * low.row_stride() + c, f(r, c)) };
        }
    }
    Ok(out)
}
