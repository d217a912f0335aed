use std::fmt;

use crate::category::Category;
use crate::error::{Error, Result};

// Shape: extents of a scalar, a matrix, or a batch of either
//
// MetaNN-style data does not distinguish vectors from matrices: a vector
// is a matrix with one row or one column. That leaves four shape classes,
// one per category:
//
//   Scalar                        []
//   Matrix { rows, cols }         [rows, cols]
//   BatchScalar { batch }         batch x []
//   BatchMatrix { batch, r, c }   batch x [rows, cols]
//
// Expression nodes compute their Shape once, when they are built, and the
// evaluator allocates outputs from it.

/// Extents of an entity or expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Scalar,
    Matrix { rows: usize, cols: usize },
    BatchScalar { batch: usize },
    BatchMatrix { batch: usize, rows: usize, cols: usize },
}

impl Shape {
    pub fn matrix(rows: usize, cols: usize) -> Self {
        Shape::Matrix { rows, cols }
    }

    pub fn batch_scalar(batch: usize) -> Self {
        Shape::BatchScalar { batch }
    }

    pub fn batch_matrix(batch: usize, rows: usize, cols: usize) -> Self {
        Shape::BatchMatrix { batch, rows, cols }
    }

    /// The category this shape belongs to.
    pub fn category(&self) -> Category {
        match self {
            Shape::Scalar => Category::Scalar,
            Shape::Matrix { .. } => Category::Matrix,
            Shape::BatchScalar { .. } => Category::BatchScalar,
            Shape::BatchMatrix { .. } => Category::BatchMatrix,
        }
    }

    /// Row count. Scalar shapes report 1.
    pub fn rows(&self) -> usize {
        match *self {
            Shape::Matrix { rows, .. } | Shape::BatchMatrix { rows, .. } => rows,
            Shape::Scalar | Shape::BatchScalar { .. } => 1,
        }
    }

    /// Column count. Scalar shapes report 1.
    pub fn cols(&self) -> usize {
        match *self {
            Shape::Matrix { cols, .. } | Shape::BatchMatrix { cols, .. } => cols,
            Shape::Scalar | Shape::BatchScalar { .. } => 1,
        }
    }

    /// Number of batch elements, or `None` for unbatched shapes.
    pub fn batch(&self) -> Option<usize> {
        match *self {
            Shape::BatchScalar { batch } | Shape::BatchMatrix { batch, .. } => Some(batch),
            Shape::Scalar | Shape::Matrix { .. } => None,
        }
    }

    /// Total number of elements, saturating at `usize::MAX`.
    pub fn elem_count(&self) -> usize {
        self.checked_elem_count().unwrap_or(usize::MAX)
    }

    /// Total number of elements, or `ShapeTooLarge` when it overflows.
    pub fn checked_elem_count(&self) -> Result<usize> {
        self.batch()
            .unwrap_or(1)
            .checked_mul(self.rows())
            .and_then(|n| n.checked_mul(self.cols()))
            .ok_or(Error::ShapeTooLarge { shape: *self })
    }

    /// Shape of one element of a batch. Unbatched shapes are returned as is.
    pub fn element(&self) -> Shape {
        match *self {
            Shape::BatchScalar { .. } => Shape::Scalar,
            Shape::BatchMatrix { rows, cols, .. } => Shape::Matrix { rows, cols },
            other => other,
        }
    }

    /// Batched version of an unbatched shape, `None` if already batched.
    pub fn with_batch(&self, batch: usize) -> Option<Shape> {
        match *self {
            Shape::Scalar => Some(Shape::BatchScalar { batch }),
            Shape::Matrix { rows, cols } => Some(Shape::BatchMatrix { batch, rows, cols }),
            Shape::BatchScalar { .. } | Shape::BatchMatrix { .. } => None,
        }
    }

    /// Swap rows and columns (of every element, for batches).
    pub fn transposed(&self) -> Shape {
        match *self {
            Shape::Matrix { rows, cols } => Shape::Matrix {
                rows: cols,
                cols: rows,
            },
            Shape::BatchMatrix { batch, rows, cols } => Shape::BatchMatrix {
                batch,
                rows: cols,
                cols: rows,
            },
            other => other,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Scalar => write!(f, "[]"),
            Shape::Matrix { rows, cols } => write!(f, "[{}, {}]", rows, cols),
            Shape::BatchScalar { batch } => write!(f, "{} x []", batch),
            Shape::BatchMatrix { batch, rows, cols } => {
                write!(f, "{} x [{}, {}]", batch, rows, cols)
            }
        }
    }
}

impl From<()> for Shape {
    fn from(_: ()) -> Self {
        Shape::Scalar
    }
}

impl From<(usize, usize)> for Shape {
    fn from((rows, cols): (usize, usize)) -> Self {
        Shape::Matrix { rows, cols }
    }
}

impl From<(usize, usize, usize)> for Shape {
    fn from((batch, rows, cols): (usize, usize, usize)) -> Self {
        Shape::BatchMatrix { batch, rows, cols }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_shape() {
        let s = Shape::from(());
        assert_eq!(s.category(), Category::Scalar);
        assert_eq!(s.elem_count(), 1);
        assert_eq!(s.batch(), None);
    }

    #[test]
    fn test_batch_matrix_shape() {
        let s = Shape::from((4, 2, 3));
        assert_eq!(s.category(), Category::BatchMatrix);
        assert_eq!(s.elem_count(), 24);
        assert_eq!(s.element(), Shape::matrix(2, 3));
        assert_eq!(s.transposed(), Shape::batch_matrix(4, 3, 2));
    }

    #[test]
    fn test_elem_count_overflow() {
        let s = Shape::batch_matrix(1 << 20, 1 << 30, 1 << 30);
        assert!(matches!(
            s.checked_elem_count(),
            Err(Error::ShapeTooLarge { .. })
        ));
        assert_eq!(s.elem_count(), usize::MAX);
        assert_eq!(Shape::matrix(3, 4).checked_elem_count().ok(), Some(12));
    }

    #[test]
    fn test_with_batch() {
        assert_eq!(Shape::Scalar.with_batch(5), Some(Shape::batch_scalar(5)));
        assert_eq!(
            Shape::matrix(2, 3).with_batch(5),
            Some(Shape::batch_matrix(5, 2, 3))
        );
        assert_eq!(Shape::batch_scalar(2).with_batch(5), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Shape::matrix(3, 4)), "[3, 4]");
        assert_eq!(format!("{}", Shape::batch_matrix(2, 3, 4)), "2 x [3, 4]");
        assert_eq!(format!("{}", Shape::Scalar), "[]");
    }
}
