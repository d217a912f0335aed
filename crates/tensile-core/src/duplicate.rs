use crate::category::{Category, Data};
use crate::device::{Cpu, Device};
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::shape::Shape;

/// One scalar or matrix expression repeated `count` times.
///
/// A Duplicate stores the element once, whatever the count, and presents it
/// as a batch: a duplicated scalar is a BatchScalar, a duplicated matrix is a
/// BatchMatrix. It has no write interface. Broadcasting creates these to
/// line up an unbatched operand with a batched one.
#[derive(Debug, Clone)]
pub struct Duplicate<T: Element, D: Device = Cpu> {
    element: Box<Expr<T, D>>,
    count: usize,
}

impl<T: Element, D: Device> Duplicate<T, D> {
    /// Fails for a zero count, an element that is already batched, or a
    /// repeated shape too large to address.
    pub fn new(element: impl Into<Expr<T, D>>, count: usize) -> Result<Self> {
        let element = element.into();
        if count == 0 {
            return Err(Error::InvalidArgument(
                "duplicate count must be greater than zero".to_string(),
            ));
        }
        let category = element.category();
        if category.is_batch() {
            return Err(Error::unsupported("duplicate", &[category]));
        }
        let dup = Duplicate {
            element: Box::new(element),
            count,
        };
        dup.shape().checked_elem_count()?;
        Ok(dup)
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// The repeated value, shared by every position of the batch.
    pub fn element(&self) -> &Expr<T, D> {
        &self.element
    }

    pub fn rows(&self) -> usize {
        self.element.shape().rows()
    }

    pub fn cols(&self) -> usize {
        self.element.shape().cols()
    }
}

impl<T: Element, D: Device> Data for Duplicate<T, D> {
    type Elem = T;
    type Dev = D;

    fn shape(&self) -> Shape {
        match self.element.shape() {
            Shape::Scalar => Shape::batch_scalar(self.count),
            Shape::Matrix { rows, cols } => Shape::batch_matrix(self.count, rows, cols),
            other => other,
        }
    }

    fn category(&self) -> Category {
        self.shape().category()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchMatrix;
    use crate::matrix::Matrix;
    use crate::scalar::Scalar;

    #[test]
    fn test_duplicate_matrix() -> Result<()> {
        let m: Matrix<f32> = Matrix::new(2, 3)?;
        let dup = Duplicate::new(m.clone(), 1000)?;
        assert_eq!(dup.count(), 1000);
        assert_eq!(dup.shape(), Shape::batch_matrix(1000, 2, 3));
        assert_eq!((dup.rows(), dup.cols()), (2, 3));
        // one extra holder, whatever the count
        assert_eq!(m.buffer().holder_count(), 2);
        Ok(())
    }

    #[test]
    fn test_duplicate_scalar() -> Result<()> {
        let s: Scalar<f64> = Scalar::new(1.5);
        let dup = Duplicate::new(s, 4)?;
        assert_eq!(dup.category(), Category::BatchScalar);
        Ok(())
    }

    #[test]
    fn test_duplicate_rejects_bad_input() -> Result<()> {
        let m: Matrix<f32> = Matrix::new(1, 1)?;
        assert!(matches!(
            Duplicate::new(m, 0),
            Err(Error::InvalidArgument(_))
        ));
        let b: BatchMatrix<f32> = BatchMatrix::new(2, 1, 1)?;
        assert!(matches!(
            Duplicate::new(b, 3),
            Err(Error::UnsupportedCategory { .. })
        ));
        Ok(())
    }
}
