use crate::category::{binary_category, ternary_category, unary_category};
use crate::error::{Error, Result};
use crate::op::{BinaryOp, TernaryOp, UnaryOp};
use crate::shape::Shape;

// Organizer: result shapes of operation nodes
//
// Each function validates the operand shapes of one node and returns the
// shape the node will carry. Categories are checked first (through the
// deduction rules in `category`), then extents:
//
//   elementwise   all operand shapes equal; result = operand shape
//   dot           [m, k] . [k, n] -> [m, n], per batch element for batches
//   transpose     [r, c] -> [c, r], batch count unchanged
//   collapse      b x [r, c] -> [r, c]
//   nll           [r, c] x [r, c] -> [],  b x [r, c] x b x [r, c] -> b x []

fn check_batches(lhs: Shape, rhs: Shape) -> Result<()> {
    match (lhs.batch(), rhs.batch()) {
        (Some(expected), Some(got)) if expected != got => {
            Err(Error::BatchCountMismatch { expected, got })
        }
        _ => Ok(()),
    }
}

fn check_same(expected: Shape, got: Shape) -> Result<()> {
    check_batches(expected, got)?;
    if expected != got {
        return Err(Error::ShapeMismatch { expected, got });
    }
    Ok(())
}

pub fn unary_shape(op: UnaryOp, input: Shape) -> Result<Shape> {
    unary_category(op, input.category())?;
    Ok(match op {
        UnaryOp::Transpose => input.transposed(),
        UnaryOp::Collapse => input.element(),
        _ => input,
    })
}

pub fn binary_shape(op: BinaryOp, lhs: Shape, rhs: Shape) -> Result<Shape> {
    binary_category(op, lhs.category(), rhs.category())?;
    match op {
        BinaryOp::Dot => {
            check_batches(lhs, rhs)?;
            if lhs.cols() != rhs.rows() {
                return Err(Error::DotShapeMismatch {
                    m: lhs.rows(),
                    k1: lhs.cols(),
                    k2: rhs.rows(),
                    n: rhs.cols(),
                });
            }
            let product = Shape::matrix(lhs.rows(), rhs.cols());
            Ok(match lhs.batch() {
                Some(batch) => product.with_batch(batch).unwrap_or(product),
                None => product,
            })
        }
        BinaryOp::NegativeLogLikelihood => {
            check_same(lhs, rhs)?;
            Ok(match lhs.batch() {
                Some(batch) => Shape::batch_scalar(batch),
                None => Shape::Scalar,
            })
        }
        _ => {
            check_same(lhs, rhs)?;
            Ok(lhs)
        }
    }
}

pub fn ternary_shape(op: TernaryOp, first: Shape, second: Shape, third: Shape) -> Result<Shape> {
    ternary_category(op, first.category(), second.category(), third.category())?;
    check_same(first, second)?;
    check_same(first, third)?;
    Ok(first)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_shape_law() {
        let s = binary_shape(BinaryOp::Dot, Shape::matrix(2, 3), Shape::matrix(3, 5)).unwrap();
        assert_eq!(s, Shape::matrix(2, 5));
        let err = binary_shape(BinaryOp::Dot, Shape::matrix(2, 3), Shape::matrix(4, 5)).unwrap_err();
        assert!(matches!(
            err,
            Error::DotShapeMismatch {
                m: 2,
                k1: 3,
                k2: 4,
                n: 5
            }
        ));
    }

    #[test]
    fn test_batched_dot() {
        let s = binary_shape(
            BinaryOp::Dot,
            Shape::batch_matrix(4, 2, 3),
            Shape::batch_matrix(4, 3, 1),
        )
        .unwrap();
        assert_eq!(s, Shape::batch_matrix(4, 2, 1));
        let err = binary_shape(
            BinaryOp::Dot,
            Shape::batch_matrix(4, 2, 3),
            Shape::batch_matrix(5, 3, 1),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::BatchCountMismatch {
                expected: 4,
                got: 5
            }
        ));
    }

    #[test]
    fn test_elementwise_requires_equal_shapes() {
        assert!(binary_shape(BinaryOp::Add, Shape::matrix(2, 3), Shape::matrix(3, 2)).is_err());
        assert_eq!(
            binary_shape(
                BinaryOp::Divide,
                Shape::batch_matrix(2, 2, 3),
                Shape::batch_matrix(2, 2, 3)
            )
            .unwrap(),
            Shape::batch_matrix(2, 2, 3)
        );
    }

    #[test]
    fn test_transpose_and_collapse() {
        let t = unary_shape(UnaryOp::Transpose, Shape::batch_matrix(3, 2, 5)).unwrap();
        assert_eq!(t, Shape::batch_matrix(3, 5, 2));
        let t2 = unary_shape(UnaryOp::Transpose, t).unwrap();
        assert_eq!(t2, Shape::batch_matrix(3, 2, 5));
        let c = unary_shape(UnaryOp::Collapse, Shape::batch_matrix(3, 2, 5)).unwrap();
        assert_eq!(c, Shape::matrix(2, 5));
    }

    #[test]
    fn test_nll_shape() {
        let s = binary_shape(
            BinaryOp::NegativeLogLikelihood,
            Shape::batch_matrix(6, 1, 10),
            Shape::batch_matrix(6, 1, 10),
        )
        .unwrap();
        assert_eq!(s, Shape::batch_scalar(6));
    }

    #[test]
    fn test_ternary_shapes_must_agree() {
        let m = Shape::matrix(2, 2);
        assert_eq!(ternary_shape(TernaryOp::Interpolation, m, m, m).unwrap(), m);
        assert!(ternary_shape(
            TernaryOp::NegativeLogLikelihoodDerivation,
            m,
            m,
            Shape::matrix(2, 1)
        )
        .is_err());
    }
}
