use crate::category::{Category, Data};
use crate::device::Device;
use crate::dtype::Element;
use crate::duplicate::Duplicate;
use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::op::BinaryOp;
use crate::shape::Shape;
use crate::structural::TrivialMatrix;

// Broadcasting: bring two operands to a common category
//
// Elementwise binary operations accept Scalar, Matrix and BatchMatrix
// operands in any mix. Before the node is built, the operand of lower rank
// is lifted to the other operand's category:
//
//   Scalar -> Matrix        TrivialMatrix(rows, cols, value)
//   Scalar -> BatchMatrix   Duplicate(TrivialMatrix(rows, cols, value), batch)
//   Matrix -> BatchMatrix   Duplicate(matrix, batch)
//
// Lifting happens in place: the left operand stays on the left. That keeps
// non-commutative operations right, `subtract(m, batch)` is m - batch[i]
// for every i, never batch[i] - m.
//
// Dot only lifts Matrix <-> BatchMatrix; a scalar has no matrix product.
// Only a concrete Scalar can become a TrivialMatrix. A scalar-valued node
// (e.g. a negative log likelihood) is rejected.

fn rank(category: Category) -> Option<u8> {
    match category {
        Category::Scalar => Some(0),
        Category::Matrix => Some(1),
        Category::BatchMatrix => Some(2),
        Category::BatchScalar => None,
    }
}

fn lift<T: Element, D: Device>(op: BinaryOp, x: Expr<T, D>, target: Shape) -> Result<Expr<T, D>> {
    let lifted: Expr<T, D> = match (x, target) {
        (Expr::Scalar(s), Shape::Matrix { rows, cols }) => {
            Expr::Trivial(TrivialMatrix::new(rows, cols, s))
        }
        (Expr::Scalar(s), Shape::BatchMatrix { batch, rows, cols }) => {
            let fill = Expr::Trivial(TrivialMatrix::new(rows, cols, s));
            Expr::Duplicate(Duplicate::new(fill, batch)?)
        }
        (x, Shape::BatchMatrix { batch, .. }) if x.category() == Category::Matrix => {
            Expr::Duplicate(Duplicate::new(x, batch)?)
        }
        (x, target) => {
            return Err(Error::unsupported(
                op.name(),
                &[x.category(), target.category()],
            ))
        }
    };
    log::trace!("{}: broadcast operand to {}", op.name(), lifted);
    Ok(lifted)
}

/// Lift the lower-ranked operand of an elementwise operation to the other
/// operand's category, keeping operand order.
pub fn broadcast_elementwise<T: Element, D: Device>(
    op: BinaryOp,
    lhs: Expr<T, D>,
    rhs: Expr<T, D>,
) -> Result<(Expr<T, D>, Expr<T, D>)> {
    let (lc, rc) = (lhs.category(), rhs.category());
    if lc == rc {
        return Ok((lhs, rhs));
    }
    match (rank(lc), rank(rc)) {
        (Some(l), Some(r)) if l < r => {
            let target = rhs.shape();
            Ok((lift(op, lhs, target)?, rhs))
        }
        (Some(_), Some(_)) => {
            let target = lhs.shape();
            Ok((lhs, lift(op, rhs, target)?))
        }
        _ => Err(Error::unsupported(op.name(), &[lc, rc])),
    }
}

/// Wrap the bare matrix of a Matrix x BatchMatrix product in a Duplicate.
pub fn broadcast_dot<T: Element, D: Device>(
    lhs: Expr<T, D>,
    rhs: Expr<T, D>,
) -> Result<(Expr<T, D>, Expr<T, D>)> {
    match (lhs.category(), rhs.category()) {
        (Category::Matrix, Category::BatchMatrix) => {
            let target = rhs.shape();
            Ok((lift(BinaryOp::Dot, lhs, target)?, rhs))
        }
        (Category::BatchMatrix, Category::Matrix) => {
            let target = lhs.shape();
            Ok((lhs, lift(BinaryOp::Dot, rhs, target)?))
        }
        _ => Ok((lhs, rhs)),
    }
}
