use std::fmt;

use crate::device::Device;
use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use crate::op::{BinaryOp, TernaryOp, UnaryOp};
use crate::shape::Shape;

// Category: shape class of an entity
//
// The four categories are mutually exclusive; there is no hierarchy between
// them (a Matrix is not a BatchMatrix of one, a Scalar is not a 1x1 Matrix).
// Operators are defined per category combination, and the deduction rules
// below decide the category of an operator's result:
//
//   default    all operands share one category; the result has it too
//   Collapse   BatchMatrix -> Matrix
//   NLL        Matrix x Matrix -> Scalar, BatchMatrix x BatchMatrix -> BatchScalar
//
// Category mixing (Scalar with Matrix, Matrix with BatchMatrix) never reaches
// these rules: broadcasting rewrites the operands first.

/// Shape class of an entity or expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Scalar,
    Matrix,
    BatchScalar,
    BatchMatrix,
}

impl Category {
    pub fn is_batch(&self) -> bool {
        matches!(self, Category::BatchScalar | Category::BatchMatrix)
    }

    /// Whether values of this category are laid out as matrices.
    pub fn is_matrix_like(&self) -> bool {
        matches!(self, Category::Matrix | Category::BatchMatrix)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Scalar => "Scalar",
            Category::Matrix => "Matrix",
            Category::BatchScalar => "BatchScalar",
            Category::BatchMatrix => "BatchMatrix",
        };
        write!(f, "{}", s)
    }
}

/// The entity-level interface shared by data and expression nodes.
///
/// Element type and device are associated types, so two values can only
/// meet in one expression when they agree on both.
pub trait Data {
    type Elem: Element;
    type Dev: Device;

    fn shape(&self) -> Shape;

    fn category(&self) -> Category {
        self.shape().category()
    }

    fn dtype(&self) -> DType {
        <Self::Elem as Element>::DTYPE
    }
}

/// Result category of a unary operation.
pub fn unary_category(op: UnaryOp, input: Category) -> Result<Category> {
    match (op, input) {
        (UnaryOp::Collapse, Category::BatchMatrix) => Ok(Category::Matrix),
        (UnaryOp::Collapse, _) => Err(Error::unsupported(op.name(), &[input])),
        (_, Category::Matrix | Category::BatchMatrix) => Ok(input),
        _ => Err(Error::unsupported(op.name(), &[input])),
    }
}

/// Result category of a binary operation whose operands were already
/// brought to a common category.
pub fn binary_category(op: BinaryOp, lhs: Category, rhs: Category) -> Result<Category> {
    if lhs != rhs || !lhs.is_matrix_like() {
        return Err(Error::unsupported(op.name(), &[lhs, rhs]));
    }
    match (op, lhs) {
        (BinaryOp::NegativeLogLikelihood, Category::Matrix) => Ok(Category::Scalar),
        (BinaryOp::NegativeLogLikelihood, _) => Ok(Category::BatchScalar),
        _ => Ok(lhs),
    }
}

/// Result category of a ternary operation: all three operands must agree.
pub fn ternary_category(op: TernaryOp, a: Category, b: Category, c: Category) -> Result<Category> {
    if a != b || a != c || !a.is_matrix_like() {
        return Err(Error::unsupported(op.name(), &[a, b, c]));
    }
    Ok(a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_changes_category() {
        assert_eq!(
            unary_category(UnaryOp::Collapse, Category::BatchMatrix).unwrap(),
            Category::Matrix
        );
        assert!(unary_category(UnaryOp::Collapse, Category::Matrix).is_err());
    }

    #[test]
    fn test_default_rule_keeps_category() {
        assert_eq!(
            unary_category(UnaryOp::Sigmoid, Category::BatchMatrix).unwrap(),
            Category::BatchMatrix
        );
        assert_eq!(
            binary_category(BinaryOp::Add, Category::Matrix, Category::Matrix).unwrap(),
            Category::Matrix
        );
        assert!(unary_category(UnaryOp::Tanh, Category::Scalar).is_err());
    }

    #[test]
    fn test_nll_category() {
        assert_eq!(
            binary_category(
                BinaryOp::NegativeLogLikelihood,
                Category::Matrix,
                Category::Matrix
            )
            .unwrap(),
            Category::Scalar
        );
        assert_eq!(
            binary_category(
                BinaryOp::NegativeLogLikelihood,
                Category::BatchMatrix,
                Category::BatchMatrix
            )
            .unwrap(),
            Category::BatchScalar
        );
    }

    #[test]
    fn test_mixed_categories_rejected() {
        let err = binary_category(BinaryOp::Dot, Category::Matrix, Category::BatchMatrix)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "dot does not accept operands of category Matrix x BatchMatrix"
        );
        assert!(ternary_category(
            TernaryOp::Interpolation,
            Category::Matrix,
            Category::Matrix,
            Category::Scalar
        )
        .is_err());
    }
}
