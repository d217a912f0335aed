use std::fmt;

use crate::category::Data;
use crate::device::{Cpu, Device};
use crate::dtype::Element;
use crate::error::Result;
use crate::expr::Expr;
use crate::organizer;
use crate::shape::Shape;

// Op: expression-graph nodes
//
// An operation node owns its operands (entities or other nodes, as Expr
// values) and the shape of its result. The shape is computed exactly once,
// when the node is built, by the organizer; building a node never touches
// buffer contents.
//
// Example: c = subtract(a, b) with a: [2, 3], b: [2, 3]
//   c = Expr::Op(OpNode {
//         op: Op::Binary { op: Subtract, lhs: a, rhs: b },
//         shape: [2, 3],
//       })
//
// Nodes are immutable and reference counted (Expr::Op holds an Rc), so one
// node can feed any number of parents. Dropping the last parent releases the
// node, which in turn releases its operands' buffer handles.

/// Operations with one operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Abs,
    Sigmoid,
    Sign,
    Tanh,
    Transpose,
    /// Sum of every element of a batch.
    Collapse,
    /// Row-wise softmax.
    VecSoftmax,
}

impl UnaryOp {
    pub fn name(&self) -> &'static str {
        match self {
            UnaryOp::Abs => "abs",
            UnaryOp::Sigmoid => "sigmoid",
            UnaryOp::Sign => "sign",
            UnaryOp::Tanh => "tanh",
            UnaryOp::Transpose => "transpose",
            UnaryOp::Collapse => "collapse",
            UnaryOp::VecSoftmax => "vec_softmax",
        }
    }
}

/// Operations with two operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    ElementMul,
    Divide,
    Dot,
    NegativeLogLikelihood,
    SigmoidDerivation,
    TanhDerivation,
    VecSoftmaxDerivation,
}

impl BinaryOp {
    pub fn name(&self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Subtract => "subtract",
            BinaryOp::ElementMul => "element_mul",
            BinaryOp::Divide => "divide",
            BinaryOp::Dot => "dot",
            BinaryOp::NegativeLogLikelihood => "negative_log_likelihood",
            BinaryOp::SigmoidDerivation => "sigmoid_derivation",
            BinaryOp::TanhDerivation => "tanh_derivation",
            BinaryOp::VecSoftmaxDerivation => "vec_softmax_derivation",
        }
    }

    /// Whether the operation combines operands entry by entry (and so
    /// accepts broadcasting).
    pub fn is_elementwise(&self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Subtract | BinaryOp::ElementMul | BinaryOp::Divide
        )
    }
}

/// Operations with three operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TernaryOp {
    Interpolation,
    NegativeLogLikelihoodDerivation,
}

impl TernaryOp {
    pub fn name(&self) -> &'static str {
        match self {
            TernaryOp::Interpolation => "interpolation",
            TernaryOp::NegativeLogLikelihoodDerivation => "negative_log_likelihood_derivation",
        }
    }
}

/// An operation tag together with its operands.
#[derive(Debug, Clone)]
pub enum Op<T: Element, D: Device = Cpu> {
    Unary {
        op: UnaryOp,
        input: Expr<T, D>,
    },
    Binary {
        op: BinaryOp,
        lhs: Expr<T, D>,
        rhs: Expr<T, D>,
    },
    Ternary {
        op: TernaryOp,
        first: Expr<T, D>,
        second: Expr<T, D>,
        third: Expr<T, D>,
    },
}

impl<T: Element, D: Device> Op<T, D> {
    pub fn name(&self) -> &'static str {
        match self {
            Op::Unary { op, .. } => op.name(),
            Op::Binary { op, .. } => op.name(),
            Op::Ternary { op, .. } => op.name(),
        }
    }

    /// Operands in call order.
    pub fn operands(&self) -> Vec<&Expr<T, D>> {
        match self {
            Op::Unary { input, .. } => vec![input],
            Op::Binary { lhs, rhs, .. } => vec![lhs, rhs],
            Op::Ternary {
                first,
                second,
                third,
                ..
            } => vec![first, second, third],
        }
    }
}

/// An immutable expression-graph node with its cached result shape.
#[derive(Debug)]
pub struct OpNode<T: Element, D: Device = Cpu> {
    op: Op<T, D>,
    shape: Shape,
}

impl<T: Element, D: Device> OpNode<T, D> {
    /// Validate the operand and build the node.
    pub fn unary(op: UnaryOp, input: Expr<T, D>) -> Result<Self> {
        let shape = organizer::unary_shape(op, input.shape())?;
        Ok(Self::with_shape(Op::Unary { op, input }, shape))
    }

    /// Validate the operands and build the node. Operands must already
    /// share a category; see `broadcast` for mixing categories.
    pub fn binary(op: BinaryOp, lhs: Expr<T, D>, rhs: Expr<T, D>) -> Result<Self> {
        let shape = organizer::binary_shape(op, lhs.shape(), rhs.shape())?;
        Ok(Self::with_shape(Op::Binary { op, lhs, rhs }, shape))
    }

    pub fn ternary(
        op: TernaryOp,
        first: Expr<T, D>,
        second: Expr<T, D>,
        third: Expr<T, D>,
    ) -> Result<Self> {
        let shape = organizer::ternary_shape(op, first.shape(), second.shape(), third.shape())?;
        Ok(Self::with_shape(
            Op::Ternary {
                op,
                first,
                second,
                third,
            },
            shape,
        ))
    }

    fn with_shape(op: Op<T, D>, shape: Shape) -> Self {
        log::trace!("built {} node, result {}", op.name(), shape);
        OpNode { op, shape }
    }

    pub fn op(&self) -> &Op<T, D> {
        &self.op
    }

    pub fn name(&self) -> &'static str {
        self.op.name()
    }
}

impl<T: Element, D: Device> Data for OpNode<T, D> {
    type Elem = T;
    type Dev = D;

    fn shape(&self) -> Shape {
        self.shape
    }
}

impl<T: Element, D: Device> fmt::Display for OpNode<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name())?;
        for (i, operand) in self.op.operands().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", operand)?;
        }
        write!(f, ") -> {}", self.shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::error::Error;
    use crate::matrix::Matrix;

    #[test]
    fn test_node_caches_shape() -> Result<()> {
        let a: Matrix<f32> = Matrix::new(2, 3)?;
        let b: Matrix<f32> = Matrix::new(3, 4)?;
        let node = OpNode::binary(BinaryOp::Dot, a.into(), b.into())?;
        assert_eq!(node.shape(), Shape::matrix(2, 4));
        assert_eq!(node.category(), Category::Matrix);
        assert_eq!(node.name(), "dot");
        assert_eq!(node.op().operands().len(), 2);
        Ok(())
    }

    #[test]
    fn test_node_rejects_bad_operands() -> Result<()> {
        let a: Matrix<f32> = Matrix::new(2, 3)?;
        let b: Matrix<f32> = Matrix::new(2, 4)?;
        let err = OpNode::binary(BinaryOp::Add, a.into(), b.into()).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
        Ok(())
    }

    #[test]
    fn test_node_holds_operands() -> Result<()> {
        let a: Matrix<f64> = Matrix::new(2, 2)?;
        let node = OpNode::unary(UnaryOp::Tanh, a.clone().into())?;
        assert_eq!(a.buffer().holder_count(), 2);
        drop(node);
        assert_eq!(a.buffer().holder_count(), 1);
        Ok(())
    }

    #[test]
    fn test_display() -> Result<()> {
        let a: Matrix<f32> = Matrix::new(2, 3)?;
        let node = OpNode::unary(UnaryOp::Transpose, a.into())?;
        assert_eq!(node.to_string(), "transpose(Matrix[2, 3]) -> [3, 2]");
        Ok(())
    }
}
