use std::fmt;
use std::rc::Rc;

use crate::array::{MatrixArray, ScalarArray};
use crate::batch::{BatchMatrix, BatchScalar};
use crate::category::Data;
use crate::device::{Cpu, Device};
use crate::dtype::Element;
use crate::duplicate::Duplicate;
use crate::matrix::Matrix;
use crate::op::OpNode;
use crate::scalar::Scalar;
use crate::shape::Shape;
use crate::structural::{OneHotVector, TrivialMatrix, ZeroMatrix};

/// Anything that can appear as an operand: a data entity or an operation
/// node.
///
/// All variants of one `Expr<T, D>` share element type and device, which is
/// how mismatched operands are rejected at compile time. Cloning is cheap:
/// buffer-backed entities clone their handles and nodes are behind an `Rc`.
#[derive(Debug, Clone)]
pub enum Expr<T: Element, D: Device = Cpu> {
    Scalar(Scalar<T, D>),
    Matrix(Matrix<T, D>),
    Trivial(TrivialMatrix<T, D>),
    Zero(ZeroMatrix<T, D>),
    OneHot(OneHotVector<T, D>),
    BatchScalar(BatchScalar<T, D>),
    BatchMatrix(BatchMatrix<T, D>),
    ScalarArray(ScalarArray<T, D>),
    MatrixArray(MatrixArray<T, D>),
    Duplicate(Duplicate<T, D>),
    Op(Rc<OpNode<T, D>>),
}

impl<T: Element, D: Device> Expr<T, D> {
    /// The operation node behind this expression, if it is one.
    pub fn as_op(&self) -> Option<&OpNode<T, D>> {
        match self {
            Expr::Op(node) => Some(node),
            _ => None,
        }
    }

    pub fn is_op(&self) -> bool {
        matches!(self, Expr::Op(_))
    }

    fn kind(&self) -> &'static str {
        match self {
            Expr::Scalar(_) => "Scalar",
            Expr::Matrix(_) => "Matrix",
            Expr::Trivial(_) => "TrivialMatrix",
            Expr::Zero(_) => "ZeroMatrix",
            Expr::OneHot(_) => "OneHotVector",
            Expr::BatchScalar(_) => "BatchScalar",
            Expr::BatchMatrix(_) => "BatchMatrix",
            Expr::ScalarArray(_) => "ScalarArray",
            Expr::MatrixArray(_) => "MatrixArray",
            Expr::Duplicate(_) => "Duplicate",
            Expr::Op(_) => "Op",
        }
    }
}

impl<T: Element, D: Device> Data for Expr<T, D> {
    type Elem = T;
    type Dev = D;

    fn shape(&self) -> Shape {
        match self {
            Expr::Scalar(x) => x.shape(),
            Expr::Matrix(x) => x.shape(),
            Expr::Trivial(x) => x.shape(),
            Expr::Zero(x) => x.shape(),
            Expr::OneHot(x) => x.shape(),
            Expr::BatchScalar(x) => x.shape(),
            Expr::BatchMatrix(x) => x.shape(),
            Expr::ScalarArray(x) => x.shape(),
            Expr::MatrixArray(x) => x.shape(),
            Expr::Duplicate(x) => x.shape(),
            Expr::Op(x) => x.shape(),
        }
    }
}

impl<T: Element, D: Device> fmt::Display for Expr<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Op(node) => write!(f, "{}", node),
            Expr::Duplicate(dup) => write!(f, "Duplicate({} x {})", dup.element(), dup.count()),
            leaf => write!(f, "{}{}", leaf.kind(), leaf.shape()),
        }
    }
}

macro_rules! expr_from {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl<T: Element, D: Device> From<$ty<T, D>> for Expr<T, D> {
                fn from(x: $ty<T, D>) -> Self {
                    Expr::$variant(x)
                }
            }
        )*
    };
}

expr_from! {
    Scalar => Scalar,
    Matrix => Matrix,
    TrivialMatrix => Trivial,
    ZeroMatrix => Zero,
    OneHotVector => OneHot,
    BatchScalar => BatchScalar,
    BatchMatrix => BatchMatrix,
    ScalarArray => ScalarArray,
    MatrixArray => MatrixArray,
    Duplicate => Duplicate,
}

impl<T: Element, D: Device> From<OpNode<T, D>> for Expr<T, D> {
    fn from(node: OpNode<T, D>) -> Self {
        Expr::Op(Rc::new(node))
    }
}

impl<T: Element, D: Device> From<&Expr<T, D>> for Expr<T, D> {
    fn from(x: &Expr<T, D>) -> Self {
        x.clone()
    }
}
