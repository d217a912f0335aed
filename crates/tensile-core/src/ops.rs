use crate::broadcast::{broadcast_dot, broadcast_elementwise};
use crate::device::Device;
use crate::dtype::Element;
use crate::error::Result;
use crate::expr::Expr;
use crate::op::{BinaryOp, OpNode, TernaryOp, UnaryOp};

// Operator API
//
// One free function per operation. Each takes its operands by value (any
// entity or expression converts into an Expr), validates categories and
// shapes, and returns the new node as an Expr. Nothing is computed here;
// see `Expr::eval` for that.

fn unary<T: Element, D: Device>(op: UnaryOp, input: Expr<T, D>) -> Result<Expr<T, D>> {
    Ok(OpNode::unary(op, input)?.into())
}

fn elementwise<T: Element, D: Device>(
    op: BinaryOp,
    lhs: Expr<T, D>,
    rhs: Expr<T, D>,
) -> Result<Expr<T, D>> {
    let (lhs, rhs) = broadcast_elementwise(op, lhs, rhs)?;
    Ok(OpNode::binary(op, lhs, rhs)?.into())
}

fn same_category<T: Element, D: Device>(
    op: BinaryOp,
    lhs: Expr<T, D>,
    rhs: Expr<T, D>,
) -> Result<Expr<T, D>> {
    Ok(OpNode::binary(op, lhs, rhs)?.into())
}

fn ternary<T: Element, D: Device>(
    op: TernaryOp,
    first: Expr<T, D>,
    second: Expr<T, D>,
    third: Expr<T, D>,
) -> Result<Expr<T, D>> {
    Ok(OpNode::ternary(op, first, second, third)?.into())
}

/// Entry-wise absolute value.
pub fn abs<T: Element, D: Device>(x: impl Into<Expr<T, D>>) -> Result<Expr<T, D>> {
    unary(UnaryOp::Abs, x.into())
}

/// Entry-wise sign: -1, 0 or 1.
pub fn sign<T: Element, D: Device>(x: impl Into<Expr<T, D>>) -> Result<Expr<T, D>> {
    unary(UnaryOp::Sign, x.into())
}

/// Entry-wise logistic function.
pub fn sigmoid<T: Element, D: Device>(x: impl Into<Expr<T, D>>) -> Result<Expr<T, D>> {
    unary(UnaryOp::Sigmoid, x.into())
}

pub fn tanh<T: Element, D: Device>(x: impl Into<Expr<T, D>>) -> Result<Expr<T, D>> {
    unary(UnaryOp::Tanh, x.into())
}

/// Softmax of every row.
pub fn vec_softmax<T: Element, D: Device>(x: impl Into<Expr<T, D>>) -> Result<Expr<T, D>> {
    unary(UnaryOp::VecSoftmax, x.into())
}

/// Swap rows and columns of a matrix, or of every matrix of a batch.
pub fn transpose<T: Element, D: Device>(x: impl Into<Expr<T, D>>) -> Result<Expr<T, D>> {
    unary(UnaryOp::Transpose, x.into())
}

/// Sum the matrices of a batch into one matrix.
pub fn collapse<T: Element, D: Device>(x: impl Into<Expr<T, D>>) -> Result<Expr<T, D>> {
    unary(UnaryOp::Collapse, x.into())
}

pub fn add<T: Element, D: Device>(
    lhs: impl Into<Expr<T, D>>,
    rhs: impl Into<Expr<T, D>>,
) -> Result<Expr<T, D>> {
    elementwise(BinaryOp::Add, lhs.into(), rhs.into())
}

/// `lhs - rhs`, broadcasting whichever operand has the lower category.
pub fn subtract<T: Element, D: Device>(
    lhs: impl Into<Expr<T, D>>,
    rhs: impl Into<Expr<T, D>>,
) -> Result<Expr<T, D>> {
    elementwise(BinaryOp::Subtract, lhs.into(), rhs.into())
}

/// Entry-wise (Hadamard) product.
pub fn element_mul<T: Element, D: Device>(
    lhs: impl Into<Expr<T, D>>,
    rhs: impl Into<Expr<T, D>>,
) -> Result<Expr<T, D>> {
    elementwise(BinaryOp::ElementMul, lhs.into(), rhs.into())
}

pub fn divide<T: Element, D: Device>(
    lhs: impl Into<Expr<T, D>>,
    rhs: impl Into<Expr<T, D>>,
) -> Result<Expr<T, D>> {
    elementwise(BinaryOp::Divide, lhs.into(), rhs.into())
}

/// Matrix product. A bare matrix against a batch is applied to every
/// element of the batch.
pub fn dot<T: Element, D: Device>(
    lhs: impl Into<Expr<T, D>>,
    rhs: impl Into<Expr<T, D>>,
) -> Result<Expr<T, D>> {
    let (lhs, rhs) = broadcast_dot(lhs.into(), rhs.into())?;
    same_category(BinaryOp::Dot, lhs, rhs)
}

/// `-sum(target * ln(prediction))`, one value per matrix.
pub fn negative_log_likelihood<T: Element, D: Device>(
    target: impl Into<Expr<T, D>>,
    prediction: impl Into<Expr<T, D>>,
) -> Result<Expr<T, D>> {
    same_category(
        BinaryOp::NegativeLogLikelihood,
        target.into(),
        prediction.into(),
    )
}

/// Gradient through a sigmoid, given its output.
pub fn sigmoid_derivation<T: Element, D: Device>(
    grad: impl Into<Expr<T, D>>,
    output: impl Into<Expr<T, D>>,
) -> Result<Expr<T, D>> {
    same_category(BinaryOp::SigmoidDerivation, grad.into(), output.into())
}

/// Gradient through a tanh, given its output.
pub fn tanh_derivation<T: Element, D: Device>(
    grad: impl Into<Expr<T, D>>,
    output: impl Into<Expr<T, D>>,
) -> Result<Expr<T, D>> {
    same_category(BinaryOp::TanhDerivation, grad.into(), output.into())
}

/// Gradient through a row-wise softmax, given its output.
pub fn vec_softmax_derivation<T: Element, D: Device>(
    grad: impl Into<Expr<T, D>>,
    output: impl Into<Expr<T, D>>,
) -> Result<Expr<T, D>> {
    same_category(BinaryOp::VecSoftmaxDerivation, grad.into(), output.into())
}

/// `a * lambda + b * (1 - lambda)`, entry by entry.
pub fn interpolation<T: Element, D: Device>(
    a: impl Into<Expr<T, D>>,
    b: impl Into<Expr<T, D>>,
    lambda: impl Into<Expr<T, D>>,
) -> Result<Expr<T, D>> {
    ternary(TernaryOp::Interpolation, a.into(), b.into(), lambda.into())
}

/// Gradient of the negative log likelihood with respect to the prediction.
pub fn negative_log_likelihood_derivation<T: Element, D: Device>(
    grad: impl Into<Expr<T, D>>,
    target: impl Into<Expr<T, D>>,
    prediction: impl Into<Expr<T, D>>,
) -> Result<Expr<T, D>> {
    ternary(
        TernaryOp::NegativeLogLikelihoodDerivation,
        grad.into(),
        target.into(),
        prediction.into(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchMatrix;
    use crate::category::{Category, Data};
    use crate::error::Error;
    use crate::matrix::Matrix;
    use crate::scalar::Scalar;
    use crate::shape::Shape;

    #[test]
    fn test_subtract_scalar_matrix() -> Result<()> {
        let s: Scalar<f32> = Scalar::new(5.0);
        let m: Matrix<f32> = Matrix::new(2, 3)?;
        let e = subtract(s, m)?;
        assert_eq!(e.shape(), Shape::matrix(2, 3));
        Ok(())
    }

    #[test]
    fn test_subtract_matrix_batch() -> Result<()> {
        let m: Matrix<f32> = Matrix::new(2, 3)?;
        let b: BatchMatrix<f32> = BatchMatrix::new(4, 2, 3)?;
        let e = subtract(m, b)?;
        assert_eq!(e.shape(), Shape::batch_matrix(4, 2, 3));
        Ok(())
    }

    #[test]
    fn test_scalar_scalar_is_rejected() {
        let a: Scalar<f64> = Scalar::new(1.0);
        let b: Scalar<f64> = Scalar::new(2.0);
        assert!(matches!(
            add(a, b),
            Err(Error::UnsupportedCategory { .. })
        ));
    }

    #[test]
    fn test_dot_with_batch() -> Result<()> {
        let b: BatchMatrix<f32> = BatchMatrix::new(3, 2, 4)?;
        let m: Matrix<f32> = Matrix::new(4, 5)?;
        let e = dot(b, m)?;
        assert_eq!(e.shape(), Shape::batch_matrix(3, 2, 5));
        Ok(())
    }

    #[test]
    fn test_graph_composes() -> Result<()> {
        let x: Matrix<f64> = Matrix::new(1, 4)?;
        let w: Matrix<f64> = Matrix::new(4, 3)?;
        let b: Matrix<f64> = Matrix::new(1, 3)?;
        let target: Matrix<f64> = Matrix::new(1, 3)?;
        let logits = add(dot(x, w)?, b)?;
        let loss = negative_log_likelihood(target, vec_softmax(logits)?)?;
        assert_eq!(loss.category(), Category::Scalar);
        Ok(())
    }

    #[test]
    fn test_collapse_requires_batch() -> Result<()> {
        let m: Matrix<f32> = Matrix::new(2, 2)?;
        assert!(collapse(m).is_err());
        Ok(())
    }
}
