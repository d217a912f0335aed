use num_traits::Float;

use crate::access::lower_access;
use crate::batch::{BatchMatrix, BatchScalar};
use crate::category::Data;
use crate::device::{Cpu, Device};
use crate::dtype::Element;
use crate::duplicate::Duplicate;
use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::matrix::Matrix;
use crate::op::{BinaryOp, Op, OpNode, TernaryOp, UnaryOp};
use crate::scalar::Scalar;
use crate::shape::Shape;

// Evaluation: a recursive interpreter over the expression graph
//
// `Expr::eval` walks the graph depth-first. Operands are evaluated first,
// then the node's CPU kernel runs and its result is written, through the
// privileged access layer, into a freshly allocated Value. Each evaluation
// is eager and independent: nothing is memoised, so a node reached twice
// is computed twice.
//
// Leaves:
//   Matrix, BatchScalar, BatchMatrix   shallow handle of the entity itself
//   Scalar                             the value
//   structural matrices, arrays        materialised into a new buffer
//   Duplicate                          its element, materialised `count` times
//
// Kernels work on row-major element vectors. They are generic over
// `num_traits::Float`, so evaluation is available for f32, f64, f16, bf16.

/// A concrete, buffer-backed result.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<T: Element, D: Device = Cpu> {
    Scalar(Scalar<T, D>),
    Matrix(Matrix<T, D>),
    BatchScalar(BatchScalar<T, D>),
    BatchMatrix(BatchMatrix<T, D>),
}

impl<T: Element, D: Device> Value<T, D> {
    /// Allocate a zero value of the given shape.
    pub fn allocate(shape: Shape) -> Result<Self> {
        Ok(match shape {
            Shape::Scalar => Value::Scalar(Scalar::default()),
            Shape::Matrix { rows, cols } => Value::Matrix(Matrix::new(rows, cols)?),
            Shape::BatchScalar { batch } => Value::BatchScalar(BatchScalar::new(batch)?),
            Shape::BatchMatrix { batch, rows, cols } => {
                Value::BatchMatrix(BatchMatrix::new(batch, rows, cols)?)
            }
        })
    }

    /// Allocate a value of `shape` holding `data` in row-major order.
    fn store(shape: Shape, data: &[T]) -> Result<Self> {
        if data.len() != shape.elem_count() {
            return Err(Error::ElementCountMismatch {
                shape,
                expected: shape.elem_count(),
                got: data.len(),
            });
        }
        let mut out = Self::allocate(shape)?;
        out.write_all(data);
        Ok(out)
    }

    fn write_all(&mut self, data: &[T]) {
        let (low, batch, rows, cols) = match self {
            Value::Scalar(s) => {
                if let Some(&v) = data.first() {
                    s.set_value(v);
                }
                return;
            }
            Value::Matrix(m) => (lower_access(&*m), 1, m.rows(), m.cols()),
            Value::BatchScalar(b) => (lower_access(&*b), b.len(), 1, 1),
            Value::BatchMatrix(b) => (lower_access(&*b), b.batch(), b.rows(), b.cols()),
        };
        let mut src = data.iter().copied();
        for b in 0..batch {
            for r in 0..rows {
                for c in 0..cols {
                    if let Some(v) = src.next() {
                        let at = b * low.matrix_stride() + r * low.row_stride() + c;
                        // SAFETY: values are written right after allocation.
                        unsafe { low.write(at, v) };
                    }
                }
            }
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            Value::Scalar(x) => x.shape(),
            Value::Matrix(x) => x.shape(),
            Value::BatchScalar(x) => x.shape(),
            Value::BatchMatrix(x) => x.shape(),
        }
    }

    /// Elements in row-major order, batch element after batch element.
    pub fn to_vec(&self) -> Vec<T> {
        match self {
            Value::Scalar(s) => vec![s.value()],
            Value::Matrix(m) => m.to_vec(),
            Value::BatchScalar(b) => b.to_vec(),
            Value::BatchMatrix(b) => b.to_vec(),
        }
    }

    fn wrong_category(&self, wanted: &'static str) -> Error {
        Error::unsupported(wanted, &[self.shape().category()])
    }

    pub fn into_scalar(self) -> Result<Scalar<T, D>> {
        match self {
            Value::Scalar(s) => Ok(s),
            other => Err(other.wrong_category("into_scalar")),
        }
    }

    pub fn into_matrix(self) -> Result<Matrix<T, D>> {
        match self {
            Value::Matrix(m) => Ok(m),
            other => Err(other.wrong_category("into_matrix")),
        }
    }

    pub fn into_batch_scalar(self) -> Result<BatchScalar<T, D>> {
        match self {
            Value::BatchScalar(b) => Ok(b),
            other => Err(other.wrong_category("into_batch_scalar")),
        }
    }

    pub fn into_batch_matrix(self) -> Result<BatchMatrix<T, D>> {
        match self {
            Value::BatchMatrix(b) => Ok(b),
            other => Err(other.wrong_category("into_batch_matrix")),
        }
    }
}

impl<T: Element, D: Device> From<Value<T, D>> for Expr<T, D> {
    fn from(v: Value<T, D>) -> Self {
        match v {
            Value::Scalar(x) => Expr::Scalar(x),
            Value::Matrix(x) => Expr::Matrix(x),
            Value::BatchScalar(x) => Expr::BatchScalar(x),
            Value::BatchMatrix(x) => Expr::BatchMatrix(x),
        }
    }
}

impl<T: Element + Float, D: Device> Expr<T, D> {
    /// Compute the value of this expression.
    pub fn eval(&self) -> Result<Value<T, D>> {
        match self {
            Expr::Scalar(s) => Ok(Value::Scalar(*s)),
            Expr::Matrix(m) => Ok(Value::Matrix(m.clone())),
            Expr::BatchScalar(b) => Ok(Value::BatchScalar(b.clone())),
            Expr::BatchMatrix(b) => Ok(Value::BatchMatrix(b.clone())),
            Expr::Trivial(t) => Ok(Value::Matrix(t.to_matrix()?)),
            Expr::Zero(z) => Ok(Value::Matrix(z.to_matrix()?)),
            Expr::OneHot(h) => Ok(Value::Matrix(h.to_matrix()?)),
            Expr::ScalarArray(a) => {
                let data: Vec<T> = a.iter().map(|s| s.value()).collect();
                Ok(Value::BatchScalar(BatchScalar::from_vec(data)?))
            }
            Expr::MatrixArray(a) => {
                let items: Vec<Matrix<T, D>> = a.iter().cloned().collect();
                Ok(Value::BatchMatrix(BatchMatrix::from_matrices(
                    a.rows(),
                    a.cols(),
                    &items,
                )?))
            }
            Expr::Duplicate(dup) => eval_duplicate(dup),
            Expr::Op(node) => node.eval(),
        }
    }
}

fn eval_duplicate<T: Element + Float, D: Device>(dup: &Duplicate<T, D>) -> Result<Value<T, D>> {
    dup.shape().checked_elem_count()?;
    let element = dup.element().eval()?.to_vec();
    let data: Vec<T> = std::iter::repeat(element)
        .take(dup.count())
        .flatten()
        .collect();
    Value::store(dup.shape(), &data)
}

impl<T: Element + Float, D: Device> OpNode<T, D> {
    /// Evaluate the operands, then run this node's kernel.
    pub fn eval(&self) -> Result<Value<T, D>> {
        log::debug!("evaluating {} -> {}", self.name(), self.shape());
        let out_shape = self.shape();
        let data = match self.op() {
            Op::Unary { op, input } => {
                let v = input.eval()?;
                unary_kernel(*op, v.shape(), &v.to_vec())
            }
            Op::Binary { op, lhs, rhs } => {
                let (l, r) = (lhs.eval()?, rhs.eval()?);
                binary_kernel(*op, l.shape(), r.shape(), &l.to_vec(), &r.to_vec())
            }
            Op::Ternary {
                op,
                first,
                second,
                third,
            } => {
                let a = first.eval()?.to_vec();
                let b = second.eval()?.to_vec();
                let c = third.eval()?.to_vec();
                ternary_kernel(*op, &a, &b, &c)
            }
        };
        Value::store(out_shape, &data)
    }
}

// Kernels
//
// `shape` arguments are operand shapes; every slice is row-major with
// batch elements back to back.

fn sign<T: Float>(x: T) -> T {
    if x > T::zero() {
        T::one()
    } else if x < T::zero() {
        -T::one()
    } else {
        T::zero()
    }
}

fn sigmoid<T: Float>(x: T) -> T {
    T::one() / (T::one() + (-x).exp())
}

fn softmax_rows<T: Float>(cols: usize, x: &[T]) -> Vec<T> {
    let mut out = Vec::with_capacity(x.len());
    if cols == 0 {
        return out;
    }
    for row in x.chunks(cols) {
        let max = row.iter().copied().fold(T::neg_infinity(), T::max);
        let exps: Vec<T> = row.iter().map(|&v| (v - max).exp()).collect();
        let sum = exps.iter().copied().fold(T::zero(), |a, b| a + b);
        out.extend(exps.into_iter().map(|e| e / sum));
    }
    out
}

fn transpose<T: Float>(shape: Shape, x: &[T]) -> Vec<T> {
    let (rows, cols) = (shape.rows(), shape.cols());
    let per = rows * cols;
    let mut out = vec![T::zero(); x.len()];
    for b in 0..shape.batch().unwrap_or(1) {
        for r in 0..rows {
            for c in 0..cols {
                out[b * per + c * rows + r] = x[b * per + r * cols + c];
            }
        }
    }
    out
}

fn collapse<T: Float>(shape: Shape, x: &[T]) -> Vec<T> {
    let per = shape.rows() * shape.cols();
    let mut out = vec![T::zero(); per];
    if per == 0 {
        return out;
    }
    for element in x.chunks(per) {
        for (acc, &v) in out.iter_mut().zip(element) {
            *acc = *acc + v;
        }
    }
    out
}

fn unary_kernel<T: Float>(op: UnaryOp, shape: Shape, x: &[T]) -> Vec<T> {
    match op {
        UnaryOp::Abs => x.iter().map(|v| v.abs()).collect(),
        UnaryOp::Sign => x.iter().map(|&v| sign(v)).collect(),
        UnaryOp::Sigmoid => x.iter().map(|&v| sigmoid(v)).collect(),
        UnaryOp::Tanh => x.iter().map(|v| v.tanh()).collect(),
        UnaryOp::VecSoftmax => softmax_rows(shape.cols(), x),
        UnaryOp::Transpose => transpose(shape, x),
        UnaryOp::Collapse => collapse(shape, x),
    }
}

fn dot<T: Float>(lhs: Shape, rhs: Shape, a: &[T], b: &[T]) -> Vec<T> {
    let (m, k, n) = (lhs.rows(), lhs.cols(), rhs.cols());
    let batch = lhs.batch().unwrap_or(1);
    let mut out = vec![T::zero(); batch * m * n];
    for e in 0..batch {
        let (a, b) = (&a[e * m * k..], &b[e * k * n..]);
        let dst = &mut out[e * m * n..(e + 1) * m * n];
        for i in 0..m {
            for p in 0..k {
                let aip = a[i * k + p];
                for j in 0..n {
                    dst[i * n + j] = dst[i * n + j] + aip * b[p * n + j];
                }
            }
        }
    }
    out
}

fn negative_log_likelihood<T: Float>(shape: Shape, target: &[T], pred: &[T]) -> Vec<T> {
    let per = shape.rows() * shape.cols();
    let batch = shape.batch().unwrap_or(1);
    (0..batch)
        .map(|e| {
            let range = e * per..(e + 1) * per;
            let total = target[range.clone()]
                .iter()
                .zip(&pred[range])
                .fold(T::zero(), |acc, (&t, &p)| acc + t * p.ln());
            -total
        })
        .collect()
}

fn softmax_derivation<T: Float>(cols: usize, grad: &[T], out: &[T]) -> Vec<T> {
    let mut res = Vec::with_capacity(grad.len());
    if cols == 0 {
        return res;
    }
    for (g, o) in grad.chunks(cols).zip(out.chunks(cols)) {
        let inner = g
            .iter()
            .zip(o)
            .fold(T::zero(), |acc, (&gi, &oi)| acc + gi * oi);
        res.extend(g.iter().zip(o).map(|(&gj, &oj)| oj * (gj - inner)));
    }
    res
}

fn zip_with<T: Float>(a: &[T], b: &[T], f: impl Fn(T, T) -> T) -> Vec<T> {
    a.iter().zip(b).map(|(&x, &y)| f(x, y)).collect()
}

fn binary_kernel<T: Float>(op: BinaryOp, ls: Shape, rs: Shape, a: &[T], b: &[T]) -> Vec<T> {
    match op {
        BinaryOp::Add => zip_with(a, b, |x, y| x + y),
        BinaryOp::Subtract => zip_with(a, b, |x, y| x - y),
        BinaryOp::ElementMul => zip_with(a, b, |x, y| x * y),
        BinaryOp::Divide => zip_with(a, b, |x, y| x / y),
        BinaryOp::Dot => dot(ls, rs, a, b),
        BinaryOp::NegativeLogLikelihood => negative_log_likelihood(ls, a, b),
        BinaryOp::SigmoidDerivation => zip_with(a, b, |g, o| g * o * (T::one() - o)),
        BinaryOp::TanhDerivation => zip_with(a, b, |g, o| g * (T::one() - o * o)),
        BinaryOp::VecSoftmaxDerivation => softmax_derivation(ls.cols(), a, b),
    }
}

fn ternary_kernel<T: Float>(op: TernaryOp, a: &[T], b: &[T], c: &[T]) -> Vec<T> {
    let triples = a.iter().zip(b).zip(c).map(|((&x, &y), &z)| (x, y, z));
    match op {
        TernaryOp::Interpolation => triples
            .map(|(x, y, lambda)| x * lambda + y * (T::one() - lambda))
            .collect(),
        TernaryOp::NegativeLogLikelihoodDerivation => {
            triples.map(|(g, t, p)| -(g * t / p)).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops;
    use crate::structural::OneHotVector;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    fn assert_vec_approx(a: &[f64], b: &[f64], tol: f64) {
        assert_eq!(a.len(), b.len(), "length mismatch");
        for (i, (x, y)) in a.iter().zip(b).enumerate() {
            assert!(approx_eq(*x, *y, tol), "index {}: {} vs {}", i, x, y);
        }
    }

    #[test]
    fn test_leaf_eval_is_shallow() -> Result<()> {
        let m: Matrix<f64> = Matrix::new(2, 2)?;
        let e: Expr<f64> = m.clone().into();
        let v = e.eval()?.into_matrix()?;
        assert_eq!(v.buffer(), m.buffer());
        Ok(())
    }

    #[test]
    fn test_result_is_exclusive() -> Result<()> {
        let m: Matrix<f64> = Matrix::from_vec(1, 2, vec![-1.0, 2.0])?;
        let v = ops::abs(m)?.eval()?.into_matrix()?;
        assert!(v.available_for_write());
        assert_eq!(v.to_vec(), vec![1.0, 2.0]);
        Ok(())
    }

    #[test]
    fn test_dot_values() -> Result<()> {
        init_logger();
        let a: Matrix<f64> = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])?;
        let b: Matrix<f64> = Matrix::from_vec(3, 2, vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0])?;
        let c = ops::dot(a, b)?.eval()?;
        assert_eq!(c.shape(), Shape::matrix(2, 2));
        assert_eq!(c.to_vec(), vec![58.0, 64.0, 139.0, 154.0]);
        Ok(())
    }

    #[test]
    fn test_transpose_of_sub_matrix() -> Result<()> {
        let m: Matrix<f32> = Matrix::from_vec(3, 3, (0..9).map(|i| i as f32).collect())?;
        let view = m.sub_matrix(0..2, 1..3)?;
        let t = ops::transpose(view)?.eval()?;
        assert_eq!(t.shape(), Shape::matrix(2, 2));
        assert_eq!(t.to_vec(), vec![1.0, 4.0, 2.0, 5.0]);
        Ok(())
    }

    #[test]
    fn test_softmax_and_nll() -> Result<()> {
        let logits: Matrix<f64> = Matrix::from_vec(1, 3, vec![1.0, 2.0, 3.0])?;
        let target: OneHotVector<f64> = OneHotVector::new(3, 2)?;
        let probs = ops::vec_softmax(logits)?;
        let p = probs.eval()?.to_vec();
        let denom = 1f64.exp() + 2f64.exp() + 3f64.exp();
        assert_vec_approx(
            &p,
            &[1f64.exp() / denom, 2f64.exp() / denom, 3f64.exp() / denom],
            1e-12,
        );
        let loss = ops::negative_log_likelihood(target, probs)?.eval()?.into_scalar()?;
        assert!(approx_eq(loss.value(), -(p[2].ln()), 1e-12));
        Ok(())
    }

    #[test]
    fn test_sign_and_sigmoid() -> Result<()> {
        let m: Matrix<f64> = Matrix::from_vec(1, 3, vec![-2.0, 0.0, 3.0])?;
        assert_eq!(ops::sign(m.clone())?.eval()?.to_vec(), vec![-1.0, 0.0, 1.0]);
        let s = ops::sigmoid(m)?.eval()?.to_vec();
        assert!(approx_eq(s[1], 0.5, 1e-12));
        Ok(())
    }

    #[test]
    fn test_derivations() -> Result<()> {
        let g: Matrix<f64> = Matrix::from_vec(1, 2, vec![1.0, 2.0])?;
        let o: Matrix<f64> = Matrix::from_vec(1, 2, vec![0.5, 0.25])?;
        let sd = ops::sigmoid_derivation(g.clone(), o.clone())?.eval()?.to_vec();
        assert_vec_approx(&sd, &[0.25, 0.375], 1e-12);
        let td = ops::tanh_derivation(g.clone(), o.clone())?.eval()?.to_vec();
        assert_vec_approx(&td, &[0.75, 1.875], 1e-12);
        // inner = 1*0.5 + 2*0.25 = 1
        let vd = ops::vec_softmax_derivation(g, o)?.eval()?.to_vec();
        assert_vec_approx(&vd, &[0.0, 0.25], 1e-12);
        Ok(())
    }

    #[test]
    fn test_ternary_ops() -> Result<()> {
        let a: Matrix<f64> = Matrix::from_vec(1, 2, vec![1.0, 2.0])?;
        let b: Matrix<f64> = Matrix::from_vec(1, 2, vec![3.0, 4.0])?;
        let l: Matrix<f64> = Matrix::from_vec(1, 2, vec![0.25, 1.0])?;
        let i = ops::interpolation(a.clone(), b.clone(), l)?.eval()?.to_vec();
        assert_vec_approx(&i, &[2.5, 2.0], 1e-12);
        let d = ops::negative_log_likelihood_derivation(a.clone(), b, a)?.eval()?.to_vec();
        assert_vec_approx(&d, &[-3.0, -4.0], 1e-12);
        Ok(())
    }

    #[test]
    fn test_into_wrong_category() -> Result<()> {
        let m: Matrix<f32> = Matrix::new(1, 1)?;
        let v: Value<f32> = Value::Matrix(m);
        assert!(matches!(
            v.into_scalar(),
            Err(Error::UnsupportedCategory { .. })
        ));
        Ok(())
    }
}
