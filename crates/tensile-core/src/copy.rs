use crate::access::lower_access;
use crate::category::Data;
use crate::device::Device;
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::matrix::Matrix;

/// Copy the elements of `src` into `dest`.
///
/// Both matrices must have the same extents and `dest` must not be shared.
/// Strides may differ (either side can be a sub-matrix); when both sides
/// are contiguous the copy is a single pass over the elements.
pub fn data_copy<T: Element, D: Device>(src: &Matrix<T, D>, dest: &mut Matrix<T, D>) -> Result<()> {
    if src.shape() != dest.shape() {
        return Err(Error::ShapeMismatch {
            expected: dest.shape(),
            got: src.shape(),
        });
    }
    dest.buffer().ensure_exclusive()?;

    // SAFETY: `dest` is the only handle on its buffer.
    let (from, to) = (lower_access(src), lower_access(&*dest));
    let (rows, cols) = (src.rows(), src.cols());
    if src.is_contiguous() && dest.is_contiguous() {
        for i in 0..rows * cols {
            unsafe { to.write(i, from.read(i)) };
        }
        return Ok(());
    }
    for r in 0..rows {
        for c in 0..cols {
            let v = from.read(r * from.row_stride() + c);
            unsafe { to.write(r * to.row_stride() + c, v) };
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_into_sub_matrix_layout() -> Result<()> {
        let big: Matrix<f64> = Matrix::from_vec(3, 3, (0..9).map(|i| i as f64).collect())?;
        let src = big.sub_matrix(1..3, 1..3)?;
        let mut dest: Matrix<f64> = Matrix::new(2, 2)?;
        data_copy(&src, &mut dest)?;
        assert_eq!(dest.to_vec(), vec![4.0, 5.0, 7.0, 8.0]);
        Ok(())
    }

    #[test]
    fn test_copy_contiguous() -> Result<()> {
        let src: Matrix<f32> = Matrix::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0])?;
        let mut dest: Matrix<f32> = Matrix::new(2, 2)?;
        data_copy(&src, &mut dest)?;
        assert_eq!(src, dest);
        assert_ne!(src.buffer(), dest.buffer());
        Ok(())
    }

    #[test]
    fn test_copy_checks_shape_and_sharing() -> Result<()> {
        let src: Matrix<f32> = Matrix::new(2, 2)?;
        let mut wrong: Matrix<f32> = Matrix::new(2, 3)?;
        assert!(matches!(
            data_copy(&src, &mut wrong),
            Err(Error::ShapeMismatch { .. })
        ));
        let mut dest: Matrix<f32> = Matrix::new(2, 2)?;
        let _alias = dest.clone();
        assert!(matches!(
            data_copy(&src, &mut dest),
            Err(Error::SharedWrite { .. })
        ));
        Ok(())
    }
}
