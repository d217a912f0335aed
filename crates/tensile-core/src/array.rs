use std::rc::Rc;

use crate::category::Data;
use crate::device::{Cpu, Device};
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::matrix::Matrix;
use crate::scalar::Scalar;
use crate::shape::Shape;

// Arrays: growable batches of owned elements
//
// Unlike BatchMatrix, whose elements are slices of one flat buffer, an array
// keeps a sequence of independent elements behind a shared `Rc<Vec<_>>`.
// Cloning an array shares the sequence; every mutating operation therefore
// requires the sequence to be unshared and fails with `SharedWrite`
// otherwise.
//
// A matrix array has a fixed element shape, set explicitly or by the first
// element, and rejects elements of any other shape.

fn shared_write<V>(seq: &Rc<Vec<V>>) -> Error {
    Error::SharedWrite {
        holders: Rc::strong_count(seq),
    }
}

/// Growable batch of scalars.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarArray<T: Element, D: Device = Cpu> {
    items: Rc<Vec<Scalar<T, D>>>,
}

impl<T: Element, D: Device> ScalarArray<T, D> {
    pub fn new() -> Self {
        ScalarArray {
            items: Rc::new(Vec::new()),
        }
    }

    pub fn from_scalars<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Scalar<T, D>>,
    {
        ScalarArray {
            items: Rc::new(items.into_iter().map(Into::into).collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn available_for_write(&self) -> bool {
        Rc::strong_count(&self.items) == 1
    }

    fn items_mut(&mut self) -> Result<&mut Vec<Scalar<T, D>>> {
        let err = shared_write(&self.items);
        Rc::get_mut(&mut self.items).ok_or(err)
    }

    pub fn append(&mut self, value: impl Into<Scalar<T, D>>) -> Result<()> {
        self.items_mut()?.push(value.into());
        Ok(())
    }

    /// Build the element in place from `make` and append it.
    pub fn emplace_with<F>(&mut self, make: F) -> Result<()>
    where
        F: FnOnce() -> Result<Scalar<T, D>>,
    {
        let items = self.items_mut()?;
        items.push(make()?);
        Ok(())
    }

    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        self.items_mut()?.reserve(additional);
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.items_mut()?.clear();
        Ok(())
    }

    pub fn get(&self, index: usize) -> Result<Scalar<T, D>> {
        self.items.get(index).copied().ok_or_else(|| Error::IndexOutOfBounds {
            index: vec![index],
            shape: self.shape(),
        })
    }

    pub fn set(&mut self, index: usize, value: impl Into<Scalar<T, D>>) -> Result<()> {
        let shape = self.shape();
        let slot = self
            .items_mut()?
            .get_mut(index)
            .ok_or(Error::IndexOutOfBounds {
                index: vec![index],
                shape,
            })?;
        *slot = value.into();
        Ok(())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Scalar<T, D>> {
        self.items.iter()
    }
}

impl<T: Element, D: Device> Default for ScalarArray<T, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element, D: Device> Data for ScalarArray<T, D> {
    type Elem = T;
    type Dev = D;

    fn shape(&self) -> Shape {
        Shape::batch_scalar(self.items.len())
    }
}

/// Growable batch of equally shaped matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixArray<T: Element, D: Device = Cpu> {
    items: Rc<Vec<Matrix<T, D>>>,
    dims: Option<(usize, usize)>,
}

impl<T: Element, D: Device> MatrixArray<T, D> {
    /// An empty array whose element shape is fixed by the first append.
    pub fn new() -> Self {
        MatrixArray {
            items: Rc::new(Vec::new()),
            dims: None,
        }
    }

    /// An empty array accepting only `rows x cols` elements.
    pub fn with_shape(rows: usize, cols: usize) -> Self {
        MatrixArray {
            items: Rc::new(Vec::new()),
            dims: Some((rows, cols)),
        }
    }

    /// Collect matrices into an array; all must share the first one's shape.
    pub fn from_matrices<I>(items: I) -> Result<Self>
    where
        I: IntoIterator<Item = Matrix<T, D>>,
    {
        let mut out = Self::new();
        for m in items {
            out.append(m)?;
        }
        Ok(out)
    }

    /// Element row count, 0 while the shape is not fixed yet.
    pub fn rows(&self) -> usize {
        self.dims.map_or(0, |(r, _)| r)
    }

    pub fn cols(&self) -> usize {
        self.dims.map_or(0, |(_, c)| c)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn available_for_write(&self) -> bool {
        Rc::strong_count(&self.items) == 1
    }

    fn check_element(&self, m: &Matrix<T, D>) -> Result<()> {
        match self.dims {
            Some((rows, cols)) if (rows, cols) != (m.rows(), m.cols()) => {
                Err(Error::ShapeMismatch {
                    expected: Shape::matrix(rows, cols),
                    got: m.shape(),
                })
            }
            _ => Ok(()),
        }
    }

    fn items_mut(&mut self) -> Result<&mut Vec<Matrix<T, D>>> {
        let err = shared_write(&self.items);
        Rc::get_mut(&mut self.items).ok_or(err)
    }

    /// Append a (shallow) matrix handle.
    pub fn append(&mut self, m: Matrix<T, D>) -> Result<()> {
        self.check_element(&m)?;
        let dims = (m.rows(), m.cols());
        self.items_mut()?.push(m);
        self.dims = Some(dims);
        Ok(())
    }

    /// Build the element in place from `make` and append it.
    pub fn emplace_with<F>(&mut self, make: F) -> Result<()>
    where
        F: FnOnce() -> Result<Matrix<T, D>>,
    {
        if !self.available_for_write() {
            return Err(shared_write(&self.items));
        }
        self.append(make()?)
    }

    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        self.items_mut()?.reserve(additional);
        Ok(())
    }

    /// Remove every element. The element shape stays fixed.
    pub fn clear(&mut self) -> Result<()> {
        self.items_mut()?.clear();
        Ok(())
    }

    pub fn get(&self, index: usize) -> Result<&Matrix<T, D>> {
        self.items.get(index).ok_or_else(|| Error::IndexOutOfBounds {
            index: vec![index],
            shape: self.shape(),
        })
    }

    /// Replace element `index`.
    pub fn set(&mut self, index: usize, m: Matrix<T, D>) -> Result<()> {
        self.check_element(&m)?;
        let shape = self.shape();
        let slot = self
            .items_mut()?
            .get_mut(index)
            .ok_or(Error::IndexOutOfBounds {
                index: vec![index],
                shape,
            })?;
        *slot = m;
        Ok(())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Matrix<T, D>> {
        self.items.iter()
    }
}

impl<T: Element, D: Device> Default for MatrixArray<T, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element, D: Device> Data for MatrixArray<T, D> {
    type Elem = T;
    type Dev = D;

    fn shape(&self) -> Shape {
        Shape::batch_matrix(self.items.len(), self.rows(), self.cols())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_array_fixes_shape() -> Result<()> {
        let mut arr: MatrixArray<f32> = MatrixArray::with_shape(4, 5);
        arr.append(Matrix::new(4, 5)?)?;
        let err = arr.append(Matrix::new(3, 5)?).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
        assert_eq!(arr.len(), 1);
        assert_eq!(arr.shape(), Shape::batch_matrix(1, 4, 5));
        Ok(())
    }

    #[test]
    fn test_first_append_sets_shape() -> Result<()> {
        let mut arr: MatrixArray<f64> = MatrixArray::new();
        arr.emplace_with(|| Matrix::new(2, 2))?;
        assert_eq!((arr.rows(), arr.cols()), (2, 2));
        assert!(arr.emplace_with(|| Matrix::new(2, 3)).is_err());
        arr.clear()?;
        assert!(arr.is_empty());
        assert_eq!(arr.rows(), 2);
        Ok(())
    }

    #[test]
    fn test_shared_array_is_read_only() -> Result<()> {
        let mut arr: MatrixArray<f32> = MatrixArray::from_matrices(vec![Matrix::new(1, 1)?])?;
        let other = arr.clone();
        assert!(!arr.available_for_write());
        assert!(matches!(
            arr.append(Matrix::new(1, 1)?),
            Err(Error::SharedWrite { holders: 2 })
        ));
        assert!(arr.reserve(4).is_err());
        drop(other);
        arr.reserve(4)?;
        arr.append(Matrix::new(1, 1)?)?;
        assert_eq!(arr.iter().count(), 2);
        Ok(())
    }

    #[test]
    fn test_scalar_array() -> Result<()> {
        let mut arr: ScalarArray<i64> = ScalarArray::from_scalars([1i64, 2]);
        arr.append(3i64)?;
        arr.set(0, 10i64)?;
        let values: Vec<i64> = arr.iter().map(|s| s.value()).collect();
        assert_eq!(values, vec![10, 2, 3]);
        assert_eq!(arr.shape(), Shape::batch_scalar(3));
        assert!(arr.get(3).is_err());
        Ok(())
    }
}
