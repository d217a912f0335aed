use std::marker::PhantomData;

use crate::category::Data;
use crate::device::{Cpu, Device};
use crate::dtype::Element;
use crate::shape::Shape;

/// A single value. Scalars hold their value directly, with no buffer and
/// therefore no sharing concerns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scalar<T: Element, D: Device = Cpu> {
    value: T,
    device: PhantomData<D>,
}

impl<T: Element, D: Device> Scalar<T, D> {
    pub fn new(value: T) -> Self {
        Scalar {
            value,
            device: PhantomData,
        }
    }

    pub fn value(&self) -> T {
        self.value
    }

    pub fn set_value(&mut self, value: T) {
        self.value = value;
    }
}

impl<T: Element, D: Device> Default for Scalar<T, D> {
    fn default() -> Self {
        Scalar::new(T::default())
    }
}

impl<T: Element, D: Device> From<T> for Scalar<T, D> {
    fn from(value: T) -> Self {
        Scalar::new(value)
    }
}

impl<T: Element, D: Device> Data for Scalar<T, D> {
    type Elem = T;
    type Dev = D;

    fn shape(&self) -> Shape {
        Shape::Scalar
    }
}
