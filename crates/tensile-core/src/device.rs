use std::cell::Cell;
use std::fmt;

use crate::dtype::Element;
use crate::error::{Error, Result};

// Device: where a buffer's memory lives
//
// Devices are zero-sized marker types carried as a type parameter by every
// entity, so an expression can never mix operands from two devices. The
// trait also owns the allocation primitive used by SharedBuffer.
//
// Only the CPU exists today. A new device implements `Device` (and the
// evaluator gains kernels for it); nothing else in the data model changes.

/// Identifies a compute device and allocates memory on it.
pub trait Device: Copy + Clone + Default + PartialEq + Eq + fmt::Debug + 'static {
    /// A human-readable name for this device (e.g. "cpu").
    fn name(&self) -> String;

    /// Allocate `len` default-initialised elements.
    ///
    /// Allocation failure is reported as [`Error::Alloc`] and never retried.
    fn allocate<T: Element>(&self, len: usize) -> Result<Vec<Cell<T>>>;
}

/// The host CPU.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Cpu;

impl Device for Cpu {
    fn name(&self) -> String {
        "cpu".to_string()
    }

    fn allocate<T: Element>(&self, len: usize) -> Result<Vec<Cell<T>>> {
        let mut mem: Vec<Cell<T>> = Vec::new();
        mem.try_reserve_exact(len).map_err(|_| Error::Alloc {
            elems: len,
            dtype: T::DTYPE,
        })?;
        mem.resize_with(len, || Cell::new(T::default()));
        Ok(mem)
    }
}
