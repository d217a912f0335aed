use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::device::{Cpu, Device};
use crate::dtype::Element;
use crate::error::{Error, Result};

// SharedBuffer: reference-counted, device-tagged block of elements
//
// The allocation lives behind an `Rc`, so copying a buffer handle copies the
// pointer and bumps the holder count; no element is ever copied implicitly.
// A handle also carries a start offset into the allocation. Sub-views
// (sub-matrices, batch elements) are new handles on the same allocation with
// a different start.
//
// WRITE DISCIPLINE:
//
//   Reading is always allowed. Writing through the public entity API is only
//   allowed while the holder count is 1, i.e. nobody else (not even a
//   sub-view) can observe the change. `ensure_exclusive` is the single
//   check every public write path goes through.
//
//   Elements sit in `Cell`s so the privileged access layer can write through
//   a shared reference. The price is that buffers are `!Send` and `!Sync`:
//   the sharing model is single-threaded by construction.

/// Handle on a reference-counted block of `T` on device `D`.
pub struct SharedBuffer<T: Element, D: Device = Cpu> {
    mem: Rc<Vec<Cell<T>>>,
    start: usize,
    device: PhantomData<D>,
}

// Manual Clone: Rc::clone is cheap (just increment the holder count).
impl<T: Element, D: Device> Clone for SharedBuffer<T, D> {
    fn clone(&self) -> Self {
        SharedBuffer {
            mem: Rc::clone(&self.mem),
            start: self.start,
            device: PhantomData,
        }
    }
}

impl<T: Element, D: Device> SharedBuffer<T, D> {
    /// Allocate `len` zeroed elements on `D`.
    pub fn allocate(len: usize) -> Result<Self> {
        let device = D::default();
        log::trace!("allocating {} {} elements on {}", len, T::DTYPE, device.name());
        let mem = device.allocate::<T>(len)?;
        Ok(SharedBuffer {
            mem: Rc::new(mem),
            start: 0,
            device: PhantomData,
        })
    }

    /// Allocate a buffer holding a copy of `data`.
    pub fn from_slice(data: &[T]) -> Result<Self> {
        let buf = Self::allocate(data.len())?;
        for (cell, &v) in buf.cells().iter().zip(data) {
            cell.set(v);
        }
        Ok(buf)
    }

    /// A new handle on the same allocation, starting `delta` elements later.
    pub(crate) fn offset(&self, delta: usize) -> Self {
        SharedBuffer {
            mem: Rc::clone(&self.mem),
            start: self.start + delta,
            device: PhantomData,
        }
    }

    /// Offset of this handle's first element inside the allocation.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Number of elements from the start of this handle to the end of the
    /// allocation.
    pub fn len(&self) -> usize {
        self.mem.len().saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Address of this handle's first element.
    pub fn raw_start(&self) -> *const T {
        self.cells().as_ptr() as *const T
    }

    /// The shared ownership token.
    pub(crate) fn holder(&self) -> &Rc<Vec<Cell<T>>> {
        &self.mem
    }

    /// Number of live handles on the allocation, sub-views included.
    pub fn holder_count(&self) -> usize {
        Rc::strong_count(&self.mem)
    }

    pub fn is_exclusive(&self) -> bool {
        self.holder_count() == 1
    }

    /// Fail with [`Error::SharedWrite`] unless this is the only handle.
    pub fn ensure_exclusive(&self) -> Result<()> {
        match self.holder_count() {
            1 => Ok(()),
            holders => Err(Error::SharedWrite { holders }),
        }
    }

    /// Elements from this handle's start to the end of the allocation.
    pub(crate) fn cells(&self) -> &[Cell<T>] {
        self.mem.get(self.start..).unwrap_or(&[])
    }

    pub fn device(&self) -> D {
        D::default()
    }
}

/// Identity equality: same allocation and same start.
impl<T: Element, D: Device> PartialEq for SharedBuffer<T, D> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(self.holder(), other.holder()) && self.start == other.start
    }
}

impl<T: Element, D: Device> Eq for SharedBuffer<T, D> {}

impl<T: Element, D: Device> fmt::Debug for SharedBuffer<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SharedBuffer(len={}, start={}, holders={}, dtype={}, device={:?})",
            self.len(),
            self.start,
            self.holder_count(),
            T::DTYPE,
            self.device(),
        )
    }
}
