//! # tensile-core
//!
//! Data model and expression graph for Tensile.
//!
//! This crate provides:
//! - [`SharedBuffer`]: reference-counted, device-tagged storage with a
//!   write-exclusivity discipline
//! - [`Scalar`], [`Matrix`], [`BatchScalar`], [`BatchMatrix`]: the four
//!   categories of data, plus structural matrices, arrays and [`Duplicate`]
//! - [`lower_access`]: the privileged raw-memory interface for trusted code
//! - [`Category`] / [`Shape`]: category deduction and shape algebra
//! - [`ops`]: the operator API, building [`Expr`] graphs with broadcasting
//! - [`Expr::eval`]: a CPU interpreter producing [`Value`]s
// - DType / Element: supported element types
// - Device: allocation per device (only Cpu today)
// - SharedBuffer: Rc-backed storage, holder count = live handles
// - Entities: scalar, matrix, batch, structural, array, duplicate
// - Op / OpNode: graph nodes, shapes computed by the organizer
// - Eval: recursive interpreter

pub mod access;
pub mod array;
pub mod batch;
pub mod broadcast;
pub mod buffer;
pub mod category;
pub mod copy;
pub mod device;
pub mod dtype;
pub mod duplicate;
pub mod error;
pub mod eval;
pub mod expr;
pub mod matrix;
pub mod op;
pub mod ops;
pub mod organizer;
pub mod scalar;
pub mod shape;
pub mod structural;

pub use access::{lower_access, Lower, LowerAccess};
pub use array::{MatrixArray, ScalarArray};
pub use batch::{BatchMatrix, BatchScalar};
pub use buffer::SharedBuffer;
pub use category::{Category, Data};
pub use copy::data_copy;
pub use device::{Cpu, Device};
pub use dtype::{DType, Element};
pub use duplicate::Duplicate;
pub use error::{Error, Result};
pub use eval::Value;
pub use expr::Expr;
pub use matrix::Matrix;
pub use op::{BinaryOp, Op, OpNode, TernaryOp, UnaryOp};
pub use scalar::Scalar;
pub use shape::Shape;
pub use structural::{OneHotVector, TrivialMatrix, ZeroMatrix};
