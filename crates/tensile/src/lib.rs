//! # Tensile
//!
//! Tensor expressions over scalars, matrices and batches, with shapes and
//! categories checked while the expression is built.
//!
//! This is the top-level facade crate that re-exports everything you need.
//!
//! ## Usage
//!
//! ```rust
//! use tensile::prelude::*;
//!
//! # fn main() -> tensile::Result<()> {
//! let m: Matrix<f32> = Matrix::from_vec(2, 3, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0])?;
//! let e = ops::subtract(Scalar::new(5.0f32), m)?;
//! assert_eq!(e.shape(), Shape::matrix(2, 3));
//! assert_eq!(e.eval()?.to_vec(), vec![5.0, 4.0, 3.0, 2.0, 1.0, 0.0]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! | Crate | Purpose |
//! |-------|----------|
//! | `tensile-core` | Shared buffers, entities, lower access, categories, expression graph, evaluator |
//! | `tensile-nn` | Fillers, initialiser configuration, named parameter store |

/// Re-export core types.
pub use tensile_core::{
    data_copy, lower_access, BatchMatrix, BatchScalar, BinaryOp, Category, Cpu, DType, Data,
    Device, Duplicate, Element, Error, Expr, Lower, LowerAccess, Matrix, MatrixArray,
    OneHotVector, Op, OpNode, Result, Scalar, ScalarArray, Shape, SharedBuffer, TernaryOp,
    TrivialMatrix, UnaryOp, Value, ZeroMatrix,
};

/// Operator functions that build expression graphs.
pub mod ops {
    pub use tensile_core::ops::*;
}

/// Re-export parameter initialisation.
pub mod nn {
    pub use tensile_nn::*;
}

/// Convenient imports: `use tensile::prelude::*;`
pub mod prelude {
    pub use crate::nn::{Filler, InitConfig, ParamInitializer, RandomSource};
    pub use crate::ops;
    pub use tensile_core::{
        BatchMatrix, BatchScalar, Category, Cpu, DType, Data, Duplicate, Element, Expr, Matrix,
        MatrixArray, OneHotVector, Scalar, ScalarArray, Shape, TrivialMatrix, Value, ZeroMatrix,
    };
}
