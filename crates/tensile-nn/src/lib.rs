//! # tensile-nn
//!
//! Parameter initialisation for Tensile.
//!
//! - [`Filler`]: constant, uniform, gaussian and variance-scaled fillers
//! - [`InitConfig`]: which filler to use for weights and biases, and where
//!   random numbers come from
//! - [`ParamInitializer`]: a named store of parameter matrices

pub mod config;
pub mod init;
pub mod param;

pub use config::{Distribution, InitConfig, RandomSource, ScaleMode};
pub use init::{AnyFiller, ConstantFiller, Filler, GaussianFiller, UniformFiller, VarScaleFiller};
pub use param::ParamInitializer;
