//! Core traits for the ufunc reduction engine.
//!
//! - [`ReduceScalar`]: element types a task can be instantiated for, with the
//!   constants and arithmetic the builtin operators need.
//! - [`ReductionOp`]: associative, commutative folds with an identity, plus
//!   the builtin [`Max`], [`Min`], [`Sum`] and [`Prod`] operators.

pub mod op;
pub mod scalar;

pub use op::{FoldMode, Max, Min, Prod, ReductionKind, ReductionOp, Sum};
pub use scalar::{DType, ReduceScalar};
