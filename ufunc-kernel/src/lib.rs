//! Serial and parallel task kernels for the ufunc reduction engine.
//!
//! Every kernel is generic over the element type, the reduction operator and
//! the operand rank, and runs under an [`ExecPolicy`] that picks the serial
//! body or the rayon-split parallel body. Both bodies produce the same
//! result for any thread count.
//!
//! # Kernels
//!
//! ## Reductions
//!
//! - [`reduce_all`]: whole-partition reduction to a scalar
//! - [`reduce_axis_into`]: collapse one axis into a seeded lower-rank output
//! - [`fold_scalars`]: fold two partial scalars
//!
//! ## Combines
//!
//! - [`combine_into`], [`combine_inplace`]: array with array
//! - [`combine_broadcast_into`], [`combine_broadcast_inplace`]: array with scalar
//! - [`combine_scalars`]: scalar with scalar
//!
//! ## Reduction trees
//!
//! - [`radix_fan_in`]: fold up to [`MAX_REDUCTION_RADIX`] partial results
//!
//! ## Elementwise building blocks
//!
//! - [`fill_into`], [`map_into`], [`update_with`], [`update_into`], [`zip_map2_into`]
//!
//! # Example
//!
//! ```rust
//! use ufunc_kernel::{reduce_all, ExecPolicy};
//! use ufunc_traits::Max;
//! use ufunc_view::{Rect, Store};
//!
//! let store = Store::from_vec(Rect::from_extents(&[5]).unwrap(), vec![3, 7, 2, 9, 4]).unwrap();
//! let view = store.view(store.bounds()).unwrap();
//! assert_eq!(reduce_all(&Max, &view, &ExecPolicy::default()).unwrap(), 9);
//! ```

pub(crate) mod kernel;
pub(crate) mod threading;

pub mod combine;
pub mod map_view;
pub mod maybe_sync;
pub mod policy;
pub mod radix;
pub mod reduce_view;

pub use combine::{
    combine_broadcast_inplace, combine_broadcast_into, combine_inplace, combine_into,
    combine_scalars,
};
pub use map_view::{fill_into, map_into, update_into, update_with, zip_map2_into};
pub use maybe_sync::{MaybeSendSync, MaybeSync};
pub use policy::{ExecPolicy, Strategy, MIN_PARALLEL_LEN};
pub use radix::{radix_fan_in, MAX_REDUCTION_RADIX};
pub use reduce_view::{fold_scalars, reduce_all, reduce_axis_into};

pub use ufunc_view::{Result, UfuncError};
