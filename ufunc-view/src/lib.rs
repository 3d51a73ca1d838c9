//! Rectangles, backing stores and operand views for the ufunc task engine.
//!
//! # Core Types
//!
//! - [`Rect`]: inclusive, possibly empty, N-dimensional index rectangle
//! - [`Store`]: owned row-major allocation covering a bounds rectangle
//! - [`OperandView`] / [`OperandViewMut`]: borrowed, privilege-tagged strided
//!   windows over a store, optionally sliced along one extra axis
//!
//! Task arrays have rank 1 to [`MAX_DIM`]. A backing store may carry one
//! additional stacking axis, so stores have rank 1 to [`MAX_ALLOC_DIM`].

pub mod rect;
pub mod store;
pub mod view;

pub use rect::{Coords, Extents, Points, Rect, Strides, MAX_ALLOC_DIM, MAX_DIM};
pub use store::{row_major_strides, Store};
pub use view::{OperandView, OperandViewMut, Privilege};

/// Errors raised by view construction and kernel argument validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UfuncError {
    /// Operand ranks do not match.
    #[error("rank mismatch: {0} vs {1}")]
    RankMismatch(usize, usize),

    /// Rank outside the range an operation supports.
    #[error("unsupported rank {rank} (supported {min}..={max})")]
    UnsupportedRank { rank: usize, min: usize, max: usize },

    /// Operand rectangles differ where they must be identical or nested.
    #[error("rectangle mismatch: {0:?} vs {1:?}")]
    RectMismatch(Rect, Rect),

    /// A view rectangle reaches outside its store's bounds.
    #[error("rectangle {rect:?} is outside store bounds {bounds:?}")]
    OutOfBounds { rect: Rect, bounds: Rect },

    /// Invalid axis index for the given rank.
    #[error("invalid axis {axis} for rank {rank}")]
    InvalidAxis { axis: usize, rank: usize },

    /// The binding's access mode does not permit the requested access.
    #[error("{required:?} access required, binding is {actual:?}")]
    PrivilegeMismatch {
        required: Privilege,
        actual: Privilege,
    },

    /// Data length differs from the rectangle volume.
    #[error("data length {len} does not match rectangle volume {volume}")]
    LengthMismatch { len: usize, volume: usize },

    /// A radix fan-in over a non-empty rectangle has no present input.
    #[error("radix fan-in has no present inputs")]
    NoRadixInputs,

    /// More radix inputs than a fan-in node accepts.
    #[error("radix fan-in of {0} inputs exceeds the maximum of {1}")]
    RadixTooWide(usize, usize),
}

/// Result type for view and kernel operations.
pub type Result<T> = std::result::Result<T, UfuncError>;
