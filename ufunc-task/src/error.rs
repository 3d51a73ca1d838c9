use ufunc_traits::DType;
use ufunc_view::{Privilege, UfuncError};

use crate::opcode::TaskId;

/// Contract violations detected while decoding or launching a task.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// The argument buffer ended before a field could be read.
    #[error("argument buffer too short: need {needed} bytes at offset {offset}, have {len}")]
    Args { offset: usize, needed: usize, len: usize },

    /// A rank field outside the supported task ranks.
    #[error("unsupported task rank {0}")]
    UnsupportedRank(i32),

    /// A negative reduced-axis field.
    #[error("invalid axis field {0}")]
    InvalidAxis(i32),

    /// The task was launched with the wrong number of regions.
    #[error("expected {expected} regions, got {actual}")]
    RegionCount { expected: &'static str, actual: usize },

    /// The task was launched with the wrong number of futures.
    #[error("expected {expected} futures, got {actual}")]
    FutureCount { expected: &'static str, actual: usize },

    /// Radix argument that cannot describe the bound input slots.
    #[error("malformed radix {radix} for {slots} input slots")]
    MalformedRadix { radix: i32, slots: usize },

    /// A region binding does not grant the access the task needs.
    #[error("region {index}: {required:?} access required, binding is {actual:?}")]
    RegionPrivilege {
        index: usize,
        required: Privilege,
        actual: Privilege,
    },

    /// A required region is absent.
    #[error("region {0} is absent")]
    AbsentRegion(usize),

    /// The launch index point has no coordinate for an addressed axis.
    #[error("launch index point of rank {rank} has no axis {axis}")]
    IndexPoint { axis: usize, rank: usize },

    /// No task is registered under this id.
    #[error("unknown task id {0}")]
    UnknownTask(TaskId),

    /// The launch element type differs from the registered one.
    #[error("task {id} is registered for {registered}, launched with {launched}")]
    DTypeMismatch {
        id: TaskId,
        registered: DType,
        launched: DType,
    },

    /// A task id was registered twice.
    #[error("task {0} is already registered")]
    DuplicateTask(TaskId),

    #[error(transparent)]
    View(#[from] UfuncError),
}

/// Result type for task decoding and launch.
pub type Result<T> = std::result::Result<T, TaskError>;
