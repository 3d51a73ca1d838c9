//! Task layer of the ufunc reduction engine.
//!
//! A host launches tasks by id. Each launch receives a [`TaskContext`]:
//! serialized arguments, region bindings, scalar futures and the launch
//! index point. The [`TaskRegistry`] maps the id to a [`TaskDescriptor`],
//! decodes the arguments and runs the matching kernel from `ufunc-kernel`.
//!
//! # Modules
//!
//! - [`args`]: little-endian argument buffers and per-task argument structs
//! - [`opcode`]: operation codes, variants and the task id formula
//! - [`context`]: regions, futures and the task context
//! - [`registry`]: registration and launch
//!
//! Contract violations surface as [`TaskError`] from
//! [`TaskRegistry::launch`]; [`TaskRegistry::launch_or_abort`] turns them
//! into a panic.

pub mod args;
pub mod context;
mod error;
mod launch;
pub mod opcode;
pub mod registry;

pub use args::{ArgDeserializer, ArgSerializer, CollapseArgs, RadixArgs, ShapeArgs};
pub use context::{FutureValue, Region, TaskContext, TaskContextBuilder, TaskOutput};
pub use error::{Result, TaskError};
pub use opcode::{OpCode, OpRole, TaskId, TaskKind, Variant, MAX_VARIANTS, TYPE_OFFSET};
pub use registry::{TaskDescriptor, TaskRegistry, TaskRegistryBuilder};

pub use ufunc_kernel::{ExecPolicy, Strategy, MAX_REDUCTION_RADIX};
