//! Task registry.
//!
//! The host builds one registry up front, listing which (operator, element
//! type) pairs it launches, and then dispatches every task by id. Nothing is
//! registered implicitly and there is no process-wide instance.
//!
//! # Example
//!
//! ```rust
//! use ufunc_task::{FutureValue, TaskContext, TaskId, TaskKind, TaskOutput, TaskRegistry};
//! use ufunc_traits::{DType, ReductionKind};
//!
//! let registry = TaskRegistry::builder()
//!     .register(ReductionKind::Max, DType::Int64)
//!     .unwrap()
//!     .build();
//!
//! let futures = [FutureValue::new(7i64), FutureValue::new(9i64)];
//! let ctx = TaskContext::builder(&[]).futures(&futures).build();
//! let id = TaskId::of(ReductionKind::Max, TaskKind::ReductionScalar, DType::Int64);
//! assert_eq!(registry.launch(id, ctx).unwrap(), TaskOutput::Scalar(9));
//! ```

use std::collections::HashMap;

use ufunc_kernel::ExecPolicy;
use ufunc_traits::{DType, ReduceScalar, ReductionKind};

use crate::context::{TaskContext, TaskOutput};
use crate::error::{Result, TaskError};
use crate::launch;
use crate::opcode::{TaskId, TaskKind};

/// A registered task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDescriptor {
    pub id: TaskId,
    pub kind: TaskKind,
    pub reduction: ReductionKind,
    pub dtype: DType,
    /// Readable name, e.g. `max_axis_collapse_f64`.
    pub name: String,
}

impl TaskDescriptor {
    pub fn new(reduction: ReductionKind, kind: TaskKind, dtype: DType) -> Self {
        Self {
            id: TaskId::of(reduction, kind, dtype),
            kind,
            reduction,
            dtype,
            name: format!("{}_{}_{}", reduction.name(), kind.name(), dtype.name()),
        }
    }
}

/// Registered tasks plus the execution policy their bodies run under.
#[derive(Debug, Clone)]
pub struct TaskRegistry {
    tasks: HashMap<TaskId, TaskDescriptor>,
    policy: ExecPolicy,
}

impl TaskRegistry {
    pub fn builder() -> TaskRegistryBuilder {
        TaskRegistryBuilder {
            tasks: HashMap::new(),
            policy: ExecPolicy::default(),
        }
    }

    pub fn policy(&self) -> &ExecPolicy {
        &self.policy
    }

    pub fn get(&self, id: TaskId) -> Option<&TaskDescriptor> {
        self.tasks.get(&id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskDescriptor> {
        self.tasks.values()
    }

    /// Run task `id` on `ctx`.
    ///
    /// `T` must be the element type the task was registered for.
    pub fn launch<T: ReduceScalar>(&self, id: TaskId, ctx: TaskContext<'_, T>) -> Result<TaskOutput<T>> {
        let desc = self.get(id).ok_or(TaskError::UnknownTask(id))?;
        if desc.dtype != T::DTYPE {
            return Err(TaskError::DTypeMismatch {
                id,
                registered: desc.dtype,
                launched: T::DTYPE,
            });
        }
        launch::run(desc, ctx, &self.policy)
    }

    /// [`launch`](Self::launch), treating any contract violation as fatal.
    ///
    /// # Panics
    /// Panics after logging the error when the launch fails.
    pub fn launch_or_abort<T: ReduceScalar>(&self, id: TaskId, ctx: TaskContext<'_, T>) -> TaskOutput<T> {
        match self.launch(id, ctx) {
            Ok(output) => output,
            Err(err) => {
                tracing::error!(task = %id, error = %err, "task contract violation");
                panic!("task {id} aborted: {err}");
            }
        }
    }
}

pub struct TaskRegistryBuilder {
    tasks: HashMap<TaskId, TaskDescriptor>,
    policy: ExecPolicy,
}

impl TaskRegistryBuilder {
    pub fn policy(mut self, policy: ExecPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Register every task kind of `reduction` over `dtype`.
    pub fn register(mut self, reduction: ReductionKind, dtype: DType) -> Result<Self> {
        for kind in TaskKind::ALL {
            let desc = TaskDescriptor::new(reduction, kind, dtype);
            if self.tasks.contains_key(&desc.id) {
                return Err(TaskError::DuplicateTask(desc.id));
            }
            self.tasks.insert(desc.id, desc);
        }
        Ok(self)
    }

    /// Register every builtin operator for every element type.
    pub fn register_defaults(self) -> Result<Self> {
        let mut builder = self;
        for reduction in ReductionKind::ALL {
            for dtype in DType::ALL {
                builder = builder.register(reduction, dtype)?;
            }
        }
        Ok(builder)
    }

    pub fn build(self) -> TaskRegistry {
        tracing::debug!(tasks = self.tasks.len(), policy = ?self.policy, "task registry built");
        TaskRegistry {
            tasks: self.tasks,
            policy: self.policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::FutureValue;

    #[test]
    fn test_register_all_kinds() {
        let registry = TaskRegistry::builder()
            .register(ReductionKind::Max, DType::Float64)
            .unwrap()
            .build();
        assert_eq!(registry.len(), TaskKind::ALL.len());
        let id = TaskId::of(ReductionKind::Max, TaskKind::AxisCollapse, DType::Float64);
        let desc = registry.get(id).unwrap();
        assert_eq!(desc.name, "max_axis_collapse_f64");
        assert_eq!(desc.kind, TaskKind::AxisCollapse);
    }

    #[test]
    fn test_register_defaults_covers_everything() {
        let registry = TaskRegistry::builder().register_defaults().unwrap().build();
        assert_eq!(
            registry.len(),
            ReductionKind::ALL.len() * DType::ALL.len() * TaskKind::ALL.len()
        );
        assert!(registry.iter().all(|d| registry.get(d.id) == Some(d)));
    }

    #[test]
    fn test_duplicate_registration() {
        let err = TaskRegistry::builder()
            .register(ReductionKind::Sum, DType::Int32)
            .unwrap()
            .register(ReductionKind::Sum, DType::Int32)
            .err()
            .unwrap();
        assert!(matches!(err, TaskError::DuplicateTask(_)));
    }

    #[test]
    fn test_launch_checks_id_and_dtype() {
        let registry = TaskRegistry::builder()
            .policy(ExecPolicy::serial())
            .register(ReductionKind::Min, DType::Int32)
            .unwrap()
            .build();
        assert_eq!(registry.policy(), &ExecPolicy::serial());

        let futures = [FutureValue::new(1.0f32), FutureValue::new(2.0f32)];
        let unknown = TaskId::of(ReductionKind::Max, TaskKind::CombineScalar, DType::Int32);
        assert_eq!(
            registry
                .launch(unknown, TaskContext::builder(&[]).futures(&futures).build())
                .unwrap_err(),
            TaskError::UnknownTask(unknown)
        );

        let id = TaskId::of(ReductionKind::Min, TaskKind::CombineScalar, DType::Int32);
        assert_eq!(
            registry
                .launch(id, TaskContext::builder(&[]).futures(&futures).build())
                .unwrap_err(),
            TaskError::DTypeMismatch {
                id,
                registered: DType::Int32,
                launched: DType::Float32
            }
        );
        assert!(!futures[0].is_consumed());
    }
}
