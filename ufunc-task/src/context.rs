//! Everything one task invocation receives from the host.

use std::cell::Cell;

use smallvec::SmallVec;
use ufunc_view::{Coords, OperandView, OperandViewMut, Privilege, Rect, Store};

use crate::error::{Result, TaskError};

/// A region requirement bound to a store, or an absent slot.
#[derive(Debug)]
pub enum Region<'a, T> {
    ReadOnly(&'a Store<T>),
    WriteDiscard(&'a mut Store<T>),
    ReadWrite(&'a mut Store<T>),
    Absent,
}

impl<'a, T> Region<'a, T> {
    /// Access mode of the binding; `None` for an absent slot.
    pub fn privilege(&self) -> Option<Privilege> {
        match self {
            Region::ReadOnly(_) => Some(Privilege::ReadOnly),
            Region::WriteDiscard(_) => Some(Privilege::WriteDiscard),
            Region::ReadWrite(_) => Some(Privilege::ReadWrite),
            Region::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Region::Absent)
    }

    /// Readable view of `rect`, sliced at `slice = (axis, coord)` when given.
    ///
    /// `index` is the region's position and only feeds error reports.
    pub(crate) fn input(&self, index: usize, rect: &Rect, slice: Option<(usize, i64)>) -> Result<OperandView<'_, T>> {
        let store: &Store<T> = match self {
            Region::ReadOnly(store) => store,
            Region::ReadWrite(store) => store,
            Region::WriteDiscard(_) => {
                return Err(TaskError::RegionPrivilege {
                    index,
                    required: Privilege::ReadOnly,
                    actual: Privilege::WriteDiscard,
                })
            }
            Region::Absent => return Err(TaskError::AbsentRegion(index)),
        };
        let view = match slice {
            Some((axis, coord)) => store.view_slice(rect, axis, coord)?,
            None => store.view(rect)?,
        };
        Ok(view)
    }

    /// Writable view of `rect` whose binding satisfies `required`.
    pub(crate) fn output(
        &mut self,
        index: usize,
        rect: &Rect,
        slice: Option<(usize, i64)>,
        required: Privilege,
    ) -> Result<OperandViewMut<'_, T>> {
        let actual = self.privilege().ok_or(TaskError::AbsentRegion(index))?;
        let denied = TaskError::RegionPrivilege {
            index,
            required,
            actual,
        };
        let store: &mut Store<T> = match self {
            Region::WriteDiscard(store) if required != Privilege::ReadWrite => store,
            Region::ReadWrite(store) => store,
            _ => return Err(denied),
        };
        let view = match slice {
            Some((axis, coord)) => store.view_mut_slice(rect, axis, coord, actual)?,
            None => store.view_mut(rect, actual)?,
        };
        Ok(view)
    }
}

/// A scalar precomputed by an earlier task.
///
/// Reading it through [`get_result`](Self::get_result) marks it consumed, so
/// callers can check which launches actually depended on it.
#[derive(Debug)]
pub struct FutureValue<T> {
    value: T,
    consumed: Cell<bool>,
}

impl<T: Copy> FutureValue<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            consumed: Cell::new(false),
        }
    }

    pub fn get_result(&self) -> T {
        self.consumed.set(true);
        self.value
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed.get()
    }
}

/// One task invocation: argument bytes, region bindings, futures and the
/// launch index point.
#[derive(Debug)]
pub struct TaskContext<'a, T> {
    pub(crate) args: &'a [u8],
    pub(crate) regions: Vec<Region<'a, T>>,
    pub(crate) futures: &'a [FutureValue<T>],
    pub(crate) index_point: Coords,
}

impl<'a, T> TaskContext<'a, T> {
    pub fn builder(args: &'a [u8]) -> TaskContextBuilder<'a, T> {
        TaskContextBuilder {
            ctx: TaskContext {
                args,
                regions: Vec::new(),
                futures: &[],
                index_point: SmallVec::new(),
            },
        }
    }

    pub fn args(&self) -> &[u8] {
        self.args
    }

    pub fn num_regions(&self) -> usize {
        self.regions.len()
    }

    pub fn num_futures(&self) -> usize {
        self.futures.len()
    }

    pub fn index_point(&self) -> &[i64] {
        &self.index_point
    }

    /// Coordinate of the launch index point along `axis`.
    pub(crate) fn index_coord(&self, axis: usize) -> Result<i64> {
        self.index_point.get(axis).copied().ok_or(TaskError::IndexPoint {
            axis,
            rank: self.index_point.len(),
        })
    }
}

pub struct TaskContextBuilder<'a, T> {
    ctx: TaskContext<'a, T>,
}

impl<'a, T> TaskContextBuilder<'a, T> {
    pub fn region(mut self, region: Region<'a, T>) -> Self {
        self.ctx.regions.push(region);
        self
    }

    pub fn futures(mut self, futures: &'a [FutureValue<T>]) -> Self {
        self.ctx.futures = futures;
        self
    }

    pub fn index_point(mut self, point: &[i64]) -> Self {
        self.ctx.index_point = SmallVec::from_slice(point);
        self
    }

    pub fn build(self) -> TaskContext<'a, T> {
        self.ctx
    }
}

/// What a launch hands back to the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TaskOutput<T> {
    /// Results were written to the output region.
    Done,
    /// Scalar result of a whole-partition reduction or scalar combine.
    Scalar(T),
}

impl<T: Copy> TaskOutput<T> {
    pub fn scalar(&self) -> Option<T> {
        match self {
            TaskOutput::Scalar(v) => Some(*v),
            TaskOutput::Done => None,
        }
    }
}
