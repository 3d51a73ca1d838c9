//! Rayon-based recursive splitting of an iteration space.
//!
//! The iteration rectangle is halved along its most expensive splittable
//! dimension until each piece either fits one worker or drops below the
//! policy's minimum parallel length. Leaves run the ordinary serial run
//! iteration on their sub-rectangle.

#[cfg(feature = "parallel")]
use smallvec::SmallVec;
#[cfg(feature = "parallel")]
use ufunc_view::Strides;

#[cfg(feature = "parallel")]
use crate::kernel::SVec;

/// A raw pointer wrapper that is `Send` + `Sync`.
///
/// # Safety
/// The caller must guarantee that the pointed-to data outlives every worker
/// using the pointer and that workers write to disjoint elements.
pub(crate) struct SendPtr<T>(pub(crate) *mut T);

impl<T> Clone for SendPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SendPtr<T> {}

unsafe impl<T> Send for SendPtr<T> {}
unsafe impl<T> Sync for SendPtr<T> {}

impl<T> SendPtr<T> {
    #[inline(always)]
    pub(crate) fn as_ptr(self) -> *mut T {
        self.0
    }

    #[inline(always)]
    pub(crate) fn as_const(self) -> *const T {
        self.0 as *const T
    }
}

/// Index of the largest `(dims[i] - 1) * costs[i]`, ties going to the last.
#[cfg(feature = "parallel")]
fn split_dimension(dims: &[usize], costs: &[isize]) -> usize {
    let (i, _) = dims.iter().zip(costs.iter()).enumerate().fold(
        (0, isize::MIN),
        |(best_i, best_v), (idx, (&d, &c))| {
            let score = (d as isize - 1) * c;
            if score >= best_v {
                (idx, score)
            } else {
                (best_i, best_v)
            }
        },
    );
    i
}

/// Advance every operand offset by `n` steps along dimension `dim`.
#[cfg(feature = "parallel")]
fn advanced_offsets(strides_list: &[Strides], offsets: &[isize], dim: usize, n: usize) -> SmallVec<[isize; 8]> {
    offsets
        .iter()
        .zip(strides_list)
        .map(|(&o, s)| o + n as isize * s[dim])
        .collect()
}

/// Recursive dimension-splitting parallel execution.
///
/// Parameters:
/// - `dims`: extents of the (sub-)rectangle
/// - `strides_list`: per-operand strides
/// - `offsets`: per-operand element offsets of the sub-rectangle's corner
/// - `costs`: per-dimension split costs; 0 marks a dimension that must not be split
/// - `nthreads`: workers available to this subtree
/// - `min_len`: sub-rectangles this small are never split further
/// - `spacing`: distance between thread-local result slots (0 when unused)
/// - `taskindex`: 1-based slot index of this subtree
/// - `f`: leaf function receiving `(dims, strides_list, offsets)`
///
/// With non-zero `spacing`, the leaf's `offsets[0]` is advanced by
/// `spacing * (taskindex - 1)` so each leaf addresses its own slot.
#[cfg(feature = "parallel")]
#[allow(clippy::too_many_arguments)]
pub(crate) fn mapreduce_threaded<F>(
    dims: &[usize],
    strides_list: &[Strides],
    offsets: &[isize],
    costs: &[isize],
    nthreads: usize,
    min_len: usize,
    spacing: isize,
    taskindex: usize,
    f: &F,
) where
    F: Fn(&[usize], &[Strides], &[isize]) + Sync,
{
    let total: usize = dims.iter().product();

    let leaf = |offsets: &[isize]| {
        if spacing != 0 {
            let mut spaced: SmallVec<[isize; 8]> = SmallVec::from_slice(offsets);
            spaced[0] += spacing * (taskindex as isize - 1);
            f(dims, strides_list, &spaced);
        } else {
            f(dims, strides_list, offsets);
        }
    };

    if nthreads <= 1 || total <= min_len || dims.is_empty() {
        leaf(offsets);
        return;
    }

    let i = split_dimension(dims, costs);
    if costs[i] == 0 || dims[i] <= 1 {
        leaf(offsets);
        return;
    }

    let di = dims[i];
    let ndi = di / 2;
    let nt_left = nthreads / 2;
    let nt_right = nthreads - nt_left;

    let mut left_dims: SVec<usize> = SmallVec::from_slice(dims);
    left_dims[i] = ndi;
    let mut right_dims: SVec<usize> = SmallVec::from_slice(dims);
    right_dims[i] = di - ndi;
    let right_offsets = advanced_offsets(strides_list, offsets, i, ndi);

    rayon::join(
        || {
            mapreduce_threaded(
                &left_dims,
                strides_list,
                offsets,
                costs,
                nt_left,
                min_len,
                spacing,
                taskindex,
                f,
            )
        },
        || {
            mapreduce_threaded(
                &right_dims,
                strides_list,
                &right_offsets,
                costs,
                nt_right,
                min_len,
                spacing,
                taskindex + nt_left,
                f,
            )
        },
    );
}
