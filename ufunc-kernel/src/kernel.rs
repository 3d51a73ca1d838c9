//! Row-major run iteration over several strided operands at once.
//!
//! Every task kernel walks its iteration rectangle as a sequence of "runs":
//! stretches of the innermost (last) axis. The callback receives, per run,
//! the element offset of each operand, the run length, and each operand's
//! stride along the inner axis.

use smallvec::{smallvec, SmallVec};
use ufunc_view::{Rect, Strides, MAX_ALLOC_DIM};

use crate::maybe_sync::MaybeSync;
use crate::policy::ExecPolicy;
use crate::{Result, UfuncError};

#[cfg(feature = "parallel")]
use crate::threading::mapreduce_threaded;

/// Stack-allocated Vec for per-dimension and per-operand scratch.
pub(crate) type SVec<T> = SmallVec<[T; MAX_ALLOC_DIM]>;

#[inline]
pub(crate) fn total_len(dims: &[usize]) -> usize {
    dims.iter().product()
}

pub(crate) fn ensure_same_rect(a: &Rect, b: &Rect) -> Result<()> {
    if a.dim() != b.dim() {
        return Err(UfuncError::RankMismatch(a.dim(), b.dim()));
    }
    if a != b {
        return Err(UfuncError::RectMismatch(a.clone(), b.clone()));
    }
    Ok(())
}

/// Per-dimension split costs: the smallest absolute stride across operands,
/// with zero mapped to 1 and anything else doubled.
pub(crate) fn compute_costs(strides_list: &[Strides]) -> SVec<isize> {
    let Some(first) = strides_list.first() else {
        return SVec::new();
    };
    let mut costs: SVec<isize> = smallvec![isize::MAX; first.len()];
    for strides in strides_list {
        for (cost, &s) in costs.iter_mut().zip(strides.iter()) {
            *cost = (*cost).min(s.abs());
        }
    }
    for cost in &mut costs {
        *cost = if *cost == 0 { 1 } else { *cost * 2 };
    }
    costs
}

/// Zero the cost of every dimension along which `out_strides` is 0.
///
/// Those dimensions fold into the same output element, so splitting them
/// across workers would race on it.
pub(crate) fn mask_reduction_costs(mut costs: SVec<isize>, out_strides: &[isize]) -> SVec<isize> {
    for (cost, &s) in costs.iter_mut().zip(out_strides) {
        if s == 0 {
            *cost = 0;
        }
    }
    costs
}

/// Visit `dims` in row-major order as inner-axis runs.
///
/// `strides_list[k]` and `initial_offsets[k]` describe operand `k`.
pub(crate) fn for_each_run<F>(
    dims: &[usize],
    strides_list: &[Strides],
    initial_offsets: &[isize],
    mut f: F,
) where
    F: FnMut(&[isize], usize, &[isize]),
{
    let rank = dims.len();
    if dims.iter().any(|&d| d == 0) {
        return;
    }
    let mut offsets: SVec<isize> = SmallVec::from_slice(initial_offsets);
    if rank == 0 {
        let inner: SVec<isize> = smallvec![0; strides_list.len()];
        f(&offsets, 1, &inner);
        return;
    }

    let inner = rank - 1;
    let inner_strides: SVec<isize> = strides_list.iter().map(|s| s[inner]).collect();
    let mut idx: SVec<usize> = smallvec![0; rank];

    loop {
        f(&offsets, dims[inner], &inner_strides);

        // Carry-style increment over the outer levels, innermost first.
        let mut level = inner;
        loop {
            if level == 0 {
                return;
            }
            level -= 1;
            for (offset, s) in offsets.iter_mut().zip(strides_list.iter()) {
                *offset += s[level];
            }
            idx[level] += 1;
            if idx[level] < dims[level] {
                break;
            }
            idx[level] = 0;
            for (offset, s) in offsets.iter_mut().zip(strides_list.iter()) {
                *offset -= dims[level] as isize * s[level];
            }
        }
    }
}

/// Run `f` over every inner-axis run of `dims`, serially or split across
/// workers according to `policy`.
///
/// Parallel splitting only happens along dimensions with non-zero `costs`.
#[cfg_attr(not(feature = "parallel"), allow(unused_variables))]
pub(crate) fn for_each_run_with_policy<F>(
    policy: &ExecPolicy,
    dims: &[usize],
    strides_list: &[Strides],
    offsets: &[isize],
    costs: &[isize],
    f: &F,
) where
    F: Fn(&[isize], usize, &[isize]) + MaybeSync,
{
    #[cfg(feature = "parallel")]
    if let Some(nthreads) = policy.parallel_threads(total_len(dims)) {
        tracing::trace!(nthreads, ?dims, ?costs, "splitting iteration space");
        mapreduce_threaded(
            dims,
            strides_list,
            offsets,
            costs,
            nthreads,
            policy.min_parallel_len(),
            0,
            1,
            &|dims, strides, offsets| for_each_run(dims, strides, offsets, |o, len, s| f(o, len, s)),
        );
        return;
    }

    for_each_run(dims, strides_list, offsets, |o, len, s| f(o, len, s));
}
