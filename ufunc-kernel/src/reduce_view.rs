//! Reductions on operand views.
//!
//! - [`reduce_all`]: fold a whole partition into one scalar
//! - [`reduce_axis_into`]: collapse one axis into a lower-rank output
//! - [`fold_scalars`]: exclusive fold of two already-reduced scalars

use smallvec::{smallvec, SmallVec};
use ufunc_traits::{FoldMode, ReduceScalar, ReductionOp};
use ufunc_view::{OperandView, OperandViewMut, Privilege, Strides, MAX_DIM};

use crate::kernel::{compute_costs, for_each_run, for_each_run_with_policy, mask_reduction_costs};
use crate::map_view::fill_into;
use crate::policy::ExecPolicy;
use crate::threading::SendPtr;
use crate::{Result, UfuncError};

#[cfg(feature = "parallel")]
use crate::kernel::total_len;
#[cfg(feature = "parallel")]
use crate::threading::mapreduce_threaded;

/// Thread-local partial results are spaced this many bytes apart.
#[cfg(feature = "parallel")]
const CACHE_LINE: usize = 64;

/// Exclusive fold of `len` strided elements into `acc`.
#[inline(always)]
unsafe fn fold_run<T: ReduceScalar, Op: ReductionOp<T>>(
    op: &Op,
    acc: &mut T,
    sp: *const T,
    ss: isize,
    len: usize,
) {
    if ss == 1 {
        for &v in std::slice::from_raw_parts(sp, len) {
            op.fold(acc, v, FoldMode::Exclusive);
        }
    } else {
        for i in 0..len as isize {
            op.fold(acc, *sp.offset(i * ss), FoldMode::Exclusive);
        }
    }
}

fn check_task_rank(rank: usize, min: usize) -> Result<()> {
    if rank < min || rank > MAX_DIM {
        return Err(UfuncError::UnsupportedRank {
            rank,
            min,
            max: MAX_DIM,
        });
    }
    Ok(())
}

/// Fold the operator identity with every element of `src`.
///
/// An empty rectangle yields the identity. Under the parallel strategy each
/// worker folds exclusively into its own cache-line spaced slot, and the
/// slots are merged with [`FoldMode::Relaxed`].
#[cfg_attr(not(feature = "parallel"), allow(unused_variables))]
pub fn reduce_all<T: ReduceScalar, Op: ReductionOp<T>>(
    op: &Op,
    src: &OperandView<'_, T>,
    policy: &ExecPolicy,
) -> Result<T> {
    check_task_rank(src.dim(), 1)?;
    if src.is_empty() {
        return Ok(op.identity());
    }

    let dims = src.extents();
    let src_strides: Strides = SmallVec::from_slice(src.strides());
    let sp = SendPtr(src.ptr() as *mut T);

    #[cfg(feature = "parallel")]
    if let Some(nthreads) = policy.parallel_threads(total_len(&dims)) {
        let spacing = (CACHE_LINE / std::mem::size_of::<T>()).max(1);
        let mut slots = vec![op.identity(); spacing * nthreads];
        let slots_ptr = SendPtr(slots.as_mut_ptr());

        // Operand 0 is the slot array: stride 0 everywhere, addressed via
        // the spacing/taskindex offset.
        let strides_list: [Strides; 2] = [smallvec![0; dims.len()], src_strides];
        let costs = compute_costs(&strides_list[1..]);

        mapreduce_threaded(
            &dims,
            &strides_list,
            &[0, 0],
            &costs,
            nthreads,
            policy.min_parallel_len(),
            spacing as isize,
            1,
            &|dims, strides_list, offsets| {
                let slot = unsafe { &mut *slots_ptr.as_ptr().offset(offsets[0]) };
                for_each_run(dims, &strides_list[1..], &offsets[1..], |offsets, len, inner| unsafe {
                    fold_run(op, slot, sp.as_const().offset(offsets[0]), inner[0], len)
                });
            },
        );

        let mut result = op.identity();
        for &partial in slots.iter().step_by(spacing) {
            op.fold(&mut result, partial, FoldMode::Relaxed);
        }
        return Ok(result);
    }

    let mut acc = op.identity();
    for_each_run(&dims, &[src_strides], &[0], |offsets, len, inner| unsafe {
        fold_run(op, &mut acc, sp.as_const().offset(offsets[0]), inner[0], len)
    });
    Ok(acc)
}

/// Collapse `axis` of `src` into `dest`.
///
/// `dest` has rank `src.dim() - 1` and must cover `src`'s rectangle with
/// `axis` removed. Every element of `dest` is first set to `seed` (the
/// operator identity when `None`); then every element of `src` is folded
/// into the `dest` element at its coordinate without `axis`.
///
/// Returns immediately, without writing, when `dest` is empty. The reduced
/// axis is never split across workers.
pub fn reduce_axis_into<T: ReduceScalar, Op: ReductionOp<T>>(
    op: &Op,
    dest: &mut OperandViewMut<'_, T>,
    src: &OperandView<'_, T>,
    axis: usize,
    seed: Option<T>,
    policy: &ExecPolicy,
) -> Result<()> {
    if dest.is_empty() {
        return Ok(());
    }
    let rank = src.dim();
    check_task_rank(rank, 2)?;
    if axis >= rank {
        return Err(UfuncError::InvalidAxis { axis, rank });
    }
    if dest.dim() + 1 != rank {
        return Err(UfuncError::RankMismatch(dest.dim() + 1, rank));
    }
    dest.require(Privilege::ReadWrite)?;
    if !src.is_empty() {
        let projected = src.rect().remove_axis(axis)?;
        if !dest.rect().contains(&projected) {
            return Err(UfuncError::RectMismatch(dest.rect().clone(), projected));
        }
    }

    fill_into(dest, seed.unwrap_or_else(|| op.identity()), policy)?;
    if src.is_empty() {
        return Ok(());
    }

    let (lo, hi) = (src.rect().lo()[axis], src.rect().hi()[axis]);
    let mut folded = dest.broadcast_axis(axis, lo, hi)?;
    let dims = src.extents();
    let strides_list: [Strides; 2] = [
        SmallVec::from_slice(folded.strides()),
        SmallVec::from_slice(src.strides()),
    ];
    let offsets = [folded.offset_of(src.rect().lo()), 0];
    let costs = mask_reduction_costs(compute_costs(&strides_list), folded.strides());
    let dst = SendPtr(folded.as_mut_ptr());
    let sp = SendPtr(src.ptr() as *mut T);

    for_each_run_with_policy(policy, &dims, &strides_list, &offsets, &costs, &|offsets, len, inner| unsafe {
        let dp = dst.as_ptr().offset(offsets[0]);
        let sp = sp.as_const().offset(offsets[1]);
        for i in 0..len as isize {
            op.fold(&mut *dp.offset(i * inner[0]), *sp.offset(i * inner[1]), FoldMode::Exclusive);
        }
    });
    Ok(())
}

/// Exclusive fold of `value` into `acc`.
#[inline]
pub fn fold_scalars<T: ReduceScalar, Op: ReductionOp<T>>(op: &Op, acc: T, value: T) -> T {
    let mut acc = acc;
    op.fold(&mut acc, value, FoldMode::Exclusive);
    acc
}
