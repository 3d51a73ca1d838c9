//! Radix fan-in: one node of a reduction tree.
//!
//! Combines the present partial results of up to [`MAX_REDUCTION_RADIX`]
//! sibling tasks into one output. Absent siblings are simply not passed in;
//! they never contribute an identity value.

use smallvec::SmallVec;
use ufunc_traits::{FoldMode, ReduceScalar, ReductionOp};
use ufunc_view::{OperandView, OperandViewMut, Privilege, Strides};

use crate::kernel::{compute_costs, ensure_same_rect, for_each_run_with_policy};
use crate::policy::ExecPolicy;
use crate::threading::SendPtr;
use crate::{Result, UfuncError};

/// Maximum number of input slots of one fan-in node (the output region is
/// not counted).
pub const MAX_REDUCTION_RADIX: usize = 16;

/// `dest[p] = fold(inputs[0][p], inputs[1][p], ...)` for every point `p`.
///
/// Each coordinate is seeded with the first input and every later input is
/// folded in exclusively. All views must share `dest`'s rectangle. An empty
/// `dest` returns without reading anything.
pub fn radix_fan_in<T: ReduceScalar, Op: ReductionOp<T>>(
    op: &Op,
    dest: &mut OperandViewMut<'_, T>,
    inputs: &[OperandView<'_, T>],
    policy: &ExecPolicy,
) -> Result<()> {
    if dest.is_empty() {
        return Ok(());
    }
    if inputs.is_empty() {
        return Err(UfuncError::NoRadixInputs);
    }
    if inputs.len() > MAX_REDUCTION_RADIX {
        return Err(UfuncError::RadixTooWide(inputs.len(), MAX_REDUCTION_RADIX));
    }
    dest.require(Privilege::WriteDiscard)?;
    for input in inputs {
        ensure_same_rect(dest.rect(), input.rect())?;
    }

    let dims = dest.extents();
    let mut strides_list: Vec<Strides> = Vec::with_capacity(inputs.len() + 1);
    strides_list.push(SmallVec::from_slice(dest.strides()));
    strides_list.extend(inputs.iter().map(|v| Strides::from_slice(v.strides())));
    let offsets = vec![0isize; strides_list.len()];
    let costs = compute_costs(&strides_list);

    let dst = SendPtr(dest.as_mut_ptr());
    let srcs: SmallVec<[SendPtr<T>; MAX_REDUCTION_RADIX]> =
        inputs.iter().map(|v| SendPtr(v.ptr() as *mut T)).collect();

    for_each_run_with_policy(policy, &dims, &strides_list, &offsets, &costs, &|offsets, len, inner| unsafe {
        let dp = dst.as_ptr().offset(offsets[0]);
        for i in 0..len as isize {
            let mut val = *srcs[0].as_const().offset(offsets[1] + i * inner[1]);
            for (k, sp) in srcs.iter().enumerate().skip(1) {
                let v = *sp.as_const().offset(offsets[k + 1] + i * inner[k + 1]);
                op.fold(&mut val, v, FoldMode::Exclusive);
            }
            *dp.offset(i * inner[0]) = val;
        }
    });
    Ok(())
}
