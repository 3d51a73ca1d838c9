//! Binary combine kernels.
//!
//! Elementwise application of a reduction operator's `combine` to two
//! operands, where either operand may be an array or a single scalar:
//!
//! | operands        | fresh output               | in place                      |
//! |-----------------|----------------------------|-------------------------------|
//! | array, array    | [`combine_into`]           | [`combine_inplace`]           |
//! | array, scalar   | [`combine_broadcast_into`] | [`combine_broadcast_inplace`] |
//! | scalar, scalar  | [`combine_scalars`]        |                               |

use ufunc_traits::{FoldMode, ReduceScalar, ReductionOp};
use ufunc_view::{OperandView, OperandViewMut};

use crate::map_view::{map_into, update_into, update_with, zip_map2_into};
use crate::policy::ExecPolicy;
use crate::Result;

/// `dest = combine(lhs, rhs)` elementwise. All three rectangles must match.
pub fn combine_into<T: ReduceScalar, Op: ReductionOp<T>>(
    op: &Op,
    dest: &mut OperandViewMut<'_, T>,
    lhs: &OperandView<'_, T>,
    rhs: &OperandView<'_, T>,
    policy: &ExecPolicy,
) -> Result<()> {
    zip_map2_into(dest, lhs, rhs, |a, b| op.combine(a, b), policy)
}

/// Exclusively fold `rhs` into a read-write `dest` that doubles as the
/// first operand.
pub fn combine_inplace<T: ReduceScalar, Op: ReductionOp<T>>(
    op: &Op,
    dest: &mut OperandViewMut<'_, T>,
    rhs: &OperandView<'_, T>,
    policy: &ExecPolicy,
) -> Result<()> {
    update_into(
        dest,
        rhs,
        |mut acc, v| {
            op.fold(&mut acc, v, FoldMode::Exclusive);
            acc
        },
        policy,
    )
}

/// `dest = combine(lhs, scalar)` elementwise.
pub fn combine_broadcast_into<T: ReduceScalar, Op: ReductionOp<T>>(
    op: &Op,
    dest: &mut OperandViewMut<'_, T>,
    lhs: &OperandView<'_, T>,
    scalar: T,
    policy: &ExecPolicy,
) -> Result<()> {
    map_into(dest, lhs, |a| op.combine(a, scalar), policy)
}

/// Exclusively fold `scalar` into every element of a read-write `dest`.
pub fn combine_broadcast_inplace<T: ReduceScalar, Op: ReductionOp<T>>(
    op: &Op,
    dest: &mut OperandViewMut<'_, T>,
    scalar: T,
    policy: &ExecPolicy,
) -> Result<()> {
    update_with(
        dest,
        |mut acc| {
            op.fold(&mut acc, scalar, FoldMode::Exclusive);
            acc
        },
        policy,
    )
}

/// `combine(a, b)` of two scalars.
#[inline]
pub fn combine_scalars<T: ReduceScalar, Op: ReductionOp<T>>(op: &Op, a: T, b: T) -> T {
    op.combine(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ufunc_traits::{Max, Prod};
    use ufunc_view::{Privilege, Rect, Store, UfuncError};

    fn row(values: &[i32]) -> Store<i32> {
        Store::from_vec(Rect::from_extents(&[values.len()]).unwrap(), values.to_vec()).unwrap()
    }

    #[test]
    fn test_combine_into_and_inplace_agree() {
        let a = row(&[1, 8, -3, 4]);
        let b = row(&[2, 5, -7, 4]);
        let r = a.bounds().clone();
        let policy = ExecPolicy::serial();

        let mut fresh = Store::filled(r.clone(), 0);
        combine_into(
            &Max,
            &mut fresh.view_mut(&r, Privilege::WriteDiscard).unwrap(),
            &a.view(&r).unwrap(),
            &b.view(&r).unwrap(),
            &policy,
        )
        .unwrap();
        assert_eq!(fresh.data(), &[2, 8, -3, 4]);

        let mut acc = a.clone();
        combine_inplace(
            &Max,
            &mut acc.view_mut(&r, Privilege::ReadWrite).unwrap(),
            &b.view(&r).unwrap(),
            &policy,
        )
        .unwrap();
        assert_eq!(acc.data(), fresh.data());
    }

    #[test]
    fn test_broadcast_variants() {
        let a = row(&[1, 8, -3, 4]);
        let r = a.bounds().clone();
        let policy = ExecPolicy::serial();

        let mut fresh = Store::filled(r.clone(), 0);
        combine_broadcast_into(
            &Prod,
            &mut fresh.view_mut(&r, Privilege::WriteDiscard).unwrap(),
            &a.view(&r).unwrap(),
            -2,
            &policy,
        )
        .unwrap();
        assert_eq!(fresh.data(), &[-2, -16, 6, -8]);

        let mut acc = a.clone();
        combine_broadcast_inplace(
            &Max,
            &mut acc.view_mut(&r, Privilege::ReadWrite).unwrap(),
            3,
            &policy,
        )
        .unwrap();
        assert_eq!(acc.data(), &[3, 8, 3, 4]);
    }

    #[test]
    fn test_inplace_rejects_write_discard() {
        let mut acc = row(&[1, 2]);
        let r = acc.bounds().clone();
        let err = combine_broadcast_inplace(
            &Max,
            &mut acc.view_mut(&r, Privilege::WriteDiscard).unwrap(),
            3,
            &ExecPolicy::serial(),
        )
        .unwrap_err();
        assert!(matches!(err, UfuncError::PrivilegeMismatch { .. }));
    }

    #[test]
    fn test_combine_scalars() {
        assert_eq!(combine_scalars(&Max, 7u8, 9), 9);
        assert!(combine_scalars(&Max, f32::NAN, 1.0).is_nan());
    }
}
