//! Elementwise map operations on operand views.
//!
//! These are the building blocks of the combine and init passes: every
//! operand shares one rectangle, and the destination is written exactly once
//! per point, so the parallel path may split any dimension.

use smallvec::SmallVec;
use ufunc_view::{OperandView, OperandViewMut, Privilege, Strides};

use crate::kernel::{compute_costs, ensure_same_rect, for_each_run_with_policy};
use crate::maybe_sync::{MaybeSendSync, MaybeSync};
use crate::policy::ExecPolicy;
use crate::threading::SendPtr;
use crate::Result;

// ============================================================================
// Stride-specialized inner loops
//
// When every inner stride is 1 the run is handed to slice iteration so LLVM
// can vectorize it.
// ============================================================================

#[inline(always)]
unsafe fn inner_loop_fill<D: Copy>(dp: *mut D, ds: isize, len: usize, value: D) {
    if ds == 1 {
        std::slice::from_raw_parts_mut(dp, len).fill(value);
    } else {
        for i in 0..len as isize {
            *dp.offset(i * ds) = value;
        }
    }
}

/// `dest[i] = f(dest[i])`.
#[inline(always)]
unsafe fn inner_loop_update<D: Copy>(dp: *mut D, ds: isize, len: usize, f: &impl Fn(D) -> D) {
    if ds == 1 {
        for d in std::slice::from_raw_parts_mut(dp, len) {
            *d = f(*d);
        }
    } else {
        for i in 0..len as isize {
            let p = dp.offset(i * ds);
            *p = f(*p);
        }
    }
}

/// `dest[i] = f(src[i])`.
#[inline(always)]
unsafe fn inner_loop_map1<D: Copy, A: Copy>(
    dp: *mut D,
    ds: isize,
    sp: *const A,
    ss: isize,
    len: usize,
    f: &impl Fn(A) -> D,
) {
    if ds == 1 && ss == 1 {
        let dst = std::slice::from_raw_parts_mut(dp, len);
        let src = std::slice::from_raw_parts(sp, len);
        for (d, s) in dst.iter_mut().zip(src.iter()) {
            *d = f(*s);
        }
    } else {
        for i in 0..len as isize {
            *dp.offset(i * ds) = f(*sp.offset(i * ss));
        }
    }
}

/// `dest[i] = f(dest[i], src[i])`.
#[inline(always)]
unsafe fn inner_loop_update1<D: Copy, A: Copy>(
    dp: *mut D,
    ds: isize,
    sp: *const A,
    ss: isize,
    len: usize,
    f: &impl Fn(D, A) -> D,
) {
    if ds == 1 && ss == 1 {
        let dst = std::slice::from_raw_parts_mut(dp, len);
        let src = std::slice::from_raw_parts(sp, len);
        for (d, s) in dst.iter_mut().zip(src.iter()) {
            *d = f(*d, *s);
        }
    } else {
        for i in 0..len as isize {
            let p = dp.offset(i * ds);
            *p = f(*p, *sp.offset(i * ss));
        }
    }
}

/// `dest[i] = f(a[i], b[i])`.
#[inline(always)]
#[allow(clippy::too_many_arguments)]
unsafe fn inner_loop_map2<D: Copy, A: Copy, B: Copy>(
    dp: *mut D,
    ds: isize,
    ap: *const A,
    a_s: isize,
    bp: *const B,
    b_s: isize,
    len: usize,
    f: &impl Fn(A, B) -> D,
) {
    if ds == 1 && a_s == 1 && b_s == 1 {
        let dst = std::slice::from_raw_parts_mut(dp, len);
        let src_a = std::slice::from_raw_parts(ap, len);
        let src_b = std::slice::from_raw_parts(bp, len);
        for i in 0..len {
            dst[i] = f(src_a[i], src_b[i]);
        }
    } else {
        for i in 0..len as isize {
            *dp.offset(i * ds) = f(*ap.offset(i * a_s), *bp.offset(i * b_s));
        }
    }
}

fn strides_of(s: &[isize]) -> Strides {
    SmallVec::from_slice(s)
}

/// Write `value` to every element of `dest`.
pub fn fill_into<D: Copy + MaybeSendSync>(
    dest: &mut OperandViewMut<'_, D>,
    value: D,
    policy: &ExecPolicy,
) -> Result<()> {
    if dest.is_empty() {
        return Ok(());
    }
    let dims = dest.extents();
    let strides_list = [strides_of(dest.strides())];
    let costs = compute_costs(&strides_list);
    let dst = SendPtr(dest.as_mut_ptr());

    for_each_run_with_policy(policy, &dims, &strides_list, &[0], &costs, &|offsets, len, inner| unsafe {
        inner_loop_fill(dst.as_ptr().offset(offsets[0]), inner[0], len, value)
    });
    Ok(())
}

/// Apply `f` to every element of a read-write `dest` in place.
pub fn update_with<D: Copy + MaybeSendSync>(
    dest: &mut OperandViewMut<'_, D>,
    f: impl Fn(D) -> D + MaybeSync,
    policy: &ExecPolicy,
) -> Result<()> {
    if dest.is_empty() {
        return Ok(());
    }
    dest.require(Privilege::ReadWrite)?;
    let dims = dest.extents();
    let strides_list = [strides_of(dest.strides())];
    let costs = compute_costs(&strides_list);
    let dst = SendPtr(dest.as_mut_ptr());

    for_each_run_with_policy(policy, &dims, &strides_list, &[0], &costs, &|offsets, len, inner| unsafe {
        inner_loop_update(dst.as_ptr().offset(offsets[0]), inner[0], len, &f)
    });
    Ok(())
}

/// Apply a function element-wise from `src` to `dest`.
pub fn map_into<D: Copy + MaybeSendSync, A: Copy + MaybeSendSync>(
    dest: &mut OperandViewMut<'_, D>,
    src: &OperandView<'_, A>,
    f: impl Fn(A) -> D + MaybeSync,
    policy: &ExecPolicy,
) -> Result<()> {
    if dest.is_empty() {
        return Ok(());
    }
    ensure_same_rect(dest.rect(), src.rect())?;
    let dims = dest.extents();
    let strides_list = [strides_of(dest.strides()), strides_of(src.strides())];
    let costs = compute_costs(&strides_list);
    let dst = SendPtr(dest.as_mut_ptr());
    let sp = SendPtr(src.ptr() as *mut A);

    for_each_run_with_policy(policy, &dims, &strides_list, &[0, 0], &costs, &|offsets, len, inner| unsafe {
        inner_loop_map1(
            dst.as_ptr().offset(offsets[0]),
            inner[0],
            sp.as_const().offset(offsets[1]),
            inner[1],
            len,
            &f,
        )
    });
    Ok(())
}

/// `dest[i] = f(dest[i], src[i])` on a read-write `dest`.
pub fn update_into<D: Copy + MaybeSendSync, A: Copy + MaybeSendSync>(
    dest: &mut OperandViewMut<'_, D>,
    src: &OperandView<'_, A>,
    f: impl Fn(D, A) -> D + MaybeSync,
    policy: &ExecPolicy,
) -> Result<()> {
    if dest.is_empty() {
        return Ok(());
    }
    dest.require(Privilege::ReadWrite)?;
    ensure_same_rect(dest.rect(), src.rect())?;
    let dims = dest.extents();
    let strides_list = [strides_of(dest.strides()), strides_of(src.strides())];
    let costs = compute_costs(&strides_list);
    let dst = SendPtr(dest.as_mut_ptr());
    let sp = SendPtr(src.ptr() as *mut A);

    for_each_run_with_policy(policy, &dims, &strides_list, &[0, 0], &costs, &|offsets, len, inner| unsafe {
        inner_loop_update1(
            dst.as_ptr().offset(offsets[0]),
            inner[0],
            sp.as_const().offset(offsets[1]),
            inner[1],
            len,
            &f,
        )
    });
    Ok(())
}

/// Binary element-wise operation: `dest[i] = f(a[i], b[i])`.
pub fn zip_map2_into<D: Copy + MaybeSendSync, A: Copy + MaybeSendSync, B: Copy + MaybeSendSync>(
    dest: &mut OperandViewMut<'_, D>,
    a: &OperandView<'_, A>,
    b: &OperandView<'_, B>,
    f: impl Fn(A, B) -> D + MaybeSync,
    policy: &ExecPolicy,
) -> Result<()> {
    if dest.is_empty() {
        return Ok(());
    }
    ensure_same_rect(dest.rect(), a.rect())?;
    ensure_same_rect(dest.rect(), b.rect())?;
    let dims = dest.extents();
    let strides_list = [
        strides_of(dest.strides()),
        strides_of(a.strides()),
        strides_of(b.strides()),
    ];
    let costs = compute_costs(&strides_list);
    let dst = SendPtr(dest.as_mut_ptr());
    let ap = SendPtr(a.ptr() as *mut A);
    let bp = SendPtr(b.ptr() as *mut B);

    for_each_run_with_policy(policy, &dims, &strides_list, &[0, 0, 0], &costs, &|offsets, len, inner| unsafe {
        inner_loop_map2(
            dst.as_ptr().offset(offsets[0]),
            inner[0],
            ap.as_const().offset(offsets[1]),
            inner[1],
            bp.as_const().offset(offsets[2]),
            inner[2],
            len,
            &f,
        )
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ufunc_view::{Rect, Store, UfuncError};

    fn rect(lo: &[i64], hi: &[i64]) -> Rect {
        Rect::new(lo, hi).unwrap()
    }

    #[test]
    fn test_fill_into_subrect() {
        let mut store = Store::filled(rect(&[0, 0], &[3, 3]), 0i32);
        let inner = rect(&[1, 1], &[2, 3]);
        fill_into(
            &mut store.view_mut(&inner, Privilege::WriteDiscard).unwrap(),
            7,
            &ExecPolicy::serial(),
        )
        .unwrap();
        for p in store.bounds().clone().points() {
            let expected = if inner.contains_point(&p) { 7 } else { 0 };
            assert_eq!(store.get(&p), expected, "{p:?}");
        }
    }

    #[test]
    fn test_map_into_slice_to_plain() {
        let stacked = Store::from_fn(rect(&[0, 0, 0], &[2, 1, 2]), |p| (p[0] * 10 + p[1] * 3 + p[2]) as f64);
        let r = rect(&[0, 0], &[1, 2]);
        let src = stacked.view_slice(&r, 0, 2).unwrap();
        let mut out = Store::filled(r.clone(), 0.0);
        map_into(
            &mut out.view_mut(&r, Privilege::WriteDiscard).unwrap(),
            &src,
            |x| x * 2.0,
            &ExecPolicy::serial(),
        )
        .unwrap();
        assert_eq!(out.data(), &[40.0, 42.0, 44.0, 46.0, 48.0, 50.0]);
    }

    #[test]
    fn test_update_requires_read_write() {
        let mut store = Store::filled(rect(&[0], &[3]), 1u8);
        let r = store.bounds().clone();
        let err = update_with(
            &mut store.view_mut(&r, Privilege::WriteDiscard).unwrap(),
            |x| x + 1,
            &ExecPolicy::serial(),
        )
        .unwrap_err();
        assert!(matches!(err, UfuncError::PrivilegeMismatch { .. }));
        update_with(
            &mut store.view_mut(&r, Privilege::ReadWrite).unwrap(),
            |x| x + 1,
            &ExecPolicy::serial(),
        )
        .unwrap();
        assert_eq!(store.data(), &[2, 2, 2, 2]);
    }

    #[test]
    fn test_zip_map2_rect_mismatch() {
        let a = Store::filled(rect(&[0, 0], &[1, 1]), 1i64);
        let b = Store::filled(rect(&[0, 0], &[1, 2]), 1i64);
        let mut out = Store::filled(rect(&[0, 0], &[1, 1]), 0i64);
        let r = out.bounds().clone();
        let err = zip_map2_into(
            &mut out.view_mut(&r, Privilege::WriteDiscard).unwrap(),
            &a.view(a.bounds()).unwrap(),
            &b.view(b.bounds()).unwrap(),
            |x, y| x + y,
            &ExecPolicy::serial(),
        )
        .unwrap_err();
        assert!(matches!(err, UfuncError::RectMismatch(_, _)));
    }

    #[test]
    fn test_empty_dest_is_untouched() {
        let src = Store::filled(rect(&[0], &[3]), 5i32);
        let mut out = Store::filled(rect(&[0], &[3]), -1i32);
        let empty = rect(&[2], &[1]);
        update_into(
            &mut out.view_mut(&empty, Privilege::ReadWrite).unwrap(),
            &src.view(&empty).unwrap(),
            |a, b| a + b,
            &ExecPolicy::parallel().with_min_parallel_len(0),
        )
        .unwrap();
        assert_eq!(out.data(), &[-1, -1, -1, -1]);
    }
}
