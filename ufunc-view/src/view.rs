//! Borrowed operand views over a [`Store`].
//!
//! - [`OperandView`]: read access over a rectangle
//! - [`OperandViewMut`]: write-discard or read-write access over a rectangle
//!
//! A view addresses elements by global coordinates inside its rectangle. Its
//! pointer refers to the element at `rect.lo()`, so kernel offsets are
//! relative to the rectangle's low corner.

use std::marker::PhantomData;

use crate::rect::{Extents, Rect, Strides};
use crate::store::Store;
use crate::{Result, UfuncError};

/// Access mode of a region binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Privilege {
    ReadOnly,
    /// Write-only; prior contents are discarded and must not be read.
    WriteDiscard,
    ReadWrite,
}

impl Privilege {
    #[inline]
    pub fn can_read(self) -> bool {
        !matches!(self, Privilege::WriteDiscard)
    }

    #[inline]
    pub fn can_write(self) -> bool {
        !matches!(self, Privilege::ReadOnly)
    }
}

#[inline]
fn offset_in(rect: &Rect, strides: &[isize], point: &[i64]) -> isize {
    point
        .iter()
        .zip(rect.lo())
        .zip(strides)
        .map(|((&p, &lo), &s)| (p - lo) as isize * s)
        .sum()
}

// ============================================================================
// OperandView
// ============================================================================

/// Read-only strided view of a rectangle.
pub struct OperandView<'a, T> {
    ptr: *const T,
    rect: Rect,
    strides: Strides,
    _marker: PhantomData<&'a [T]>,
}

unsafe impl<T: Sync> Send for OperandView<'_, T> {}
unsafe impl<T: Sync> Sync for OperandView<'_, T> {}

impl<T> Clone for OperandView<'_, T> {
    fn clone(&self) -> Self {
        Self {
            ptr: self.ptr,
            rect: self.rect.clone(),
            strides: self.strides.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for OperandView<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperandView")
            .field("rect", &self.rect)
            .field("strides", &self.strides)
            .finish()
    }
}

impl<'a, T> OperandView<'a, T> {
    #[inline]
    pub fn rect(&self) -> &Rect {
        &self.rect
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.rect.dim()
    }

    #[inline]
    pub fn extents(&self) -> Extents {
        self.rect.extents()
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rect.volume()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rect.is_empty()
    }

    /// Pointer to the element at `rect().lo()`.
    #[inline]
    pub fn ptr(&self) -> *const T {
        self.ptr
    }

    /// Element offset of `point` from [`ptr`](Self::ptr). Not bounds-checked.
    #[inline]
    pub fn offset_of(&self, point: &[i64]) -> isize {
        offset_in(&self.rect, &self.strides, point)
    }
}

impl<T: Copy> OperandView<'_, T> {
    /// Element at `point`. Panics if `point` is outside the rectangle.
    pub fn get(&self, point: &[i64]) -> T {
        assert!(
            self.rect.contains_point(point),
            "point {:?} out of bounds {:?}",
            point,
            self.rect
        );
        unsafe { *self.ptr.offset(self.offset_of(point)) }
    }
}

// ============================================================================
// OperandViewMut
// ============================================================================

/// Writable strided view of a rectangle.
///
/// Carries the privilege it was created with; `WriteDiscard` views are never
/// read by the kernels.
pub struct OperandViewMut<'a, T> {
    ptr: *mut T,
    rect: Rect,
    strides: Strides,
    privilege: Privilege,
    _marker: PhantomData<&'a mut [T]>,
}

unsafe impl<T: Send> Send for OperandViewMut<'_, T> {}

impl<T> std::fmt::Debug for OperandViewMut<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperandViewMut")
            .field("rect", &self.rect)
            .field("strides", &self.strides)
            .field("privilege", &self.privilege)
            .finish()
    }
}

impl<'a, T> OperandViewMut<'a, T> {
    #[inline]
    pub fn rect(&self) -> &Rect {
        &self.rect
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.rect.dim()
    }

    #[inline]
    pub fn extents(&self) -> Extents {
        self.rect.extents()
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rect.volume()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rect.is_empty()
    }

    #[inline]
    pub fn privilege(&self) -> Privilege {
        self.privilege
    }

    /// Mutable pointer to the element at `rect().lo()`.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr
    }

    /// Element offset of `point` from the base pointer. Not bounds-checked.
    #[inline]
    pub fn offset_of(&self, point: &[i64]) -> isize {
        offset_in(&self.rect, &self.strides, point)
    }

    /// Fail unless this view grants `required` access.
    pub fn require(&self, required: Privilege) -> Result<()> {
        let ok = match required {
            Privilege::ReadOnly => self.privilege.can_read(),
            Privilege::WriteDiscard => self.privilege.can_write(),
            Privilege::ReadWrite => self.privilege == Privilege::ReadWrite,
        };
        if ok {
            Ok(())
        } else {
            Err(UfuncError::PrivilegeMismatch {
                required,
                actual: self.privilege,
            })
        }
    }

    /// Read-only reborrow. Fails on a `WriteDiscard` view.
    pub fn as_view(&self) -> Result<OperandView<'_, T>> {
        self.require(Privilege::ReadOnly)?;
        Ok(OperandView {
            ptr: self.ptr as *const T,
            rect: self.rect.clone(),
            strides: self.strides.clone(),
            _marker: PhantomData,
        })
    }

    /// Reborrow with a zero-stride axis `[lo, hi]` inserted before `axis`.
    ///
    /// Every coordinate along the new axis aliases the same element, which
    /// lets a higher-rank iteration fold into this lower-rank view.
    pub fn broadcast_axis(&mut self, axis: usize, lo: i64, hi: i64) -> Result<OperandViewMut<'_, T>> {
        let rect = self.rect.insert_axis(axis, lo, hi)?;
        let mut strides = self.strides.clone();
        strides.insert(axis, 0);
        Ok(OperandViewMut {
            ptr: self.ptr,
            rect,
            strides,
            privilege: self.privilege,
            _marker: PhantomData,
        })
    }
}

impl<T: Copy> OperandViewMut<'_, T> {
    /// Element at `point`. Panics if out of bounds or not readable.
    pub fn get(&self, point: &[i64]) -> T {
        assert!(self.privilege.can_read(), "view is write-discard");
        assert!(
            self.rect.contains_point(point),
            "point {:?} out of bounds {:?}",
            point,
            self.rect
        );
        unsafe { *self.ptr.offset(self.offset_of(point)) }
    }

    /// Set the element at `point`. Panics if `point` is out of bounds.
    pub fn set(&mut self, point: &[i64], value: T) {
        assert!(
            self.rect.contains_point(point),
            "point {:?} out of bounds {:?}",
            point,
            self.rect
        );
        unsafe { *self.ptr.offset(self.offset_of(point)) = value };
    }
}

// ============================================================================
// Store constructors
// ============================================================================

impl<T> Store<T> {
    /// Read-only view of `rect`.
    pub fn view(&self, rect: &Rect) -> Result<OperandView<'_, T>> {
        self.view_impl(rect, None)
    }

    /// Read-only view of `rect` in the slice `axis == coord` of this store.
    ///
    /// The store must have rank `rect.dim() + 1`.
    pub fn view_slice(&self, rect: &Rect, axis: usize, coord: i64) -> Result<OperandView<'_, T>> {
        self.view_impl(rect, Some((axis, coord)))
    }

    /// Writable view of `rect` with the given privilege.
    pub fn view_mut(&mut self, rect: &Rect, privilege: Privilege) -> Result<OperandViewMut<'_, T>> {
        self.view_mut_impl(rect, None, privilege)
    }

    /// Writable view of `rect` in the slice `axis == coord` of this store.
    pub fn view_mut_slice(
        &mut self,
        rect: &Rect,
        axis: usize,
        coord: i64,
        privilege: Privilege,
    ) -> Result<OperandViewMut<'_, T>> {
        self.view_mut_impl(rect, Some((axis, coord)), privilege)
    }

    pub(crate) fn view_impl(&self, rect: &Rect, slice: Option<(usize, i64)>) -> Result<OperandView<'_, T>> {
        let (offset, strides) = self.window(rect, slice)?;
        let ptr = unsafe { self.data().as_ptr().offset(offset) };
        Ok(OperandView {
            ptr,
            rect: rect.clone(),
            strides,
            _marker: PhantomData,
        })
    }

    pub(crate) fn view_mut_impl(
        &mut self,
        rect: &Rect,
        slice: Option<(usize, i64)>,
        privilege: Privilege,
    ) -> Result<OperandViewMut<'_, T>> {
        if !privilege.can_write() {
            return Err(UfuncError::PrivilegeMismatch {
                required: Privilege::WriteDiscard,
                actual: privilege,
            });
        }
        let (offset, strides) = self.window(rect, slice)?;
        let ptr = unsafe { self.data_mut().as_mut_ptr().offset(offset) };
        Ok(OperandViewMut {
            ptr,
            rect: rect.clone(),
            strides,
            privilege,
            _marker: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(extents: &[usize]) -> Store<i64> {
        Store::from_fn(Rect::from_extents(extents).unwrap(), |p| {
            p.iter().fold(0, |acc, &c| acc * 10 + c)
        })
    }

    #[test]
    fn test_view_reads_global_coordinates() {
        let store = grid(&[4, 5]);
        let rect = Rect::new(&[1, 2], &[3, 4]).unwrap();
        let v = store.view(&rect).unwrap();
        assert_eq!(v.get(&[1, 2]), 12);
        assert_eq!(v.get(&[3, 4]), 34);
        assert_eq!(v.strides(), &[5, 1]);
        assert_eq!(v.len(), 9);
    }

    #[test]
    fn test_view_slice_selects_stacked_entry() {
        let store = grid(&[3, 2, 4]);
        let rect = Rect::new(&[0, 0], &[1, 3]).unwrap();
        let v = store.view_slice(&rect, 0, 2).unwrap();
        assert_eq!(v.get(&[1, 3]), 213);
        let rect = Rect::new(&[0, 0], &[2, 1]).unwrap();
        let v = store.view_slice(&rect, 2, 1).unwrap();
        assert_eq!(v.strides(), &[8, 4]);
        assert_eq!(v.get(&[2, 1]), 211);
    }

    #[test]
    fn test_view_out_of_bounds() {
        let store = grid(&[2, 2]);
        let rect = Rect::new(&[0, 0], &[2, 1]).unwrap();
        assert!(matches!(
            store.view(&rect),
            Err(UfuncError::OutOfBounds { .. })
        ));
        // Empty windows are never bounds-checked.
        let empty = Rect::new(&[50, 0], &[49, 1]).unwrap();
        assert!(store.view(&empty).unwrap().is_empty());
    }

    #[test]
    fn test_view_mut_privileges() {
        let mut store = grid(&[2, 3]);
        let rect = store.bounds().clone();
        assert_eq!(
            store.view_mut(&rect, Privilege::ReadOnly).unwrap_err(),
            UfuncError::PrivilegeMismatch {
                required: Privilege::WriteDiscard,
                actual: Privilege::ReadOnly,
            }
        );
        let wd = store.view_mut(&rect, Privilege::WriteDiscard).unwrap();
        assert!(wd.as_view().is_err());
        assert!(wd.require(Privilege::ReadWrite).is_err());
        assert!(wd.require(Privilege::WriteDiscard).is_ok());

        let mut rw = store.view_mut(&rect, Privilege::ReadWrite).unwrap();
        rw.set(&[1, 2], -7);
        assert_eq!(rw.as_view().unwrap().get(&[1, 2]), -7);
        assert_eq!(store.get(&[1, 2]), -7);
    }

    #[test]
    fn test_broadcast_axis_aliases() {
        let mut store = Store::filled(Rect::from_extents(&[3]).unwrap(), 0i32);
        let rect = store.bounds().clone();
        let mut out = store.view_mut(&rect, Privilege::ReadWrite).unwrap();
        let mut wide = out.broadcast_axis(1, 10, 14).unwrap();
        assert_eq!(wide.strides(), &[1, 0]);
        assert_eq!(wide.rect().hi(), &[2, 14]);
        wide.set(&[2, 13], 5);
        assert_eq!(wide.get(&[2, 10]), 5);
        drop(wide);
        assert_eq!(out.get(&[2]), 5);
    }

    #[test]
    fn test_mut_slice_writes_through() {
        let mut store = Store::filled(Rect::new(&[0, 0], &[1, 2]).unwrap(), 0u32);
        let row = Rect::new(&[0], &[2]).unwrap();
        {
            let mut v = store
                .view_mut_slice(&row, 0, 1, Privilege::WriteDiscard)
                .unwrap();
            for c in 0..3 {
                v.set(&[c], 9);
            }
        }
        assert_eq!(store.data(), &[0, 0, 0, 9, 9, 9]);
    }
}
