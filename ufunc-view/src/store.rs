//! Owned row-major backing allocations.

use smallvec::smallvec;

use crate::rect::{Rect, Strides};
use crate::{Result, UfuncError};

/// Compute row-major strides (last index varies fastest).
pub fn row_major_strides(extents: &[usize]) -> Strides {
    let rank = extents.len();
    let mut strides: Strides = smallvec![1isize; rank];
    for i in (0..rank.saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * extents[i + 1] as isize;
    }
    strides
}

/// Densely packed, row-major allocation covering `bounds`.
///
/// A store stands in for one physical region instance: task bodies never
/// see it directly, only [`OperandView`](crate::OperandView)s cut out of it.
pub struct Store<T> {
    data: Vec<T>,
    bounds: Rect,
    strides: Strides,
}

impl<T: std::fmt::Debug> std::fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("bounds", &self.bounds)
            .field("strides", &self.strides)
            .field("data", &self.data)
            .finish()
    }
}

impl<T: Clone> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            bounds: self.bounds.clone(),
            strides: self.strides.clone(),
        }
    }
}

impl<T: Clone> Store<T> {
    /// Store with every element set to `value`.
    pub fn filled(bounds: Rect, value: T) -> Self {
        let strides = row_major_strides(&bounds.extents());
        let data = vec![value; bounds.volume()];
        Self {
            data,
            bounds,
            strides,
        }
    }
}

impl<T> Store<T> {
    /// Wrap row-major `data` covering `bounds`.
    pub fn from_vec(bounds: Rect, data: Vec<T>) -> Result<Self> {
        let volume = bounds.volume();
        if data.len() != volume {
            return Err(UfuncError::LengthMismatch {
                len: data.len(),
                volume,
            });
        }
        let strides = row_major_strides(&bounds.extents());
        Ok(Self {
            data,
            bounds,
            strides,
        })
    }

    /// Store whose element at each point is `f(point)`.
    pub fn from_fn(bounds: Rect, mut f: impl FnMut(&[i64]) -> T) -> Self {
        let strides = row_major_strides(&bounds.extents());
        let data = bounds.points().map(|p| f(&p)).collect();
        Self {
            data,
            bounds,
            strides,
        }
    }

    #[inline]
    pub fn bounds(&self) -> &Rect {
        &self.bounds
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.bounds.dim()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Row-major data.
    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    fn linear_index(&self, point: &[i64]) -> usize {
        assert!(
            self.bounds.contains_point(point),
            "point {:?} out of bounds {:?}",
            point,
            self.bounds
        );
        point
            .iter()
            .zip(self.bounds.lo())
            .zip(self.strides.iter())
            .map(|((&p, &lo), &s)| (p - lo) as isize * s)
            .sum::<isize>() as usize
    }

    /// Element offset and strides of a window over this store.
    ///
    /// With `slice = Some((axis, coord))` the store must have one more
    /// dimension than `rect`; `axis` is fixed at `coord` and dropped from
    /// the returned strides. Empty windows are not bounds-checked.
    pub(crate) fn window(&self, rect: &Rect, slice: Option<(usize, i64)>) -> Result<(isize, Strides)> {
        let (full, strides) = match slice {
            Some((axis, coord)) => {
                if self.dim() != rect.dim() + 1 {
                    return Err(UfuncError::RankMismatch(rect.dim() + 1, self.dim()));
                }
                if axis >= self.dim() {
                    return Err(UfuncError::InvalidAxis {
                        axis,
                        rank: self.dim(),
                    });
                }
                let full = rect.insert_axis(axis, coord, coord)?;
                let mut strides: Strides = self.strides.clone();
                strides.remove(axis);
                (full, strides)
            }
            None => {
                if self.dim() != rect.dim() {
                    return Err(UfuncError::RankMismatch(rect.dim(), self.dim()));
                }
                (rect.clone(), self.strides.clone())
            }
        };
        if rect.is_empty() {
            return Ok((0, strides));
        }
        if !self.bounds.contains(&full) {
            return Err(UfuncError::OutOfBounds {
                rect: full,
                bounds: self.bounds.clone(),
            });
        }
        Ok((self.linear_index(full.lo()) as isize, strides))
    }
}

impl<T: Copy> Store<T> {
    /// Element at `point`. Panics if `point` is outside the bounds.
    pub fn get(&self, point: &[i64]) -> T {
        self.data[self.linear_index(point)]
    }

    /// Set the element at `point`. Panics if `point` is outside the bounds.
    pub fn set(&mut self, point: &[i64], value: T) {
        let idx = self.linear_index(point);
        self.data[idx] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_strides() {
        assert_eq!(row_major_strides(&[2, 3, 4]).as_slice(), &[12, 4, 1]);
        assert_eq!(row_major_strides(&[5]).as_slice(), &[1]);
        assert!(row_major_strides(&[]).is_empty());
    }

    #[test]
    fn test_from_fn_and_get() {
        let bounds = Rect::new(&[1, 10], &[2, 12]).unwrap();
        let store = Store::from_fn(bounds, |p| p[0] * 100 + p[1]);
        assert_eq!(store.len(), 6);
        assert_eq!(store.data(), &[110, 111, 112, 210, 211, 212]);
        assert_eq!(store.get(&[2, 11]), 211);
    }

    #[test]
    fn test_from_vec_length_check() {
        let bounds = Rect::from_extents(&[2, 2]).unwrap();
        assert_eq!(
            Store::from_vec(bounds, vec![1, 2, 3]).unwrap_err(),
            UfuncError::LengthMismatch { len: 3, volume: 4 }
        );
    }

    #[test]
    fn test_window_offsets() {
        let store = Store::filled(Rect::from_extents(&[4, 5, 6]).unwrap(), 0u8);
        let rect = Rect::new(&[1, 2], &[3, 4]).unwrap();
        let (offset, strides) = store.window(&rect, Some((1, 3))).unwrap();
        assert_eq!(strides.as_slice(), &[30, 1]);
        assert_eq!(offset, 30 + 3 * 6 + 2);

        let err = store.window(&rect, Some((1, 5))).unwrap_err();
        assert!(matches!(err, UfuncError::OutOfBounds { .. }));
        assert!(matches!(
            store.window(&rect, None),
            Err(UfuncError::RankMismatch(2, 3))
        ));
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_get_out_of_bounds_panics() {
        let store = Store::filled(Rect::from_extents(&[3]).unwrap(), 1.0f64);
        let _ = store.get(&[3]);
    }
}
