//! Inclusive N-dimensional index rectangles.

use smallvec::SmallVec;

use crate::{Result, UfuncError};

/// Largest rank of a task array.
pub const MAX_DIM: usize = 3;

/// Largest rank of a backing allocation: a task array plus one stacking axis.
pub const MAX_ALLOC_DIM: usize = MAX_DIM + 1;

/// Per-dimension coordinates.
pub type Coords = SmallVec<[i64; MAX_ALLOC_DIM]>;

/// Per-dimension extents.
pub type Extents = SmallVec<[usize; MAX_ALLOC_DIM]>;

/// Per-dimension element strides.
pub type Strides = SmallVec<[isize; MAX_ALLOC_DIM]>;

pub(crate) fn check_alloc_rank(rank: usize) -> Result<()> {
    if rank == 0 || rank > MAX_ALLOC_DIM {
        return Err(UfuncError::UnsupportedRank {
            rank,
            min: 1,
            max: MAX_ALLOC_DIM,
        });
    }
    Ok(())
}

/// Axis-aligned rectangle with one inclusive `[lo, hi]` pair per dimension.
///
/// The rectangle is empty when `lo[d] > hi[d]` for any `d`. Empty
/// rectangles are valid values; they contain no points.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Rect {
    lo: Coords,
    hi: Coords,
}

impl Rect {
    pub fn new(lo: &[i64], hi: &[i64]) -> Result<Self> {
        if lo.len() != hi.len() {
            return Err(UfuncError::RankMismatch(lo.len(), hi.len()));
        }
        check_alloc_rank(lo.len())?;
        Ok(Self {
            lo: SmallVec::from_slice(lo),
            hi: SmallVec::from_slice(hi),
        })
    }

    /// Rectangle `[0, extent - 1]` in each dimension.
    pub fn from_extents(extents: &[usize]) -> Result<Self> {
        let lo: Coords = extents.iter().map(|_| 0).collect();
        let hi: Coords = extents.iter().map(|&e| e as i64 - 1).collect();
        Self::new(&lo, &hi)
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.lo.len()
    }

    #[inline]
    pub fn lo(&self) -> &[i64] {
        &self.lo
    }

    #[inline]
    pub fn hi(&self) -> &[i64] {
        &self.hi
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lo.iter().zip(self.hi.iter()).any(|(l, h)| l > h)
    }

    /// Number of points along `axis` (0 if that dimension is empty).
    #[inline]
    pub fn extent(&self, axis: usize) -> usize {
        let (lo, hi) = (self.lo[axis], self.hi[axis]);
        if hi < lo {
            0
        } else {
            (hi - lo + 1) as usize
        }
    }

    pub fn extents(&self) -> Extents {
        (0..self.dim()).map(|d| self.extent(d)).collect()
    }

    /// Number of points in the rectangle.
    pub fn volume(&self) -> usize {
        (0..self.dim()).map(|d| self.extent(d)).product()
    }

    pub fn contains_point(&self, point: &[i64]) -> bool {
        point.len() == self.dim()
            && point
                .iter()
                .zip(self.lo.iter().zip(self.hi.iter()))
                .all(|(p, (lo, hi))| lo <= p && p <= hi)
    }

    /// True when every point of `other` lies in `self`. An empty `other` of
    /// the same rank is always contained.
    pub fn contains(&self, other: &Rect) -> bool {
        if other.dim() != self.dim() {
            return false;
        }
        other.is_empty()
            || (0..self.dim()).all(|d| self.lo[d] <= other.lo[d] && other.hi[d] <= self.hi[d])
    }

    /// Rectangle with `axis` dropped.
    pub fn remove_axis(&self, axis: usize) -> Result<Rect> {
        if axis >= self.dim() {
            return Err(UfuncError::InvalidAxis {
                axis,
                rank: self.dim(),
            });
        }
        let mut lo = self.lo.clone();
        let mut hi = self.hi.clone();
        lo.remove(axis);
        hi.remove(axis);
        check_alloc_rank(lo.len())?;
        Ok(Rect { lo, hi })
    }

    /// Rectangle with a new `[lo, hi]` axis inserted before position `axis`.
    pub fn insert_axis(&self, axis: usize, lo: i64, hi: i64) -> Result<Rect> {
        if axis > self.dim() {
            return Err(UfuncError::InvalidAxis {
                axis,
                rank: self.dim(),
            });
        }
        check_alloc_rank(self.dim() + 1)?;
        let mut new_lo = self.lo.clone();
        let mut new_hi = self.hi.clone();
        new_lo.insert(axis, lo);
        new_hi.insert(axis, hi);
        Ok(Rect {
            lo: new_lo,
            hi: new_hi,
        })
    }

    /// Row-major iterator over all points (last axis fastest).
    pub fn points(&self) -> Points<'_> {
        let next = if self.is_empty() {
            None
        } else {
            Some(self.lo.clone())
        };
        Points { rect: self, next }
    }
}

impl std::fmt::Debug for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[")?;
        for d in 0..self.dim() {
            if d > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}..={}", self.lo[d], self.hi[d])?;
        }
        f.write_str("]")
    }
}

/// Row-major point iterator returned by [`Rect::points`].
pub struct Points<'a> {
    rect: &'a Rect,
    next: Option<Coords>,
}

impl Iterator for Points<'_> {
    type Item = Coords;

    fn next(&mut self) -> Option<Coords> {
        let current = self.next.take()?;
        let mut succ = current.clone();
        let mut axis = self.rect.dim();
        while axis > 0 {
            axis -= 1;
            if succ[axis] < self.rect.hi[axis] {
                succ[axis] += 1;
                self.next = Some(succ);
                break;
            }
            succ[axis] = self.rect.lo[axis];
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_volume() {
        let r = Rect::new(&[0, 2], &[3, 4]).unwrap();
        assert!(!r.is_empty());
        assert_eq!(r.volume(), 12);
        assert_eq!(r.extents().as_slice(), &[4, 3]);

        let e = Rect::new(&[1, 0], &[0, 5]).unwrap();
        assert!(e.is_empty());
        assert_eq!(e.volume(), 0);
        assert_eq!(e.points().count(), 0);
    }

    #[test]
    fn test_rank_limits() {
        assert!(matches!(
            Rect::new(&[], &[]),
            Err(UfuncError::UnsupportedRank { rank: 0, .. })
        ));
        assert!(Rect::new(&[0; 4], &[1; 4]).is_ok());
        assert!(Rect::new(&[0; 5], &[1; 5]).is_err());
        assert_eq!(
            Rect::new(&[0, 0], &[1]),
            Err(UfuncError::RankMismatch(2, 1))
        );
    }

    #[test]
    fn test_points_row_major() {
        let r = Rect::new(&[1, -1], &[2, 0]).unwrap();
        let pts: Vec<Vec<i64>> = r.points().map(|p| p.to_vec()).collect();
        assert_eq!(pts, vec![vec![1, -1], vec![1, 0], vec![2, -1], vec![2, 0]]);
    }

    #[test]
    fn test_contains() {
        let outer = Rect::new(&[0, 0], &[9, 9]).unwrap();
        let inner = Rect::new(&[2, 3], &[4, 9]).unwrap();
        let outside = Rect::new(&[2, 3], &[4, 10]).unwrap();
        let empty = Rect::new(&[20, 20], &[19, 19]).unwrap();
        assert!(outer.contains(&inner));
        assert!(!outer.contains(&outside));
        assert!(outer.contains(&empty));
        assert!(!outer.contains(&Rect::new(&[0], &[1]).unwrap()));
        assert!(inner.contains_point(&[4, 9]));
        assert!(!inner.contains_point(&[5, 9]));
    }

    #[test]
    fn test_insert_remove_axis() {
        let r = Rect::new(&[0, 5], &[3, 7]).unwrap();
        let grown = r.insert_axis(1, 10, 12).unwrap();
        assert_eq!(grown.lo(), &[0, 10, 5]);
        assert_eq!(grown.hi(), &[3, 12, 7]);
        assert_eq!(grown.remove_axis(1).unwrap(), r);
        assert_eq!(
            r.remove_axis(2),
            Err(UfuncError::InvalidAxis { axis: 2, rank: 2 })
        );
        assert!(Rect::new(&[0], &[3]).unwrap().remove_axis(0).is_err());
    }

    #[test]
    fn test_debug_format() {
        let r = Rect::new(&[0, -2], &[4, 2]).unwrap();
        assert_eq!(format!("{r:?}"), "[0..=4, -2..=2]");
    }
}
