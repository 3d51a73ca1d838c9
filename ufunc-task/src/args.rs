//! Task argument buffers.
//!
//! Arguments travel as a flat little-endian byte buffer. Every field is
//! aligned to its own size relative to the buffer start, with zero padding
//! in between:
//!
//! - a *dimension* is an `i32`; `-1` marks an absent axis
//! - a *coordinate* is an `i64`
//! - a rectangle of rank `d` is `d` lo coordinates followed by `d` hi
//!   coordinates; its rank is carried by the dimension field before it
//!
//! [`ArgSerializer`] and [`ArgDeserializer`] produce and consume this layout;
//! [`CollapseArgs`], [`ShapeArgs`] and [`RadixArgs`] are the per-task field
//! sequences built on top of them.

use smallvec::SmallVec;
use ufunc_view::{Coords, Rect, MAX_DIM};

use crate::error::{Result, TaskError};

/// Reads fields from an argument buffer in order.
pub struct ArgDeserializer<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> ArgDeserializer<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    /// Bytes consumed so far, padding included.
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn align(&mut self, alignment: usize) {
        let misalignment = self.offset % alignment;
        if misalignment != 0 {
            self.offset += alignment - misalignment;
        }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.align(N);
        let end = self.offset + N;
        let bytes = self.buffer.get(self.offset..end).ok_or(TaskError::Args {
            offset: self.offset,
            needed: N,
            len: self.buffer.len(),
        })?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        self.offset = end;
        Ok(out)
    }

    pub fn unpack_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take::<4>()?))
    }

    pub fn unpack_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.take::<8>()?))
    }

    /// A dimension field; `None` when it holds the absent marker.
    pub fn unpack_dimension(&mut self) -> Result<Option<usize>> {
        let raw = self.unpack_i32()?;
        Ok(usize::try_from(raw).ok())
    }

    /// A dimension field that must hold a task rank (1 to [`MAX_DIM`]).
    pub fn unpack_rank(&mut self) -> Result<usize> {
        let raw = self.unpack_i32()?;
        match usize::try_from(raw) {
            Ok(rank) if (1..=MAX_DIM).contains(&rank) => Ok(rank),
            _ => Err(TaskError::UnsupportedRank(raw)),
        }
    }

    /// A rectangle of the given rank.
    pub fn unpack_rect(&mut self, rank: usize) -> Result<Rect> {
        let mut lo: Coords = SmallVec::with_capacity(rank);
        for _ in 0..rank {
            lo.push(self.unpack_i64()?);
        }
        let mut hi: Coords = SmallVec::with_capacity(rank);
        for _ in 0..rank {
            hi.push(self.unpack_i64()?);
        }
        Ok(Rect::new(&lo, &hi)?)
    }

    /// A rank field followed by a rectangle of that rank.
    pub fn unpack_shape(&mut self) -> Result<Rect> {
        let rank = self.unpack_rank()?;
        self.unpack_rect(rank)
    }
}

/// Builds an argument buffer with the layout [`ArgDeserializer`] reads.
#[derive(Debug, Default, Clone)]
pub struct ArgSerializer {
    buffer: Vec<u8>,
}

impl ArgSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    fn align(&mut self, alignment: usize) {
        while self.buffer.len() % alignment != 0 {
            self.buffer.push(0);
        }
    }

    pub fn pack_i32(&mut self, value: i32) -> &mut Self {
        self.align(4);
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn pack_i64(&mut self, value: i64) -> &mut Self {
        self.align(8);
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// A dimension field; `None` writes the absent marker.
    pub fn pack_dimension(&mut self, dim: Option<usize>) -> &mut Self {
        self.pack_i32(dim.map_or(-1, |d| d as i32))
    }

    pub fn pack_rect(&mut self, rect: &Rect) -> &mut Self {
        for &lo in rect.lo() {
            self.pack_i64(lo);
        }
        for &hi in rect.hi() {
            self.pack_i64(hi);
        }
        self
    }

    /// The rectangle's rank followed by the rectangle.
    pub fn pack_shape(&mut self, rect: &Rect) -> &mut Self {
        self.pack_dimension(Some(rect.dim())).pack_rect(rect)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn finish(self) -> Vec<u8> {
        self.buffer
    }
}

/// Arguments of the axis-collapse task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollapseArgs {
    /// Input axis folded away.
    pub axis: usize,
    /// Axis of the output allocation sliced at the launch index point.
    pub collapse_dim: Option<usize>,
    /// Output rectangle initialized with the seed.
    pub init_rect: Rect,
    /// Input rectangle folded into the output.
    pub in_rect: Rect,
}

impl CollapseArgs {
    pub fn decode(buffer: &[u8]) -> Result<Self> {
        let mut de = ArgDeserializer::new(buffer);
        let raw_axis = de.unpack_i32()?;
        let axis = usize::try_from(raw_axis).map_err(|_| TaskError::InvalidAxis(raw_axis))?;
        let collapse_dim = de.unpack_dimension()?;
        let init_rect = de.unpack_shape()?;
        let in_rect = de.unpack_shape()?;
        Ok(Self {
            axis,
            collapse_dim,
            init_rect,
            in_rect,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut ser = ArgSerializer::new();
        ser.pack_i32(self.axis as i32)
            .pack_dimension(self.collapse_dim)
            .pack_shape(&self.init_rect)
            .pack_shape(&self.in_rect);
        ser.finish()
    }
}

/// Arguments of the whole-partition and combine tasks: one rectangle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeArgs {
    pub rect: Rect,
}

impl ShapeArgs {
    pub fn decode(buffer: &[u8]) -> Result<Self> {
        let rect = ArgDeserializer::new(buffer).unpack_shape()?;
        Ok(Self { rect })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut ser = ArgSerializer::new();
        ser.pack_shape(&self.rect);
        ser.finish()
    }
}

/// Arguments of the radix fan-in task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadixArgs {
    pub radix: i32,
    /// Axis of the output allocation sliced at the launch index point.
    pub extra_dim_out: Option<usize>,
    /// Stacking axis of the input allocations.
    pub extra_dim_in: Option<usize>,
    pub rect: Rect,
}

impl RadixArgs {
    pub fn decode(buffer: &[u8]) -> Result<Self> {
        let mut de = ArgDeserializer::new(buffer);
        let radix = de.unpack_i32()?;
        let extra_dim_out = de.unpack_dimension()?;
        let extra_dim_in = de.unpack_dimension()?;
        let rect = de.unpack_shape()?;
        Ok(Self {
            radix,
            extra_dim_out,
            extra_dim_in,
            rect,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut ser = ArgSerializer::new();
        ser.pack_i32(self.radix)
            .pack_dimension(self.extra_dim_out)
            .pack_dimension(self.extra_dim_in)
            .pack_shape(&self.rect);
        ser.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(lo: &[i64], hi: &[i64]) -> Rect {
        Rect::new(lo, hi).unwrap()
    }

    #[test]
    fn test_layout_is_padded_little_endian() {
        let mut ser = ArgSerializer::new();
        ser.pack_i32(2).pack_i64(-3).pack_i32(7);
        let bytes = ser.finish();
        assert_eq!(bytes.len(), 20);
        assert_eq!(&bytes[0..4], &[2, 0, 0, 0]);
        assert_eq!(&bytes[4..8], &[0, 0, 0, 0]);
        assert_eq!(&bytes[8..16], &(-3i64).to_le_bytes());
        assert_eq!(&bytes[16..20], &[7, 0, 0, 0]);

        let mut de = ArgDeserializer::new(&bytes);
        assert_eq!(de.unpack_i32().unwrap(), 2);
        assert_eq!(de.unpack_i64().unwrap(), -3);
        assert_eq!(de.unpack_i32().unwrap(), 7);
        assert_eq!(de.offset(), 20);
    }

    #[test]
    fn test_absent_dimension() {
        let mut ser = ArgSerializer::new();
        ser.pack_dimension(None).pack_dimension(Some(2));
        let bytes = ser.finish();
        assert_eq!(&bytes[0..4], &(-1i32).to_le_bytes());
        let mut de = ArgDeserializer::new(&bytes);
        assert_eq!(de.unpack_dimension().unwrap(), None);
        assert_eq!(de.unpack_dimension().unwrap(), Some(2));
    }

    #[test]
    fn test_short_buffer_is_an_error() {
        let mut de = ArgDeserializer::new(&[1, 0, 0, 0, 9]);
        assert_eq!(de.unpack_i32().unwrap(), 1);
        assert_eq!(
            de.unpack_i64(),
            Err(TaskError::Args {
                offset: 8,
                needed: 8,
                len: 5
            })
        );
    }

    #[test]
    fn test_rank_outside_task_ranks() {
        for bad in [0, 4, -1] {
            let mut ser = ArgSerializer::new();
            ser.pack_i32(bad);
            let bytes = ser.finish();
            assert_eq!(
                ArgDeserializer::new(&bytes).unpack_rank(),
                Err(TaskError::UnsupportedRank(bad))
            );
        }
    }

    #[test]
    fn test_collapse_args_round_trip() {
        let args = CollapseArgs {
            axis: 1,
            collapse_dim: Some(0),
            init_rect: rect(&[0, 2], &[3, 5]),
            in_rect: rect(&[0, 4, 2], &[3, 7, 5]),
        };
        let bytes = args.encode();
        // axis, collapse_dim, init_dim, pad, 4 coords, dim, pad, 6 coords
        assert_eq!(bytes.len(), 16 + 32 + 8 + 48);
        assert_eq!(CollapseArgs::decode(&bytes).unwrap(), args);
    }

    #[test]
    fn test_collapse_args_negative_axis() {
        let mut ser = ArgSerializer::new();
        ser.pack_i32(-1)
            .pack_dimension(None)
            .pack_shape(&rect(&[0], &[2]))
            .pack_shape(&rect(&[0, 0], &[2, 2]));
        assert_eq!(CollapseArgs::decode(&ser.finish()), Err(TaskError::InvalidAxis(-1)));
    }

    #[test]
    fn test_radix_args_round_trip() {
        let args = RadixArgs {
            radix: 4,
            extra_dim_out: None,
            extra_dim_in: Some(1),
            rect: rect(&[-2], &[9]),
        };
        let bytes = args.encode();
        assert_eq!(bytes.len(), 16 + 16);
        assert_eq!(RadixArgs::decode(&bytes).unwrap(), args);
    }

    #[test]
    fn test_shape_args_truncated_rect() {
        let bytes = ShapeArgs {
            rect: rect(&[0, 0], &[1, 1]),
        }
        .encode();
        assert!(matches!(
            ShapeArgs::decode(&bytes[..bytes.len() - 1]),
            Err(TaskError::Args { .. })
        ));
    }
}
