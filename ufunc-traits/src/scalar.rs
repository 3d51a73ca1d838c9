//! Element types the reduction tasks are instantiated for.
//!
//! Every task is compiled once per [`ReduceScalar`] type. The type's
//! [`DType`] code is part of the task id the host uses to pick a
//! specialization, so the codes below are a stable wire value.

use num_traits::{Bounded, Float, One, WrappingAdd, WrappingMul, Zero};
use std::fmt::Debug;

/// Element type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum DType {
    Bool = 0,
    Int8 = 1,
    Int16 = 2,
    Int32 = 3,
    Int64 = 4,
    UInt8 = 5,
    UInt16 = 6,
    UInt32 = 7,
    UInt64 = 8,
    Float32 = 9,
    Float64 = 10,
}

impl DType {
    /// Number of element type codes.
    pub const COUNT: u32 = 11;

    pub const ALL: [DType; Self::COUNT as usize] = [
        DType::Bool,
        DType::Int8,
        DType::Int16,
        DType::Int32,
        DType::Int64,
        DType::UInt8,
        DType::UInt16,
        DType::UInt32,
        DType::UInt64,
        DType::Float32,
        DType::Float64,
    ];

    #[inline]
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Size of one element in bytes.
    pub fn size_of(self) -> usize {
        match self {
            DType::Bool | DType::Int8 | DType::UInt8 => 1,
            DType::Int16 | DType::UInt16 => 2,
            DType::Int32 | DType::UInt32 | DType::Float32 => 4,
            DType::Int64 | DType::UInt64 | DType::Float64 => 8,
        }
    }

    /// Short lowercase name, as used in task names.
    pub fn name(self) -> &'static str {
        match self {
            DType::Bool => "bool",
            DType::Int8 => "i8",
            DType::Int16 => "i16",
            DType::Int32 => "i32",
            DType::Int64 => "i64",
            DType::UInt8 => "u8",
            DType::UInt16 => "u16",
            DType::UInt32 => "u32",
            DType::UInt64 => "u64",
            DType::Float32 => "f32",
            DType::Float64 => "f64",
        }
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Scalar element of a reduction.
///
/// Provides the constants the builtin operators use as identities and the
/// arithmetic they fold with. Integer arithmetic wraps on overflow. For
/// `bool`, addition is logical or and multiplication is logical and.
pub trait ReduceScalar: Copy + PartialOrd + Debug + Send + Sync + 'static {
    const DTYPE: DType;

    /// Smallest value of the type (`-inf` for floats).
    fn lowest() -> Self;

    /// Largest value of the type (`+inf` for floats).
    fn highest() -> Self;

    fn zero() -> Self;

    fn one() -> Self;

    /// True for values that compare unordered with everything (NaN).
    #[inline(always)]
    fn is_unordered(self) -> bool {
        false
    }

    fn reduce_add(self, rhs: Self) -> Self;

    fn reduce_mul(self, rhs: Self) -> Self;
}

macro_rules! impl_reduce_scalar_int {
    ($($t:ty => $dtype:ident),* $(,)?) => {
        $(
            impl ReduceScalar for $t {
                const DTYPE: DType = DType::$dtype;

                #[inline(always)]
                fn lowest() -> Self {
                    <$t as Bounded>::min_value()
                }

                #[inline(always)]
                fn highest() -> Self {
                    <$t as Bounded>::max_value()
                }

                #[inline(always)]
                fn zero() -> Self {
                    <$t as Zero>::zero()
                }

                #[inline(always)]
                fn one() -> Self {
                    <$t as One>::one()
                }

                #[inline(always)]
                fn reduce_add(self, rhs: Self) -> Self {
                    WrappingAdd::wrapping_add(&self, &rhs)
                }

                #[inline(always)]
                fn reduce_mul(self, rhs: Self) -> Self {
                    WrappingMul::wrapping_mul(&self, &rhs)
                }
            }
        )*
    };
}

impl_reduce_scalar_int!(
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
);

macro_rules! impl_reduce_scalar_float {
    ($($t:ty => $dtype:ident),* $(,)?) => {
        $(
            impl ReduceScalar for $t {
                const DTYPE: DType = DType::$dtype;

                #[inline(always)]
                fn lowest() -> Self {
                    <$t as Float>::neg_infinity()
                }

                #[inline(always)]
                fn highest() -> Self {
                    <$t as Float>::infinity()
                }

                #[inline(always)]
                fn zero() -> Self {
                    <$t as Zero>::zero()
                }

                #[inline(always)]
                fn one() -> Self {
                    <$t as One>::one()
                }

                #[inline(always)]
                fn is_unordered(self) -> bool {
                    <$t as Float>::is_nan(self)
                }

                #[inline(always)]
                fn reduce_add(self, rhs: Self) -> Self {
                    self + rhs
                }

                #[inline(always)]
                fn reduce_mul(self, rhs: Self) -> Self {
                    self * rhs
                }
            }
        )*
    };
}

impl_reduce_scalar_float!(f32 => Float32, f64 => Float64);

impl ReduceScalar for bool {
    const DTYPE: DType = DType::Bool;

    #[inline(always)]
    fn lowest() -> Self {
        false
    }

    #[inline(always)]
    fn highest() -> Self {
        true
    }

    #[inline(always)]
    fn zero() -> Self {
        false
    }

    #[inline(always)]
    fn one() -> Self {
        true
    }

    #[inline(always)]
    fn reduce_add(self, rhs: Self) -> Self {
        self | rhs
    }

    #[inline(always)]
    fn reduce_mul(self, rhs: Self) -> Self {
        self & rhs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_codes_roundtrip() {
        for dtype in DType::ALL {
            assert_eq!(DType::from_code(dtype.code()), Some(dtype));
        }
        assert_eq!(DType::from_code(DType::COUNT), None);
    }

    #[test]
    fn test_scalar_dtypes() {
        assert_eq!(<f64 as ReduceScalar>::DTYPE, DType::Float64);
        assert_eq!(<u8 as ReduceScalar>::DTYPE, DType::UInt8);
        assert_eq!(<bool as ReduceScalar>::DTYPE.size_of(), 1);
        assert_eq!(DType::Int64.size_of(), std::mem::size_of::<i64>());
    }

    #[test]
    fn test_bounds() {
        assert_eq!(<i32 as ReduceScalar>::lowest(), i32::MIN);
        assert_eq!(<u16 as ReduceScalar>::highest(), u16::MAX);
        assert_eq!(<f32 as ReduceScalar>::lowest(), f32::NEG_INFINITY);
        assert_eq!(<f64 as ReduceScalar>::highest(), f64::INFINITY);
    }

    #[test]
    fn test_integer_arithmetic_wraps() {
        assert_eq!(i8::MAX.reduce_add(1), i8::MIN);
        assert_eq!(200u8.reduce_mul(2), 144);
    }

    #[test]
    fn test_bool_arithmetic_is_logical() {
        assert!(false.reduce_add(true));
        assert!(!true.reduce_mul(false));
        assert!(f64::NAN.is_unordered());
        assert!(!1.0f64.is_unordered());
    }
}
