//! Reduction operators.
//!
//! A reduction operator is a stateless, associative and commutative binary
//! function with an identity element. Every task in the engine is generic
//! over one, so the kernels never name a concrete operation.

use crate::scalar::ReduceScalar;

/// Concurrency contract of a single fold step.
///
/// `Exclusive` is used wherever the accumulator is owned by exactly one
/// worker (the per-element fold loops and thread-local partials).
/// `Relaxed` is used when per-thread partials are merged into a shared
/// result, where merges may arrive in any order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FoldMode {
    Exclusive,
    Relaxed,
}

/// Builtin reduction families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReductionKind {
    Max,
    Min,
    Sum,
    Prod,
}

impl ReductionKind {
    pub const ALL: [ReductionKind; 4] = [
        ReductionKind::Max,
        ReductionKind::Min,
        ReductionKind::Sum,
        ReductionKind::Prod,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ReductionKind::Max => "max",
            ReductionKind::Min => "min",
            ReductionKind::Sum => "sum",
            ReductionKind::Prod => "prod",
        }
    }
}

impl std::fmt::Display for ReductionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An associative, commutative fold with an identity element.
///
/// Implementations must satisfy, for all valid `a`, `b`, `c`:
/// - `combine(identity(), a) == a`
/// - `combine(a, b) == combine(b, a)`
/// - `combine(combine(a, b), c) == combine(a, combine(b, c))`
///
/// (exactly for integer and order-based operators, up to rounding for
/// floating-point `Sum` and `Prod`).
pub trait ReductionOp<T>: Copy + Send + Sync + 'static {
    const KIND: ReductionKind;

    fn identity(&self) -> T;

    fn combine(&self, lhs: T, rhs: T) -> T;

    /// Fold `value` into `acc`.
    ///
    /// Both modes produce the same value. `Relaxed` skips the store when
    /// the accumulator would not change, so merge targets shared between
    /// workers are only dirtied by effective updates.
    #[inline(always)]
    fn fold(&self, acc: &mut T, value: T, mode: FoldMode)
    where
        T: Copy + PartialEq,
    {
        let next = self.combine(*acc, value);
        match mode {
            FoldMode::Exclusive => *acc = next,
            FoldMode::Relaxed => {
                if next != *acc {
                    *acc = next;
                }
            }
        }
    }
}

/// NaN-propagating maximum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Max;

/// NaN-propagating minimum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Min;

/// Wrapping (integer) or IEEE (float) sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sum;

/// Wrapping (integer) or IEEE (float) product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Prod;

impl<T: ReduceScalar> ReductionOp<T> for Max {
    const KIND: ReductionKind = ReductionKind::Max;

    #[inline(always)]
    fn identity(&self) -> T {
        T::lowest()
    }

    #[inline(always)]
    fn combine(&self, lhs: T, rhs: T) -> T {
        if lhs.is_unordered() || rhs.is_unordered() {
            return if lhs.is_unordered() { lhs } else { rhs };
        }
        if rhs > lhs {
            rhs
        } else {
            lhs
        }
    }
}

impl<T: ReduceScalar> ReductionOp<T> for Min {
    const KIND: ReductionKind = ReductionKind::Min;

    #[inline(always)]
    fn identity(&self) -> T {
        T::highest()
    }

    #[inline(always)]
    fn combine(&self, lhs: T, rhs: T) -> T {
        if lhs.is_unordered() || rhs.is_unordered() {
            return if lhs.is_unordered() { lhs } else { rhs };
        }
        if rhs < lhs {
            rhs
        } else {
            lhs
        }
    }
}

impl<T: ReduceScalar> ReductionOp<T> for Sum {
    const KIND: ReductionKind = ReductionKind::Sum;

    #[inline(always)]
    fn identity(&self) -> T {
        T::zero()
    }

    #[inline(always)]
    fn combine(&self, lhs: T, rhs: T) -> T {
        lhs.reduce_add(rhs)
    }
}

impl<T: ReduceScalar> ReductionOp<T> for Prod {
    const KIND: ReductionKind = ReductionKind::Prod;

    #[inline(always)]
    fn identity(&self) -> T {
        T::one()
    }

    #[inline(always)]
    fn combine(&self, lhs: T, rhs: T) -> T {
        lhs.reduce_mul(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fold_all<T: ReduceScalar, Op: ReductionOp<T>>(op: Op, values: &[T], mode: FoldMode) -> T {
        let mut acc = op.identity();
        for &v in values {
            op.fold(&mut acc, v, mode);
        }
        acc
    }

    #[test]
    fn test_max_scenario() {
        assert_eq!(fold_all(Max, &[3i64, 7, 2, 9, 4], FoldMode::Exclusive), 9);
        assert_eq!(fold_all(Max, &[3.0f64, 7.0, 2.0, 9.0, 4.0], FoldMode::Exclusive), 9.0);
    }

    #[test]
    fn test_identity_of_empty_fold() {
        assert_eq!(fold_all::<f64, _>(Max, &[], FoldMode::Exclusive), f64::NEG_INFINITY);
        assert_eq!(fold_all::<u8, _>(Min, &[], FoldMode::Exclusive), u8::MAX);
        assert_eq!(fold_all::<i32, _>(Sum, &[], FoldMode::Exclusive), 0);
        assert_eq!(fold_all::<i32, _>(Prod, &[], FoldMode::Exclusive), 1);
    }

    #[test]
    fn test_nan_propagates_either_side() {
        assert!(Max.combine(f64::NAN, 1.0).is_nan());
        assert!(Max.combine(1.0, f64::NAN).is_nan());
        assert!(Min.combine(f32::NAN, f32::NEG_INFINITY).is_nan());
        assert!(fold_all(Max, &[1.0, f64::NAN, 3.0], FoldMode::Exclusive).is_nan());
    }

    #[test]
    fn test_relaxed_fold_matches_exclusive() {
        let values = [5i16, -3, 12, 12, 0, -40];
        for kind in ReductionKind::ALL {
            let (a, b) = match kind {
                ReductionKind::Max => (
                    fold_all(Max, &values, FoldMode::Exclusive),
                    fold_all(Max, &values, FoldMode::Relaxed),
                ),
                ReductionKind::Min => (
                    fold_all(Min, &values, FoldMode::Exclusive),
                    fold_all(Min, &values, FoldMode::Relaxed),
                ),
                ReductionKind::Sum => (
                    fold_all(Sum, &values, FoldMode::Exclusive),
                    fold_all(Sum, &values, FoldMode::Relaxed),
                ),
                ReductionKind::Prod => (
                    fold_all(Prod, &values, FoldMode::Exclusive),
                    fold_all(Prod, &values, FoldMode::Relaxed),
                ),
            };
            assert_eq!(a, b, "{kind}");
        }
    }

    #[test]
    fn test_bool_max_is_any() {
        assert!(fold_all(Max, &[false, true, false], FoldMode::Exclusive));
        assert!(!fold_all(Min, &[false, true, true], FoldMode::Exclusive));
    }

    proptest! {
        #[test]
        fn max_identity_law(x in any::<i32>()) {
            prop_assert_eq!(ReductionOp::<i32>::combine(&Max, Max.identity(), x), x);
            prop_assert_eq!(ReductionOp::<i32>::combine(&Max, x, Max.identity()), x);
        }

        #[test]
        fn max_commutative_associative(a in any::<i64>(), b in any::<i64>(), c in any::<i64>()) {
            prop_assert_eq!(Max.combine(a, b), Max.combine(b, a));
            prop_assert_eq!(Max.combine(Max.combine(a, b), c), Max.combine(a, Max.combine(b, c)));
        }

        #[test]
        fn max_float_laws(a in -1e9f64..1e9, b in -1e9f64..1e9, c in -1e9f64..1e9) {
            prop_assert_eq!(Max.combine(Max.identity(), a), a);
            prop_assert_eq!(Max.combine(a, b), Max.combine(b, a));
            prop_assert_eq!(Max.combine(Max.combine(a, b), c), Max.combine(a, Max.combine(b, c)));
        }

        #[test]
        fn min_laws(a in any::<u32>(), b in any::<u32>(), c in any::<u32>()) {
            prop_assert_eq!(Min.combine(Min.identity(), a), a);
            prop_assert_eq!(Min.combine(a, b), Min.combine(b, a));
            prop_assert_eq!(Min.combine(Min.combine(a, b), c), Min.combine(a, Min.combine(b, c)));
        }

        #[test]
        fn wrapping_sum_prod_laws(a in any::<i16>(), b in any::<i16>(), c in any::<i16>()) {
            prop_assert_eq!(Sum.combine(Sum.identity(), a), a);
            prop_assert_eq!(Sum.combine(Sum.combine(a, b), c), Sum.combine(a, Sum.combine(b, c)));
            prop_assert_eq!(Prod.combine(Prod.identity(), a), a);
            prop_assert_eq!(Prod.combine(a, b), Prod.combine(b, a));
            prop_assert_eq!(Prod.combine(Prod.combine(a, b), c), Prod.combine(a, Prod.combine(b, c)));
        }
    }
}
