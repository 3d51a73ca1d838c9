//! Feature-gated Send/Sync bounds for kernel closures and elements.
//!
//! With the `parallel` feature, [`MaybeSync`] is [`Sync`] and
//! [`MaybeSendSync`] is [`Send`] + [`Sync`], because closures and captured
//! values cross rayon worker threads. Without it both are implemented for
//! every type, so single-threaded callers may pass `Rc`-capturing closures.

#[cfg(feature = "parallel")]
pub trait MaybeSync: Sync {}
#[cfg(feature = "parallel")]
impl<T: Sync> MaybeSync for T {}

#[cfg(feature = "parallel")]
pub trait MaybeSendSync: Send + Sync {}
#[cfg(feature = "parallel")]
impl<T: Send + Sync> MaybeSendSync for T {}

#[cfg(not(feature = "parallel"))]
pub trait MaybeSync {}
#[cfg(not(feature = "parallel"))]
impl<T> MaybeSync for T {}

#[cfg(not(feature = "parallel"))]
pub trait MaybeSendSync {}
#[cfg(not(feature = "parallel"))]
impl<T> MaybeSendSync for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars_and_ops_satisfy_bounds() {
        fn check<T: MaybeSendSync>() {}
        fn check_closure<F: Fn(f64) -> f64 + MaybeSync>(_: F) {}
        check::<f64>();
        check::<bool>();
        check::<ufunc_traits::Max>();
        let scalar = 2.5;
        check_closure(move |x| x * scalar);
    }

    #[cfg(not(feature = "parallel"))]
    #[test]
    fn test_rc_closure_without_parallel() {
        use std::rc::Rc;
        fn check_closure<F: Fn(f64) -> f64 + MaybeSync>(_: F) {}
        let shared = Rc::new(3.0);
        check_closure(move |x| x + *shared);
    }
}
