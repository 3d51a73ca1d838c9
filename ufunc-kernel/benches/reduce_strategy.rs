//! Serial vs parallel reduction benchmarks.
//!
//! Run with: cargo bench -p ufunc-kernel --bench reduce_strategy

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::hint::black_box;
use std::time::Duration;
use ufunc_kernel::{reduce_all, reduce_axis_into, ExecPolicy};
use ufunc_traits::Max;
use ufunc_view::{Privilege, Rect, Store};

fn random_square(size: usize, seed: u64) -> Store<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Store::from_fn(Rect::from_extents(&[size, size]).unwrap(), |_| rng.gen::<f64>())
}

/// Whole-partition max, contiguous and transposed.
fn bench_reduce_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("reduce_all_max");
    group.sample_size(10);
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(3));

    for size in [256, 1024, 2048] {
        group.throughput(Throughput::Elements((size * size) as u64));
        let store = random_square(size, 42);
        let view = store.view(store.bounds()).unwrap();

        for (name, policy) in [("serial", ExecPolicy::serial()), ("parallel", ExecPolicy::parallel())] {
            group.bench_with_input(BenchmarkId::new(name, size), &size, |bench, _| {
                bench.iter(|| black_box(reduce_all(&Max, &view, &policy).unwrap()))
            });
        }
    }
    group.finish();
}

/// Axis collapse along the contiguous (1) and strided (0) axis.
fn bench_reduce_axis(c: &mut Criterion) {
    let mut group = c.benchmark_group("reduce_axis_max");
    group.sample_size(10);
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(3));

    let size = 2048;
    group.throughput(Throughput::Elements((size * size) as u64));
    let store = random_square(size, 7);
    let view = store.view(store.bounds()).unwrap();
    let out_rect = Rect::from_extents(&[size]).unwrap();

    for axis in [0usize, 1] {
        for (name, policy) in [("serial", ExecPolicy::serial()), ("parallel", ExecPolicy::parallel())] {
            group.bench_with_input(BenchmarkId::new(name, axis), &axis, |bench, &axis| {
                let mut out = Store::filled(out_rect.clone(), 0.0);
                bench.iter(|| {
                    let mut dest = out.view_mut(&out_rect, Privilege::ReadWrite).unwrap();
                    reduce_axis_into(&Max, &mut dest, &view, axis, None, &policy).unwrap();
                })
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_reduce_all, bench_reduce_axis);
criterion_main!(benches);
