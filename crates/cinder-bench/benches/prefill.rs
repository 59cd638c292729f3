//! Prefill benchmarks for the Cinder harness.
//!
//! Benchmarks for:
//! - Prefill throughput across range sizes
//! - Prefill scaling across worker counts
//! - Find throughput over a prefilled store

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use cinder_bench::store::MapStore;
use cinder_bench::utils::shuffled_indices;
use cinder_common::{CpuTopology, HarnessConfig};
use cinder_harness::fixture::{KvStore, WorkloadHarness};

/// Configuration sized to the bench machine rather than the PMem hosts.
fn bench_config(workers: usize) -> HarnessConfig {
    HarnessConfig {
        util_workers: workers,
        topology: CpuTopology::identity(workers),
        ..HarnessConfig::for_testing()
    }
}

/// Benchmark prefill over increasing range sizes.
fn bench_prefill_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("harness/prefill");
    let harness = WorkloadHarness::new(&bench_config(4)).expect("valid config");

    for size in [1_000, 10_000, 100_000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let store = MapStore::new();
                let inserted = harness.prefill(&store, size).expect("prefill failed");
                black_box(inserted)
            });
        });
    }

    group.finish();
}

/// Benchmark prefill of a fixed range across worker counts.
fn bench_prefill_workers(c: &mut Criterion) {
    let mut group = c.benchmark_group("harness/prefill_workers");
    group.throughput(Throughput::Elements(50_000));

    for workers in [1, 2, 4, 8].iter() {
        let harness = WorkloadHarness::new(&bench_config(*workers)).expect("valid config");

        group.bench_with_input(
            BenchmarkId::from_parameter(workers),
            workers,
            |b, _workers| {
                b.iter(|| {
                    let store = MapStore::new();
                    let inserted = harness.prefill(&store, 50_000).expect("prefill failed");
                    black_box(inserted)
                });
            },
        );
    }

    group.finish();
}

/// Benchmark random-order finds over a prefilled store.
fn bench_find_after_prefill(c: &mut Criterion) {
    let mut group = c.benchmark_group("harness/find");

    let harness = WorkloadHarness::new(&bench_config(4)).expect("valid config");
    let store = MapStore::new();
    harness.prefill(&store, 10_000).expect("prefill failed");

    let order = shuffled_indices(10_000, 42);

    group.throughput(Throughput::Elements(10_000));
    group.bench_function("random_order", |b| {
        b.iter(|| {
            let mut found = 0;
            for &idx in &order {
                found += store.find(idx, idx + 1).expect("find failed");
            }
            black_box(found)
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_prefill_sizes,
    bench_prefill_workers,
    bench_find_after_prefill,
);
criterion_main!(benches);
