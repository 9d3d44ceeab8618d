//! Benchmarks for the worker-pool execution core.
//!
//! Benchmarks cover:
//! - `DirectPool` submission throughput at varying worker counts
//! - `QueuedPool` backlog throughput when submission outpaces workers

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use threadpool_core::direct_pool::DirectPool;
use threadpool_core::queued_pool::QueuedPool;

const STACK_SIZE: usize = 256 * 1024;

fn wait_until(completed: &AtomicUsize, target: usize) {
    while completed.load(Ordering::SeqCst) < target {
        std::thread::yield_now();
    }
}

// ============================================================================
// DirectPool Benchmarks
// ============================================================================

fn bench_direct_pool_submit(c: &mut Criterion) {
    let mut group = c.benchmark_group("direct_pool_submit");

    for workers in [1, 4, 8] {
        group.throughput(Throughput::Elements(200));
        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, &workers| {
            let pool = DirectPool::new(workers, STACK_SIZE).unwrap();
            b.iter(|| {
                let completed = Arc::new(AtomicUsize::new(0));
                for _ in 0..200 {
                    let completed = Arc::clone(&completed);
                    pool.execute(Box::new(move || {
                        completed.fetch_add(1, Ordering::SeqCst);
                    }));
                }
                wait_until(&completed, 200);
                black_box(completed.load(Ordering::SeqCst));
            });
            pool.terminate();
        });
    }
    group.finish();
}

// ============================================================================
// QueuedPool Benchmarks
// ============================================================================

fn bench_queued_pool_submit(c: &mut Criterion) {
    let mut group = c.benchmark_group("queued_pool_submit");

    for workers in [1, 4, 8] {
        group.throughput(Throughput::Elements(200));
        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, &workers| {
            let pool = QueuedPool::new(workers, STACK_SIZE).unwrap();
            b.iter(|| {
                let completed = Arc::new(AtomicUsize::new(0));
                for _ in 0..200 {
                    let completed = Arc::clone(&completed);
                    pool.execute(Box::new(move || {
                        completed.fetch_add(1, Ordering::SeqCst);
                    }));
                }
                wait_until(&completed, 200);
                black_box(completed.load(Ordering::SeqCst));
            });
            pool.terminate();
        });
    }
    group.finish();
}

fn bench_queued_pool_enqueue_only(c: &mut Criterion) {
    let mut group = c.benchmark_group("queued_pool_enqueue_only");

    for depth in [100, 1_000, 5_000] {
        group.throughput(Throughput::Elements(depth as u64));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            // Zero workers: every `execute` call only has to append to the
            // backlog, isolating enqueue cost from dispatch cost.
            let pool = QueuedPool::new(0, STACK_SIZE).unwrap();
            b.iter(|| {
                for _ in 0..depth {
                    pool.execute(Box::new(|| {}));
                }
                black_box(pool.queue_length());
            });
            pool.terminate();
        });
    }
    group.finish();
}

criterion_group!(direct_pool_benches, bench_direct_pool_submit);
criterion_group!(queued_pool_benches, bench_queued_pool_submit, bench_queued_pool_enqueue_only);

criterion_main!(direct_pool_benches, queued_pool_benches);
