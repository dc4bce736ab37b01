//! # QC-18 Unordered Transaction Benchmarks
//!
//! Performance claims to validate:
//! - `contains` is a lock + hash lookup: < 1μs regardless of set size
//! - `admit` with fsync disabled: dominated by one 45-byte append
//! - Sweep cost grows with expired entries, not with live entries
//! - Snapshot of 100k entries stays well under the state-sync chunk budget

use crate::tx_hash;
use criterion::{black_box, BatchSize, BenchmarkId, Criterion, Throughput};
use qc_18_unordered_tx::{UnorderedTxConfig, UnorderedTxManager, UnorderedTxSnapshotter};
use rand::Rng;
use shared_types::{ExtensionError, ExtensionSnapshotter};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const BASE_TIME: u64 = 1_700_000_000;

fn filled_manager(dir: &TempDir, entries: u64) -> Arc<UnorderedTxManager> {
    let manager =
        Arc::new(UnorderedTxManager::open(&UnorderedTxConfig::for_testing(dir.path())).unwrap());
    for id in 0..entries {
        manager.add(tx_hash(id), BASE_TIME + 1_000 + id).unwrap();
    }
    manager
}

pub fn contains_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-18/contains");
    group.measurement_time(Duration::from_secs(5));

    for size in [1_000u64, 10_000, 100_000] {
        let dir = TempDir::new().unwrap();
        let manager = filled_manager(&dir, size);
        let mut rng = rand::thread_rng();

        group.bench_with_input(BenchmarkId::new("hit", size), &manager, |b, m| {
            b.iter(|| black_box(m.contains(&tx_hash(rng.gen_range(0..size)))))
        });
        group.bench_with_input(BenchmarkId::new("miss", size), &manager, |b, m| {
            b.iter(|| black_box(m.contains(&tx_hash(size + rng.gen_range(0..size)))))
        });
    }

    group.finish();
}

pub fn admit_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-18/admit");
    group.throughput(Throughput::Elements(1));

    group.bench_function("admit_no_fsync", |b| {
        let dir = TempDir::new().unwrap();
        let manager = filled_manager(&dir, 0);
        let mut id = 0u64;
        b.iter(|| {
            id += 1;
            black_box(manager.admit(tx_hash(id), BASE_TIME + 1_000).is_ok())
        })
    });

    group.finish();
}

pub fn sweep_expired(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-18/sweep");
    group.sample_size(20);

    for expired in [100u64, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::new("expire", expired), &expired, |b, &n| {
            b.iter_batched(
                || {
                    let dir = TempDir::new().unwrap();
                    let manager = filled_manager(&dir, n);
                    (dir, manager)
                },
                |(_dir, manager)| black_box(manager.on_new_block(BASE_TIME + 1_000 + n)),
                BatchSize::PerIteration,
            )
        });
    }

    group.finish();
}

pub fn snapshot_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-18/snapshot");
    group.sample_size(20);

    for size in [10_000u64, 100_000] {
        let dir = TempDir::new().unwrap();
        let snapshotter = UnorderedTxSnapshotter::new(filled_manager(&dir, size));
        group.throughput(Throughput::Elements(size));

        group.bench_with_input(BenchmarkId::new("encode", size), &snapshotter, |b, s| {
            b.iter(|| {
                let mut bytes = 0usize;
                s.snapshot_extension(1, &mut |chunk: Vec<u8>| -> Result<(), ExtensionError> {
                    bytes += chunk.len();
                    Ok(())
                })
                .unwrap();
                black_box(bytes)
            })
        });
    }

    group.finish();
}

pub fn register_benchmarks(c: &mut Criterion) {
    contains_lookup(c);
    admit_append(c);
    sweep_expired(c);
    snapshot_stream(c);
}
