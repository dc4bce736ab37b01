//! # Quantum-Chain Subsystem Benchmarks
//!
//! Performance validation for subsystem claims:
//!
//! | Subsystem | Claim | Target |
//! |-----------|-------|--------|
//! | qc-18 Unordered Tx | O(1) replay check | < 1μs |
//! | qc-18 Unordered Tx | Admission append | < 10μs without fsync |
//! | qc-18 Unordered Tx | Snapshot encode | 100k entries < 50ms |

use criterion::{criterion_group, criterion_main, Criterion};
use qc_tests::benchmarks::qc_18_unordered_tx;

fn bench_unordered_tx(c: &mut Criterion) {
    qc_18_unordered_tx::register_benchmarks(c);
}

criterion_group!(benches, bench_unordered_tx);

criterion_main!(benches);
