//! # Quantum-Chain Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── benchmarks/       # Performance tests per subsystem
//! │   └── qc_18_unordered_tx.rs
//! │
//! └── integration/      # Cross-component flows
//!     └── state_sync.rs # Admission, commit path and bootstrap together
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p qc-tests
//!
//! # By category
//! cargo test -p qc-tests integration::
//!
//! # With logs
//! RUST_LOG=debug cargo test -p qc-tests -- --nocapture
//!
//! # Benchmarks
//! cargo bench -p qc-tests
//! ```

#![allow(dead_code)]

pub mod benchmarks;
pub mod integration;

use sha2::{Digest, Sha256};
use tracing_subscriber::EnvFilter;

/// Installs a test log subscriber honouring `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Deterministic transaction hash for fixture `id`.
pub fn tx_hash(id: u64) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"qc-tests/unordered-tx");
    hasher.update(id.to_be_bytes());
    hasher.finalize().into()
}
