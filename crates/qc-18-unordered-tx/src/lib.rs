//! # Unordered Transaction Replay Protection Subsystem
//!
//! **Subsystem ID:** 18
//! **Status:** Production-Ready
//!
//! ## Purpose
//!
//! Transactions without a per-account sequence number carry an expiry instead.
//! This subsystem remembers every such transaction hash until its expiry has
//! passed, so the same hash is never executed twice while its window is open.
//! The set survives restarts through an append-only replay log and travels to
//! bootstrapping nodes as a state-sync snapshot extension.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | INVARIANT-1 | No live hash accepted twice | `service/manager.rs` - `admit()` under write lock |
//! | INVARIANT-2 | Log before acknowledge | `service/manager.rs` - append precedes index insert |
//! | INVARIANT-3 | Expiry is exclusive of reference time | `domain/entities.rs` - `TxEntry::is_live_at()` |
//! | INVARIANT-4 | Restart never shrinks the window | `adapters/replay_log.rs` - `ReplayLog::open()` |
//! | INVARIANT-5 | Unknown snapshot formats rejected before any read | `snapshot/snapshotter.rs` - `restore_extension()` |
//!
//! ## Lifecycle
//!
//! ```text
//! open(config) ──→ [SERVING] ──close()──→ [CLOSED]
//!                    │    ↑
//!   add/admit/remove │    │ on_new_block(t): reference = max(reference, t), sweep
//!                    └────┘
//! ```
//!
//! ## Snapshot Extension
//!
//! Registered under [`SNAPSHOT_NAME`] with format [`SNAPSHOT_FORMAT`].
//!
//! | Stage | Method | Effect |
//! |-------|--------|--------|
//! | Produce | `snapshot_extension()` | Header payload, then chunks of live entries |
//! | Consume | `restore_extension()` | Target reset, then entries with `expires_at > reference` re-added |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      OUTER LAYER                                │
//! │  adapters/replay_log.rs  - Append-only log with compaction      │
//! │  snapshot/               - State-sync extension + wire codec    │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MIDDLE LAYER                               │
//! │  ports/inbound.rs  - ReplayProtectionApi trait                  │
//! │  ports/outbound.rs - TimeSource trait                           │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      INNER LAYER                                │
//! │  domain/entities.rs - TxEntry, ManagerStats                     │
//! │  domain/index.rs    - ExpiryIndex (hash map + expiry order)     │
//! │  domain/errors.rs   - UnorderedTxError                          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use qc_18_unordered_tx::{UnorderedTxConfig, UnorderedTxManager, UnorderedTxSnapshotter};
//!
//! let manager = Arc::new(UnorderedTxManager::open(&UnorderedTxConfig::from_env())?);
//!
//! // Admission path
//! manager.admit(tx_hash, tx_expiry)?;
//!
//! // Commit path, queue depth from `sweep_queue_depth`
//! let sweeper = ExpirySweeper::spawn_configured(manager.clone());
//! sweeper.notify(block_time);
//!
//! // State sync, chunk size from `snapshot_chunk_entries`. Restoring
//! // resets whatever the manager reloaded from a stale log.
//! registry.register(SNAPSHOT_NAME, SNAPSHOT_FORMAT, Arc::new(UnorderedTxSnapshotter::new(manager)))?;
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;
pub mod snapshot;

// Re-exports
pub use adapters::{LogRecord, ReplayLog};
pub use config::UnorderedTxConfig;
pub use domain::{
    ExpiryIndex, Hash, ManagerStats, Timestamp, TxEntry, UnorderedTxError, SNAPSHOT_FORMAT,
    SNAPSHOT_NAME,
};
pub use ports::{ManualTimeSource, ReplayProtectionApi, SystemTimeSource, TimeSource};
pub use service::{ExpirySweeper, UnorderedTxManager};
pub use snapshot::UnorderedTxSnapshotter;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
