//! # Domain Entities
//!
//! The replay-protection entry and the constants that pin the snapshot
//! wire contract.

pub use shared_types::{Hash, Timestamp};

/// Fixed extension name under which the replay-protection set is registered
/// with the host's snapshot-extension registry.
pub const SNAPSHOT_NAME: &str = "unordered_txs";

/// The only snapshot format this subsystem produces and accepts.
pub const SNAPSHOT_FORMAT: u32 = 1;

/// A transaction hash protected until `expires_at`.
///
/// INVARIANT: entries are never updated in place. An entry leaves the live
/// set only by expiry or explicit removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxEntry {
    /// Transaction hash (unique key).
    pub hash: Hash,
    /// Absolute end of the protection window.
    pub expires_at: Timestamp,
}

impl TxEntry {
    /// Creates a new entry.
    pub fn new(hash: Hash, expires_at: Timestamp) -> Self {
        Self { hash, expires_at }
    }

    /// True if the protection window is still open at `reference`.
    ///
    /// An entry expiring exactly at `reference` is no longer live.
    pub fn is_live_at(&self, reference: Timestamp) -> bool {
        self.expires_at > reference
    }
}

/// Point-in-time counters for a manager.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ManagerStats {
    /// Entries currently held in memory.
    pub live_entries: usize,
    /// Latest block time observed by the manager.
    pub reference_time: Timestamp,
    /// Records appended to the replay log since open.
    pub appended_records: u64,
    /// Sweeps executed since open.
    pub sweeps: u64,
    /// Entries removed by sweeps since open.
    pub swept_entries: u64,
    /// Replay log compactions since open.
    pub compactions: u64,
}
