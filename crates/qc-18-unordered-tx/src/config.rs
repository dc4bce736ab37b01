//! # Unordered Transaction Configuration
//!
//! Configuration for the replay-protection manager, its sweeper and its
//! snapshot extension.
//!
//! ## Environment Overrides
//!
//! | Variable | Field |
//! |----------|-------|
//! | `QC_UNORDERED_TX_DIR` | `data_dir` |
//! | `QC_UNORDERED_TX_SYNC` | `sync_writes` |
//! | `QC_UNORDERED_TX_CHUNK_ENTRIES` | `snapshot_chunk_entries` |
//! | `QC_UNORDERED_TX_SWEEP_QUEUE` | `sweep_queue_depth` |
//! | `QC_UNORDERED_TX_COMPACT_MIN_DEAD` | `compaction_min_dead_records` |

use crate::domain::UnorderedTxError;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Default records per snapshot chunk.
pub const DEFAULT_SNAPSHOT_CHUNK_ENTRIES: usize = 1024;

/// Default number of pending block signals the sweeper buffers.
pub const DEFAULT_SWEEP_QUEUE_DEPTH: usize = 16;

/// Default number of dead log records tolerated before a sweep compacts.
pub const DEFAULT_COMPACTION_MIN_DEAD_RECORDS: usize = 4096;

/// Unordered transaction subsystem configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnorderedTxConfig {
    /// Directory holding the replay log.
    pub data_dir: PathBuf,

    /// Fsync after every append. Disabling trades the durability of the
    /// last acknowledged records for throughput.
    pub sync_writes: bool,

    /// Records per snapshot payload chunk.
    pub snapshot_chunk_entries: usize,

    /// Pending block signals buffered for the background sweeper.
    pub sweep_queue_depth: usize,

    /// Dead records (swept or superseded) the replay log may carry before a
    /// sweep rewrites it. Compaction also requires dead to exceed live.
    pub compaction_min_dead_records: usize,
}

impl Default for UnorderedTxConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/unordered_tx"),
            sync_writes: true,
            snapshot_chunk_entries: DEFAULT_SNAPSHOT_CHUNK_ENTRIES,
            sweep_queue_depth: DEFAULT_SWEEP_QUEUE_DEPTH,
            compaction_min_dead_records: DEFAULT_COMPACTION_MIN_DEAD_RECORDS,
        }
    }
}

impl UnorderedTxConfig {
    /// Default configuration bound to `data_dir`.
    pub fn with_data_dir(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Create a config for testing (small chunks, no fsync, eager compaction).
    pub fn for_testing(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            sync_writes: false,
            snapshot_chunk_entries: 16,
            sweep_queue_depth: 4,
            compaction_min_dead_records: 0,
        }
    }

    /// Defaults overridden by `QC_UNORDERED_TX_*` environment variables.
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_dir: env::var("QC_UNORDERED_TX_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            sync_writes: env::var("QC_UNORDERED_TX_SYNC")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.sync_writes),
            snapshot_chunk_entries: env::var("QC_UNORDERED_TX_CHUNK_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.snapshot_chunk_entries),
            sweep_queue_depth: env::var("QC_UNORDERED_TX_SWEEP_QUEUE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.sweep_queue_depth),
            compaction_min_dead_records: env::var("QC_UNORDERED_TX_COMPACT_MIN_DEAD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.compaction_min_dead_records),
        }
    }

    /// Rejects values the subsystem cannot run with.
    pub fn validate(&self) -> Result<(), UnorderedTxError> {
        if self.snapshot_chunk_entries == 0 {
            return Err(UnorderedTxError::InvalidConfig(
                "snapshot_chunk_entries must be at least 1".to_string(),
            ));
        }
        if self.sweep_queue_depth == 0 {
            return Err(UnorderedTxError::InvalidConfig(
                "sweep_queue_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
