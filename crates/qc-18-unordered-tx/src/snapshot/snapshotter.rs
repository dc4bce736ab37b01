//! # Unordered Transaction Snapshotter
//!
//! Adapts an [`UnorderedTxManager`] to the host's snapshot extension
//! contract.
//!
//! ## Restore State Machine
//!
//! ```text
//! Idle ──format check──→ Failed (FormatMismatch, nothing read)
//!   │
//!   └──→ Reading ──decode error / reader error──→ Failed
//!          │  ↺ apply live entries
//!          └──reader exhausted──→ Committed
//! ```
//!
//! Entering `Reading` resets the target, so a stale replay log left in a
//! reused data directory never merges with the snapshot. A failed restore
//! leaves the target partially populated. The caller must discard it.

use super::codec::{decode_chunk, decode_header, encode_chunk, encode_header};
use crate::domain::{UnorderedTxError, SNAPSHOT_FORMAT};
use crate::service::UnorderedTxManager;
use shared_types::{ExtensionError, ExtensionSnapshotter, PayloadReader, PayloadWriter};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Snapshot extension over a shared manager.
pub struct UnorderedTxSnapshotter {
    manager: Arc<UnorderedTxManager>,
    chunk_entries: usize,
}

impl UnorderedTxSnapshotter {
    /// Wraps `manager` with the chunk size from its configuration.
    pub fn new(manager: Arc<UnorderedTxManager>) -> Self {
        let chunk_entries = manager.config().snapshot_chunk_entries;
        Self::with_chunk_entries(manager, chunk_entries)
    }

    /// Wraps `manager`, emitting at most `chunk_entries` records per payload.
    pub fn with_chunk_entries(manager: Arc<UnorderedTxManager>, chunk_entries: usize) -> Self {
        Self {
            manager,
            chunk_entries: chunk_entries.max(1),
        }
    }

    /// The wrapped manager.
    pub fn manager(&self) -> &Arc<UnorderedTxManager> {
        &self.manager
    }
}

impl ExtensionSnapshotter for UnorderedTxSnapshotter {
    fn snapshot_extension(
        &self,
        height: u64,
        writer: &mut PayloadWriter<'_>,
    ) -> Result<(), ExtensionError> {
        // Copy taken under the read lock; encoding runs without it.
        let entries = self.manager.live_entries();

        writer(encode_header(SNAPSHOT_FORMAT))?;
        for chunk in entries.chunks(self.chunk_entries) {
            writer(encode_chunk(chunk))?;
        }

        info!(
            "[qc-18] Snapshot at height {} wrote {} entries",
            height,
            entries.len()
        );
        Ok(())
    }

    fn restore_extension(
        &self,
        reference: u64,
        format: u32,
        reader: &mut PayloadReader<'_>,
    ) -> Result<(), ExtensionError> {
        if format != SNAPSHOT_FORMAT {
            warn!(
                "[qc-18] Rejecting snapshot format {} (supported: {})",
                format, SNAPSHOT_FORMAT
            );
            return Err(UnorderedTxError::FormatMismatch {
                got: format,
                supported: SNAPSHOT_FORMAT,
            }
            .into());
        }

        let dropped = self.manager.reset()?;
        if dropped != 0 {
            warn!(
                "[qc-18] Discarded {} stale entries before restore",
                dropped
            );
        }

        let header = reader()?.ok_or_else(|| {
            UnorderedTxError::Decode("snapshot stream ended before format header".to_string())
        })?;
        let stream_format = decode_header(&header)?;
        if stream_format != format {
            return Err(UnorderedTxError::Decode(format!(
                "stream header declares format {} but restore requested {}",
                stream_format, format
            ))
            .into());
        }

        let mut restored = 0usize;
        let mut skipped = 0usize;
        while let Some(payload) = reader()? {
            let entries = decode_chunk(&payload)?;
            debug!("[qc-18] Restoring chunk of {} entries", entries.len());

            for entry in entries {
                if entry.is_live_at(reference) {
                    self.manager.add(entry.hash, entry.expires_at)?;
                    restored += 1;
                } else {
                    skipped += 1;
                }
            }
        }

        info!(
            "[qc-18] Restored {} entries, skipped {} expired at reference {}",
            restored, skipped, reference
        );
        Ok(())
    }
}
