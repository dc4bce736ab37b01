//! # Unordered Transaction Manager
//!
//! Authoritative set of hashes whose replay-protection window is open.
//!
//! ## Locking
//!
//! One `RwLock` guards the index, the replay log handle and the reference
//! time. Writers (`add`, `admit`, `remove`, sweeps) append to the log inside
//! the write lock, so a record is durable before the index changes and
//! before the caller is acknowledged. Readers (`contains`, `size`,
//! `live_entries`) never touch the disk.
//!
//! ## Reference Time
//!
//! The latest block time reported through `on_new_block`. It only moves
//! forward. `contains` treats an entry expiring at or before it as absent
//! even if no sweep has removed it yet.

use crate::adapters::{LogRecord, ReplayLog};
use crate::config::UnorderedTxConfig;
use crate::domain::{
    ExpiryIndex, Hash, ManagerStats, Timestamp, TxEntry, UnorderedTxError,
};
use crate::ports::ReplayProtectionApi;
use parking_lot::RwLock;
use shared_types::short_hash;
use std::path::Path;
use tracing::{debug, info, warn};

/// State guarded by the manager lock.
#[derive(Debug)]
struct ManagerState {
    index: ExpiryIndex,
    log: ReplayLog,
    reference_time: Timestamp,
    closed: bool,
    sweeps: u64,
    swept_entries: u64,
    compaction_min_dead: u64,
}

impl ManagerState {
    fn ensure_open(&self) -> Result<(), UnorderedTxError> {
        if self.closed {
            return Err(UnorderedTxError::ManagerClosed);
        }
        Ok(())
    }

    fn insert(&mut self, entry: TxEntry) -> Result<(), UnorderedTxError> {
        self.log.append(&LogRecord::Add(entry))?;
        self.index.insert(entry);
        Ok(())
    }

    /// Removes expired entries, compacting the log once dead records
    /// outnumber live ones and reach the configured minimum.
    fn sweep(&mut self) -> Result<usize, UnorderedTxError> {
        let expired = self.index.expire(self.reference_time);
        self.sweeps += 1;

        if expired.is_empty() {
            return Ok(0);
        }

        self.swept_entries += expired.len() as u64;

        let live = self.index.len() as u64;
        let dead = self.log.records().saturating_sub(live);
        if dead > live && dead >= self.compaction_min_dead {
            self.log.compact(&self.index.entries())?;
        }

        debug!(
            "[qc-18] Swept {} expired entries at {} ({} live)",
            expired.len(),
            self.reference_time,
            self.index.len()
        );
        Ok(expired.len())
    }
}

/// Replay-protection manager for unordered transactions.
///
/// Constructed once per process and shared by `Arc` between the admission
/// path, the commit path and the snapshot extension.
///
/// INVARIANTS:
/// - Every indexed hash has a record in the replay log
/// - After a sweep, no indexed hash expires at or before the reference time
/// - A live hash is never reported absent by `contains`
#[derive(Debug)]
pub struct UnorderedTxManager {
    state: RwLock<ManagerState>,
    config: UnorderedTxConfig,
}

impl UnorderedTxManager {
    /// Opens the manager described by `config`, replaying its log.
    ///
    /// Entries loaded from disk are kept even if already expired; the first
    /// `on_new_block` sweeps them.
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` if the configuration is rejected
    /// - `Storage` / `CorruptedLog` if the log cannot be trusted
    pub fn open(config: &UnorderedTxConfig) -> Result<Self, UnorderedTxError> {
        config.validate()?;

        let (log, entries) = ReplayLog::open(&config.data_dir, config.sync_writes)?;
        let index = ExpiryIndex::from_entries(entries);

        info!(
            "[qc-18] Unordered tx manager opened at {} with {} entries",
            config.data_dir.display(),
            index.len()
        );

        Ok(Self {
            state: RwLock::new(ManagerState {
                index,
                log,
                reference_time: 0,
                closed: false,
                sweeps: 0,
                swept_entries: 0,
                compaction_min_dead: config.compaction_min_dead_records as u64,
            }),
            config: config.clone(),
        })
    }

    /// Opens a manager in `data_dir` with default settings.
    pub fn new(data_dir: impl AsRef<Path>) -> Result<Self, UnorderedTxError> {
        Self::open(&UnorderedTxConfig::with_data_dir(data_dir))
    }

    /// Directory holding the replay log.
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Configuration the manager was opened with.
    ///
    /// The snapshotter and sweeper size themselves from it.
    pub fn config(&self) -> &UnorderedTxConfig {
        &self.config
    }

    /// True iff `hash` is held and its window is still open.
    pub fn contains(&self, hash: &Hash) -> bool {
        let state = self.state.read();
        state.index.is_live(hash, state.reference_time)
    }

    /// Registers `hash` until `expires_at`. Idempotent for live hashes.
    pub fn add(&self, hash: Hash, expires_at: Timestamp) -> Result<(), UnorderedTxError> {
        let mut state = self.state.write();
        state.ensure_open()?;

        if state.index.is_live(&hash, state.reference_time) {
            return Ok(());
        }
        state.insert(TxEntry::new(hash, expires_at))
    }

    /// Check-and-add under a single critical section.
    ///
    /// # Errors
    ///
    /// `DuplicateTransaction` if the hash is already live.
    pub fn admit(&self, hash: Hash, expires_at: Timestamp) -> Result<(), UnorderedTxError> {
        let mut state = self.state.write();
        state.ensure_open()?;

        if state.index.is_live(&hash, state.reference_time) {
            debug!("[qc-18] Rejecting replayed tx {}", short_hash(&hash));
            return Err(UnorderedTxError::DuplicateTransaction(hash));
        }
        state.insert(TxEntry::new(hash, expires_at))
    }

    /// Drops `hash` before its expiry. Returns true if it was held.
    pub fn remove(&self, hash: &Hash) -> Result<bool, UnorderedTxError> {
        let mut state = self.state.write();
        state.ensure_open()?;

        if state.index.get(hash).is_none() {
            return Ok(false);
        }
        state.log.append(&LogRecord::Remove(*hash))?;
        state.index.remove(hash);
        Ok(true)
    }

    /// Number of entries held (post-sweep semantics).
    pub fn size(&self) -> usize {
        self.state.read().index.len()
    }

    /// Sweeps relative to `now`, then returns the size.
    pub fn size_at(&self, now: Timestamp) -> Result<usize, UnorderedTxError> {
        self.on_new_block(now)?;
        Ok(self.size())
    }

    /// Advances the reference time to `block_time` and sweeps.
    ///
    /// A `block_time` older than the current reference time does not move it
    /// back; the sweep still runs. Returns the number of entries removed.
    pub fn on_new_block(&self, block_time: Timestamp) -> Result<usize, UnorderedTxError> {
        let mut state = self.state.write();
        state.ensure_open()?;

        if block_time < state.reference_time {
            warn!(
                "[qc-18] Ignoring block time {} older than reference {}",
                block_time, state.reference_time
            );
        } else {
            state.reference_time = block_time;
        }
        state.sweep()
    }

    /// Drops every entry and truncates the replay log to empty.
    ///
    /// Used before a state-sync restore so a stale log left in the data
    /// directory never merges with the snapshot. Returns the entries dropped.
    pub fn reset(&self) -> Result<usize, UnorderedTxError> {
        let mut state = self.state.write();
        state.ensure_open()?;

        let dropped = state.index.len();
        state.log.compact(&[])?;
        state.index = ExpiryIndex::new();

        info!("[qc-18] Reset unordered tx manager, dropped {} entries", dropped);
        Ok(dropped)
    }

    /// Latest block time observed.
    pub fn reference_time(&self) -> Timestamp {
        self.state.read().reference_time
    }

    /// Point-in-time copy of the entries live at the reference time.
    ///
    /// The lock is released before the caller processes the copy.
    pub fn live_entries(&self) -> Vec<TxEntry> {
        let state = self.state.read();
        state.index.live_entries(state.reference_time)
    }

    /// Current counters.
    pub fn stats(&self) -> ManagerStats {
        let state = self.state.read();
        ManagerStats {
            live_entries: state.index.len(),
            reference_time: state.reference_time,
            appended_records: state.log.appended(),
            sweeps: state.sweeps,
            swept_entries: state.swept_entries,
            compactions: state.log.compactions(),
        }
    }

    /// True once `close()` has been called.
    pub fn is_closed(&self) -> bool {
        self.state.read().closed
    }

    /// Flushes the replay log and releases it. Idempotent.
    ///
    /// `contains` keeps answering from memory; writes fail with
    /// `ManagerClosed`.
    pub fn close(&self) -> Result<(), UnorderedTxError> {
        let mut state = self.state.write();
        if state.closed {
            return Ok(());
        }

        state.log.close()?;
        state.closed = true;
        info!(
            "[qc-18] Unordered tx manager closed with {} entries",
            state.index.len()
        );
        Ok(())
    }
}

impl ReplayProtectionApi for UnorderedTxManager {
    fn contains(&self, hash: &Hash) -> bool {
        UnorderedTxManager::contains(self, hash)
    }

    fn add(&self, hash: Hash, expires_at: Timestamp) -> Result<(), UnorderedTxError> {
        UnorderedTxManager::add(self, hash, expires_at)
    }

    fn admit(&self, hash: Hash, expires_at: Timestamp) -> Result<(), UnorderedTxError> {
        UnorderedTxManager::admit(self, hash, expires_at)
    }

    fn remove(&self, hash: &Hash) -> Result<bool, UnorderedTxError> {
        UnorderedTxManager::remove(self, hash)
    }

    fn on_new_block(&self, block_time: Timestamp) -> Result<usize, UnorderedTxError> {
        UnorderedTxManager::on_new_block(self, block_time)
    }

    fn size(&self) -> usize {
        UnorderedTxManager::size(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn open_manager(dir: &TempDir) -> UnorderedTxManager {
        UnorderedTxManager::open(&UnorderedTxConfig::for_testing(dir.path())).unwrap()
    }

    fn hash(id: u8) -> Hash {
        [id; 32]
    }

    #[test]
    fn test_add_and_contains() {
        let dir = TempDir::new().unwrap();
        let manager = open_manager(&dir);

        manager.add(hash(1), 100).unwrap();
        assert!(manager.contains(&hash(1)));
        assert!(!manager.contains(&hash(2)));
        assert_eq!(manager.size(), 1);
    }

    #[test]
    fn test_add_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let manager = open_manager(&dir);

        manager.add(hash(1), 100).unwrap();
        manager.add(hash(1), 999).unwrap();

        assert_eq!(manager.size(), 1);
        assert_eq!(manager.live_entries(), vec![TxEntry::new(hash(1), 100)]);
        assert_eq!(manager.stats().appended_records, 1);
    }

    #[test]
    fn test_admit_rejects_live_duplicate() {
        let dir = TempDir::new().unwrap();
        let manager = open_manager(&dir);

        manager.admit(hash(1), 100).unwrap();
        let err = manager.admit(hash(1), 100).unwrap_err();
        assert!(matches!(err, UnorderedTxError::DuplicateTransaction(h) if h == hash(1)));
    }

    #[test]
    fn test_sweep_removes_expired_inclusive() {
        let dir = TempDir::new().unwrap();
        let manager = open_manager(&dir);

        manager.add(hash(1), 100).unwrap();
        manager.add(hash(2), 150).unwrap();
        manager.add(hash(3), 200).unwrap();

        assert_eq!(manager.on_new_block(150).unwrap(), 2);
        assert!(!manager.contains(&hash(1)));
        assert!(!manager.contains(&hash(2)));
        assert!(manager.contains(&hash(3)));
        assert_eq!(manager.size(), 1);

        let stats = manager.stats();
        assert_eq!(stats.swept_entries, 2);
        assert_eq!(stats.compactions, 1);
        assert_eq!(stats.reference_time, 150);
    }

    #[test]
    fn test_reference_time_is_monotonic() {
        let dir = TempDir::new().unwrap();
        let manager = open_manager(&dir);

        manager.on_new_block(500).unwrap();
        manager.on_new_block(400).unwrap();
        assert_eq!(manager.reference_time(), 500);
    }

    #[test]
    fn test_expired_hash_can_be_added_again() {
        let dir = TempDir::new().unwrap();
        let manager = open_manager(&dir);

        manager.add(hash(1), 100).unwrap();
        manager.on_new_block(100).unwrap();
        manager.admit(hash(1), 300).unwrap();

        assert!(manager.contains(&hash(1)));
    }

    #[test]
    fn test_remove() {
        let dir = TempDir::new().unwrap();
        let manager = open_manager(&dir);

        manager.add(hash(1), 100).unwrap();
        assert!(manager.remove(&hash(1)).unwrap());
        assert!(!manager.remove(&hash(1)).unwrap());
        assert!(!manager.contains(&hash(1)));
    }

    #[test]
    fn test_size_at_sweeps_first() {
        let dir = TempDir::new().unwrap();
        let manager = open_manager(&dir);

        manager.add(hash(1), 100).unwrap();
        manager.add(hash(2), 300).unwrap();
        assert_eq!(manager.size_at(200).unwrap(), 1);
    }

    #[test]
    fn test_closed_manager_rejects_writes() {
        let dir = TempDir::new().unwrap();
        let manager = open_manager(&dir);
        manager.add(hash(1), 100).unwrap();

        manager.close().unwrap();
        manager.close().unwrap();

        assert!(manager.is_closed());
        assert!(manager.contains(&hash(1)));
        assert!(matches!(
            manager.add(hash(2), 100),
            Err(UnorderedTxError::ManagerClosed)
        ));
        assert!(matches!(
            manager.on_new_block(50),
            Err(UnorderedTxError::ManagerClosed)
        ));
    }

    #[test]
    fn test_concurrent_admit_accepts_once() {
        let dir = TempDir::new().unwrap();
        let manager = Arc::new(open_manager(&dir));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                std::thread::spawn(move || manager.admit(hash(7), 1_000).is_ok())
            })
            .collect();

        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(accepted, 1);
        assert_eq!(manager.size(), 1);
    }

    #[test]
    fn test_failed_append_rejects_add() {
        let dir = TempDir::new().unwrap();
        let manager = open_manager(&dir);
        manager.add(hash(1), 100).unwrap();

        manager.state.write().log.fail_writes();

        assert!(matches!(
            manager.add(hash(2), 100),
            Err(UnorderedTxError::Storage { .. })
        ));
        assert!(!manager.contains(&hash(2)));
        assert_eq!(manager.size(), 1);

        // The log cannot be trusted any more; later writes fail too.
        assert!(matches!(
            manager.admit(hash(3), 100),
            Err(UnorderedTxError::Storage { .. })
        ));
        assert!(!manager.contains(&hash(3)));
    }

    #[test]
    fn test_compaction_waits_for_dead_records() {
        let dir = TempDir::new().unwrap();
        let config = UnorderedTxConfig {
            compaction_min_dead_records: 4,
            ..UnorderedTxConfig::for_testing(dir.path())
        };
        let manager = UnorderedTxManager::open(&config).unwrap();
        for id in 0..6 {
            manager.add(hash(id), 100 + id as u64).unwrap();
        }

        // 2 dead, 4 live: kept.
        assert_eq!(manager.on_new_block(101).unwrap(), 2);
        assert_eq!(manager.stats().compactions, 0);

        // 5 dead, 1 live: compacted.
        assert_eq!(manager.on_new_block(104).unwrap(), 3);
        assert_eq!(manager.stats().compactions, 1);
    }

    #[test]
    fn test_reset_drops_entries_and_log() {
        let dir = TempDir::new().unwrap();
        let manager = open_manager(&dir);
        manager.add(hash(1), 100).unwrap();
        manager.add(hash(2), 200).unwrap();

        assert_eq!(manager.reset().unwrap(), 2);
        assert_eq!(manager.size(), 0);
        manager.close().unwrap();

        let reopened = open_manager(&dir);
        assert_eq!(reopened.size(), 0);
    }

    #[test]
    fn test_config_is_kept() {
        let dir = TempDir::new().unwrap();
        let manager = open_manager(&dir);
        assert_eq!(manager.config(), &UnorderedTxConfig::for_testing(dir.path()));
        assert_eq!(manager.data_dir(), dir.path());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = TempDir::new().unwrap();
        let config = UnorderedTxConfig {
            snapshot_chunk_entries: 0,
            ..UnorderedTxConfig::for_testing(dir.path())
        };
        assert!(matches!(
            UnorderedTxManager::open(&config),
            Err(UnorderedTxError::InvalidConfig(_))
        ));
    }
}
