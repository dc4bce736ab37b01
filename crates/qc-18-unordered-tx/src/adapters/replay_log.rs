//! # Replay Log
//!
//! Append-only on-disk record of protected hashes, read only at startup to
//! rebuild the in-memory index.
//!
//! ## File Layout
//!
//! ```text
//! [MAGIC: 8]
//! [RECORD]*     RECORD = [KIND: 1][HASH: 32][EXPIRES_AT: u64 LE][CRC32: u32 LE]
//! ```
//!
//! `KIND` is `1` for an insertion and `2` for a removal. The checksum covers
//! the 41 bytes before it. Later records supersede earlier ones.
//!
//! ## Crash Safety
//!
//! - Appends are fsynced before the caller acknowledges the transaction.
//! - Compaction writes `unordered_txs.log.compact`, fsyncs it and renames it
//!   over the live file. A crash leaves either the old or the new log intact.
//! - A short trailing record (write interrupted before acknowledgment) is
//!   truncated on open. A full record with a bad checksum is fatal.
//! - A failed append is cut back to the last complete record before the
//!   error is returned, so later appends stay aligned.

use crate::domain::{Hash, Timestamp, TxEntry, UnorderedTxError};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Magic bytes for unordered_txs.log.
const LOG_MAGIC: &[u8; 8] = b"QCUTXL\x00\x01";

/// Size of one encoded record.
pub const RECORD_LEN: usize = 1 + 32 + 8 + 4;

const KIND_ADD: u8 = 1;
const KIND_REMOVE: u8 = 2;

/// One replay log record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogRecord {
    /// Hash protected until the given expiry.
    Add(TxEntry),
    /// Hash dropped before expiry.
    Remove(Hash),
}

impl LogRecord {
    fn encode(&self) -> [u8; RECORD_LEN] {
        let (kind, hash, expires_at) = match self {
            LogRecord::Add(entry) => (KIND_ADD, entry.hash, entry.expires_at),
            LogRecord::Remove(hash) => (KIND_REMOVE, *hash, 0),
        };

        let mut buf = [0u8; RECORD_LEN];
        buf[0] = kind;
        buf[1..33].copy_from_slice(&hash);
        buf[33..41].copy_from_slice(&expires_at.to_le_bytes());
        let crc = crc32fast::hash(&buf[..41]);
        buf[41..45].copy_from_slice(&crc.to_le_bytes());
        buf
    }

    fn decode(bytes: &[u8], offset: u64) -> Result<Self, UnorderedTxError> {
        let corrupted = |reason: String| UnorderedTxError::CorruptedLog { offset, reason };

        let mut crc_bytes = [0u8; 4];
        crc_bytes.copy_from_slice(&bytes[41..45]);
        let expected = u32::from_le_bytes(crc_bytes);
        let actual = crc32fast::hash(&bytes[..41]);
        if expected != actual {
            return Err(corrupted(format!(
                "checksum mismatch: expected {:08x}, got {:08x}",
                expected, actual
            )));
        }

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes[1..33]);
        let mut expiry_bytes = [0u8; 8];
        expiry_bytes.copy_from_slice(&bytes[33..41]);
        let expires_at = Timestamp::from_le_bytes(expiry_bytes);

        match bytes[0] {
            KIND_ADD => Ok(LogRecord::Add(TxEntry::new(hash, expires_at))),
            KIND_REMOVE => Ok(LogRecord::Remove(hash)),
            kind => Err(corrupted(format!("unknown record kind {}", kind))),
        }
    }
}

/// File-backed append-only replay log.
///
/// INVARIANT: the file always ends on a record boundary at `len`. A write
/// that fails part-way is cut back to `len`; if that is impossible the log
/// is poisoned and refuses every further write.
#[derive(Debug)]
pub struct ReplayLog {
    path: PathBuf,
    file: Option<File>,
    sync_writes: bool,
    /// Length of the file up to the last complete record.
    len: u64,
    /// Complete records currently in the file.
    records: u64,
    poisoned: bool,
    appended: u64,
    compactions: u64,
}

impl ReplayLog {
    /// Log file name inside the data directory.
    pub const FILE_NAME: &'static str = "unordered_txs.log";

    /// Extension of the in-progress compaction file.
    const COMPACT_EXTENSION: &'static str = "log.compact";

    /// Opens (creating if absent) the log in `data_dir` and replays it.
    ///
    /// Returns the log handle and the entries it describes.
    ///
    /// # Errors
    ///
    /// - `Storage` on any I/O failure
    /// - `CorruptedLog` on a bad magic, checksum or record kind
    pub fn open(
        data_dir: &Path,
        sync_writes: bool,
    ) -> Result<(Self, Vec<TxEntry>), UnorderedTxError> {
        fs::create_dir_all(data_dir).map_err(|e| UnorderedTxError::storage(data_dir, e))?;

        let path = data_dir.join(Self::FILE_NAME);
        let compact_path = path.with_extension(Self::COMPACT_EXTENSION);
        if compact_path.exists() {
            warn!(
                "[qc-18] Removing interrupted compaction file {}",
                compact_path.display()
            );
            fs::remove_file(&compact_path)
                .map_err(|e| UnorderedTxError::storage(&compact_path, e))?;
        }

        let (entries, records) = match File::open(&path) {
            Ok(mut file) => {
                let mut bytes = Vec::new();
                file.read_to_end(&mut bytes)
                    .map_err(|e| UnorderedTxError::storage(&path, e))?;
                info!(
                    "[qc-18] Found existing replay log: {} ({} bytes)",
                    path.display(),
                    bytes.len()
                );
                Self::replay(&path, &bytes)?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("[qc-18] No existing replay log at {}", path.display());
                write_log_file(&path, &[], sync_writes)?;
                (Vec::new(), 0)
            }
            Err(e) => return Err(UnorderedTxError::storage(&path, e)),
        };

        let file = open_append(&path)?;
        info!(
            "[qc-18] Loaded {} entries from {}",
            entries.len(),
            path.display()
        );

        Ok((
            Self {
                path,
                file: Some(file),
                sync_writes,
                len: committed_len(records),
                records,
                poisoned: false,
                appended: 0,
                compactions: 0,
            },
            entries,
        ))
    }

    /// Decodes `bytes` and folds the records into the surviving entries.
    ///
    /// Returns the entries and the number of complete records.
    fn replay(path: &Path, bytes: &[u8]) -> Result<(Vec<TxEntry>, u64), UnorderedTxError> {
        if bytes.len() < LOG_MAGIC.len() || &bytes[..LOG_MAGIC.len()] != LOG_MAGIC {
            return Err(UnorderedTxError::CorruptedLog {
                offset: 0,
                reason: "invalid magic".to_string(),
            });
        }

        let body = &bytes[LOG_MAGIC.len()..];
        let mut live: HashMap<Hash, Timestamp> = HashMap::new();
        let mut records = body.chunks_exact(RECORD_LEN);
        let mut count = 0u64;

        for (i, raw) in records.by_ref().enumerate() {
            let offset = (LOG_MAGIC.len() + i * RECORD_LEN) as u64;
            match LogRecord::decode(raw, offset)? {
                LogRecord::Add(entry) => {
                    live.insert(entry.hash, entry.expires_at);
                }
                LogRecord::Remove(hash) => {
                    live.remove(&hash);
                }
            }
            count += 1;
        }

        let torn = records.remainder().len();
        if torn > 0 {
            warn!(
                "[qc-18] Truncating {} bytes of torn trailing record in {}",
                torn,
                path.display()
            );
            let file = OpenOptions::new()
                .write(true)
                .open(path)
                .map_err(|e| UnorderedTxError::storage(path, e))?;
            file.set_len(committed_len(count))
                .and_then(|_| file.sync_all())
                .map_err(|e| UnorderedTxError::storage(path, e))?;
        }

        let entries = live
            .into_iter()
            .map(|(hash, expires_at)| TxEntry::new(hash, expires_at))
            .collect();
        Ok((entries, count))
    }

    /// Path of the live log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True until `close()` is called or the log is poisoned.
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// True once a failed write could not be rolled back.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Records appended since open.
    pub fn appended(&self) -> u64 {
        self.appended
    }

    /// Complete records in the current file, live or not.
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Compactions performed since open.
    pub fn compactions(&self) -> u64 {
        self.compactions
    }

    fn ensure_writable(&self) -> Result<(), UnorderedTxError> {
        if self.poisoned {
            return Err(UnorderedTxError::storage(
                &self.path,
                std::io::Error::new(
                    ErrorKind::Other,
                    "replay log poisoned by an earlier failed write",
                ),
            ));
        }
        if self.file.is_none() {
            return Err(UnorderedTxError::ManagerClosed);
        }
        Ok(())
    }

    /// Appends one record; durable on return when `sync_writes` is set.
    ///
    /// On failure nothing of the record is left in the file.
    pub fn append(&mut self, record: &LogRecord) -> Result<(), UnorderedTxError> {
        self.ensure_writable()?;
        let sync = self.sync_writes;
        let file = self.file.as_mut().ok_or(UnorderedTxError::ManagerClosed)?;

        let written = file.write_all(&record.encode()).and_then(|_| {
            if sync {
                file.sync_data()
            } else {
                Ok(())
            }
        });
        if let Err(e) = written {
            self.discard_uncommitted();
            return Err(UnorderedTxError::storage(&self.path, e));
        }

        self.len += RECORD_LEN as u64;
        self.records += 1;
        self.appended += 1;
        Ok(())
    }

    /// Cuts the file back to the last complete record, or poisons the log.
    fn discard_uncommitted(&mut self) {
        let rolled_back = match self.file.as_ref() {
            Some(file) => file.set_len(self.len).is_ok(),
            None => false,
        };

        if rolled_back {
            warn!(
                "[qc-18] Rolled back failed append in {} to {} bytes",
                self.path.display(),
                self.len
            );
        } else {
            error!(
                "[qc-18] Cannot roll back failed append in {}; refusing further writes",
                self.path.display()
            );
            self.poisoned = true;
            self.file = None;
        }
    }

    /// Rewrites the log so it holds exactly `live`.
    ///
    /// Write-new-then-swap: the old log stays authoritative until the rename.
    /// On failure the handle is reopened on whichever file now sits at the
    /// live path; if even that fails the log is poisoned.
    pub fn compact(&mut self, live: &[TxEntry]) -> Result<(), UnorderedTxError> {
        self.ensure_writable()?;

        let records: Vec<LogRecord> = live.iter().copied().map(LogRecord::Add).collect();

        // The old handle must not outlive a rename over its inode.
        self.file = None;
        let written = write_log_file(&self.path, &records, true);

        let reopened = open_append(&self.path).and_then(|file| {
            let len = file
                .metadata()
                .map_err(|e| UnorderedTxError::storage(&self.path, e))?
                .len();
            Ok((file, len))
        });
        match reopened {
            Ok((file, len)) => {
                self.file = Some(file);
                self.len = len;
                self.records = len.saturating_sub(LOG_MAGIC.len() as u64) / RECORD_LEN as u64;
            }
            Err(e) => {
                error!(
                    "[qc-18] Cannot reopen replay log {} after compaction; refusing further writes",
                    self.path.display()
                );
                self.poisoned = true;
                return Err(e);
            }
        }

        if let Err(e) = written {
            warn!(
                "[qc-18] Compaction of {} failed, keeping {} records: {}",
                self.path.display(),
                self.records,
                e
            );
            return Err(e);
        }

        self.compactions += 1;
        debug!(
            "[qc-18] Compacted replay log to {} entries ({})",
            live.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Flushes buffered data to disk.
    pub fn flush(&mut self) -> Result<(), UnorderedTxError> {
        if let Some(file) = self.file.as_mut() {
            file.flush()
                .and_then(|_| file.sync_all())
                .map_err(|e| UnorderedTxError::storage(&self.path, e))?;
        }
        Ok(())
    }

    /// Flushes and releases the file handle. Idempotent.
    pub fn close(&mut self) -> Result<(), UnorderedTxError> {
        self.flush()?;
        self.file = None;
        Ok(())
    }

    /// Replaces the append handle with a read-only one so every write fails.
    #[cfg(test)]
    pub(crate) fn fail_writes(&mut self) {
        self.file = File::open(&self.path).ok();
    }
}

fn committed_len(records: u64) -> u64 {
    LOG_MAGIC.len() as u64 + records * RECORD_LEN as u64
}

fn open_append(path: &Path) -> Result<File, UnorderedTxError> {
    OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| UnorderedTxError::storage(path, e))
}

/// Writes a complete log (magic + records) atomically via a temp file.
fn write_log_file(
    path: &Path,
    records: &[LogRecord],
    sync: bool,
) -> Result<(), UnorderedTxError> {
    let temp_path = path.with_extension(ReplayLog::COMPACT_EXTENSION);

    let mut bytes = Vec::with_capacity(LOG_MAGIC.len() + records.len() * RECORD_LEN);
    bytes.extend_from_slice(LOG_MAGIC);
    for record in records {
        bytes.extend_from_slice(&record.encode());
    }

    let mut file = File::create(&temp_path).map_err(|e| UnorderedTxError::storage(&temp_path, e))?;
    file.write_all(&bytes)
        .map_err(|e| UnorderedTxError::storage(&temp_path, e))?;
    if sync {
        file.sync_all()
            .map_err(|e| UnorderedTxError::storage(&temp_path, e))?;
    }
    drop(file);

    fs::rename(&temp_path, path).map_err(|e| UnorderedTxError::storage(path, e))?;
    if sync {
        sync_parent_dir(path)?;
    }
    Ok(())
}

/// Persists the directory entry after a rename.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<(), UnorderedTxError> {
    if let Some(parent) = path.parent() {
        File::open(parent)
            .and_then(|dir| dir.sync_all())
            .map_err(|e| UnorderedTxError::storage(parent, e))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> Result<(), UnorderedTxError> {
    Ok(())
}
