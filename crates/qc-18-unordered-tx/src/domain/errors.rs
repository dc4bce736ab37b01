//! # Domain Errors
//!
//! Error types for the unordered transaction replay-protection subsystem.
//!
//! ## Taxonomy
//!
//! | Variant | Raised by | Recovery |
//! |---------|-----------|----------|
//! | `Storage` | Replay log append/read/compaction | Fatal to the call; never swallowed |
//! | `CorruptedLog` | Startup load | Fatal; the window cannot be partially trusted |
//! | `DuplicateTransaction` | `admit()` | Reject the transaction |
//! | `FormatMismatch` | Restore | Abort before any read |
//! | `Decode` | Restore | Discard the target manager |
//! | `Extension` | Host payload callbacks | Propagated unchanged |

use super::entities::{Hash, SNAPSHOT_NAME};
use shared_types::{short_hash, ExtensionError};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Unordered transaction subsystem error type.
#[derive(Debug, Error)]
pub enum UnorderedTxError {
    /// Replay log I/O failed.
    #[error("Replay log I/O error at {}: {source}", .path.display())]
    Storage {
        /// File or directory being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A complete replay log record failed validation at startup.
    #[error("Corrupted replay log record at offset {offset}: {reason}")]
    CorruptedLog {
        /// Byte offset of the offending record.
        offset: u64,
        /// What failed.
        reason: String,
    },

    /// Hash is already inside an open protection window.
    #[error("Duplicate unordered transaction: {}", short_hash(.0))]
    DuplicateTransaction(Hash),

    /// Manager was closed; no further writes are accepted.
    #[error("Unordered transaction manager is closed")]
    ManagerClosed,

    /// Restore requested with an unsupported format.
    #[error("Unsupported snapshot format {got} (supported: {supported})")]
    FormatMismatch {
        /// Requested format.
        got: u32,
        /// Supported format.
        supported: u32,
    },

    /// Snapshot payload is malformed.
    #[error("Snapshot decode error: {0}")]
    Decode(String),

    /// Configuration rejected by `validate()`.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error produced by a host payload callback.
    #[error(transparent)]
    Extension(#[from] ExtensionError),
}

impl UnorderedTxError {
    /// Wraps an I/O error with the path it occurred on.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }
}

impl From<UnorderedTxError> for ExtensionError {
    fn from(err: UnorderedTxError) -> Self {
        match err {
            UnorderedTxError::Extension(inner) => inner,
            UnorderedTxError::FormatMismatch { got, supported } => ExtensionError::FormatMismatch {
                extension: SNAPSHOT_NAME.to_string(),
                got,
                supported,
            },
            UnorderedTxError::Decode(msg) => ExtensionError::Decode(msg),
            other => ExtensionError::Storage(other.to_string()),
        }
    }
}
