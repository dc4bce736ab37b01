//! # Error Types
//!
//! Errors of the state-sync snapshot extension contract.

use thiserror::Error;

/// Errors raised while producing or restoring a snapshot extension.
///
/// `Writer` and `Reader` are produced by the host's payload callbacks.
/// Extensions return them unchanged so the host sees its own failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtensionError {
    /// Restore requested with a format the extension does not understand.
    #[error("Unsupported snapshot format {got} for extension {extension} (supported: {supported})")]
    FormatMismatch {
        /// Extension name.
        extension: String,
        /// Format requested by the caller.
        got: u32,
        /// The only format the extension accepts.
        supported: u32,
    },

    /// Payload bytes could not be decoded.
    #[error("Snapshot payload decode error: {0}")]
    Decode(String),

    /// The extension's own storage failed.
    #[error("Extension storage error: {0}")]
    Storage(String),

    /// Host payload writer failed.
    #[error("Payload writer error: {0}")]
    Writer(String),

    /// Host payload reader failed.
    #[error("Payload reader error: {0}")]
    Reader(String),

    /// No extension registered under this name.
    #[error("Unknown snapshot extension: {0}")]
    UnknownExtension(String),

    /// An extension with this name is already registered.
    #[error("Snapshot extension already registered: {0}")]
    DuplicateExtension(String),
}
