//! # Snapshot Extension Contract
//!
//! State that does not live in the commitment store (replay-protection sets,
//! caches that must survive bootstrap) joins state sync as an *extension*.
//!
//! ## Payload Flow
//!
//! ```text
//! Snapshot:  extension ──payload──→ PayloadWriter ──→ host snapshot stream
//! Restore:   host snapshot stream ──→ PayloadReader ──payload──→ extension
//! ```
//!
//! The reader yields `Ok(None)` once the extension's payloads are exhausted.
//! Any error returned by either callback ends the operation and is handed
//! back to the host unchanged.

use crate::errors::ExtensionError;

/// Host callback receiving one encoded payload chunk.
pub type PayloadWriter<'a> = dyn FnMut(Vec<u8>) -> Result<(), ExtensionError> + 'a;

/// Host callback yielding the next payload chunk, or `None` at end of stream.
pub type PayloadReader<'a> = dyn FnMut() -> Result<Option<Vec<u8>>, ExtensionError> + 'a;

/// A pluggable unit of state that participates in snapshot/restore.
///
/// # Example
///
/// ```rust,ignore
/// let mut chunks = Vec::new();
/// extension.snapshot_extension(height, &mut |chunk| {
///     chunks.push(chunk);
///     Ok(())
/// })?;
///
/// let mut iter = chunks.into_iter();
/// fresh.restore_extension(reference, format, &mut || Ok(iter.next()))?;
/// ```
pub trait ExtensionSnapshotter: Send + Sync {
    /// Serializes the extension's current state into `writer`.
    ///
    /// `height` marks the checkpoint being produced.
    fn snapshot_extension(
        &self,
        height: u64,
        writer: &mut PayloadWriter<'_>,
    ) -> Result<(), ExtensionError>;

    /// Rehydrates the extension from the payloads yielded by `reader`.
    ///
    /// `reference` is an opaque comparable point in time supplied by the
    /// host. `format` must be rejected before any payload is read if the
    /// extension does not support it.
    fn restore_extension(
        &self,
        reference: u64,
        format: u32,
        reader: &mut PayloadReader<'_>,
    ) -> Result<(), ExtensionError>;
}
