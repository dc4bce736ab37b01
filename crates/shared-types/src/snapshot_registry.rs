//! # Snapshot Extension Registry
//!
//! Holds every extension that participates in state sync, keyed by its fixed
//! extension name.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut registry = SnapshotExtensionRegistry::new();
//! registry.register(SNAPSHOT_NAME, SNAPSHOT_FORMAT, Arc::new(snapshotter))?;
//!
//! // Snapshot production (serving node)
//! let items = registry.snapshot_all(height)?;
//!
//! // Bootstrap (new node)
//! for item in &items {
//!     registry.restore(reference_time, item)?;
//! }
//! ```

use crate::errors::ExtensionError;
use crate::snapshot::ExtensionSnapshotter;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Payload chunks produced by one extension for one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSnapshot {
    /// Extension name the chunks belong to.
    pub name: String,
    /// Format the chunks were written in.
    pub format: u32,
    /// Encoded payload chunks, in emission order.
    pub chunks: Vec<Vec<u8>>,
}

impl ExtensionSnapshot {
    /// Total payload size in bytes.
    pub fn size_bytes(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }
}

/// Entry for a registered extension.
struct RegisteredExtension {
    format: u32,
    extension: Arc<dyn ExtensionSnapshotter>,
}

/// Central registry of snapshot extensions.
///
/// Extensions are visited in name order so snapshot streams are deterministic.
#[derive(Default)]
pub struct SnapshotExtensionRegistry {
    extensions: BTreeMap<String, RegisteredExtension>,
}

impl SnapshotExtensionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extension under `name`, producing payloads in `format`.
    ///
    /// # Errors
    ///
    /// `DuplicateExtension` if the name is already taken.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        format: u32,
        extension: Arc<dyn ExtensionSnapshotter>,
    ) -> Result<(), ExtensionError> {
        let name = name.into();
        if self.extensions.contains_key(&name) {
            warn!("[Registry] Snapshot extension {} already registered", name);
            return Err(ExtensionError::DuplicateExtension(name));
        }

        info!(
            "[Registry] Registering snapshot extension {} (format {})",
            name, format
        );
        self.extensions
            .insert(name, RegisteredExtension { format, extension });
        Ok(())
    }

    /// Check if an extension is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.extensions.contains_key(name)
    }

    /// Format an extension produces, if registered.
    pub fn format(&self, name: &str) -> Option<u32> {
        self.extensions.get(name).map(|e| e.format)
    }

    /// Registered extension names, in snapshot order.
    pub fn names(&self) -> Vec<String> {
        self.extensions.keys().cloned().collect()
    }

    /// Snapshot every registered extension at `height`.
    ///
    /// Stops at the first failing extension.
    pub fn snapshot_all(&self, height: u64) -> Result<Vec<ExtensionSnapshot>, ExtensionError> {
        let mut items = Vec::with_capacity(self.extensions.len());

        for (name, entry) in &self.extensions {
            let mut chunks = Vec::new();
            let mut writer = |chunk: Vec<u8>| -> Result<(), ExtensionError> {
                chunks.push(chunk);
                Ok(())
            };
            entry.extension.snapshot_extension(height, &mut writer)?;

            debug!(
                "[Registry] Extension {} produced {} chunks at height {}",
                name,
                chunks.len(),
                height
            );
            items.push(ExtensionSnapshot {
                name: name.clone(),
                format: entry.format,
                chunks,
            });
        }

        Ok(items)
    }

    /// Restore one extension from a snapshot item.
    ///
    /// The item's recorded format is passed through; the extension decides
    /// whether it supports it.
    pub fn restore(&self, reference: u64, item: &ExtensionSnapshot) -> Result<(), ExtensionError> {
        let entry = self
            .extensions
            .get(&item.name)
            .ok_or_else(|| ExtensionError::UnknownExtension(item.name.clone()))?;

        let mut chunks = item.chunks.iter();
        let mut reader = || -> Result<Option<Vec<u8>>, ExtensionError> {
            Ok(chunks.next().cloned())
        };
        entry
            .extension
            .restore_extension(reference, item.format, &mut reader)?;

        info!(
            "[Registry] Restored extension {} ({} bytes)",
            item.name,
            item.size_bytes()
        );
        Ok(())
    }
}
