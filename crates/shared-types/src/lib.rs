//! # Shared Types Crate
//!
//! Types and contracts shared between the node runtime and the subsystems
//! that plug into it.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: primitive aliases (`Hash`, `Timestamp`) are
//!   defined once here.
//! - **Explicit Capabilities**: state that lives outside the commitment store
//!   joins state sync by implementing [`ExtensionSnapshotter`] and being
//!   registered in a [`SnapshotExtensionRegistry`] under a fixed name.

pub mod entities;
pub mod errors;
pub mod snapshot;
pub mod snapshot_registry;

pub use entities::*;
pub use errors::*;
pub use snapshot::*;
pub use snapshot_registry::*;
