//! # Domain Layer - Unordered Transaction Replay Protection
//!
//! Pure business logic with no I/O.
//!
//! ## Components
//!
//! - `entities`: TxEntry, ManagerStats, snapshot constants
//! - `index`: ExpiryIndex (hash lookup + expiry-ordered sweep)
//! - `errors`: UnorderedTxError enumeration
//!
//! ## Data Types
//!
//! - Hash: `[u8; 32]` (transaction hash, from shared-types)
//! - Timestamp: `u64` Unix seconds (from shared-types)

pub mod entities;
pub mod errors;
pub mod index;

pub use entities::*;
pub use errors::*;
pub use index::*;
