//! # Adapters Module
//!
//! Contains adapter implementations for the Unordered Transaction subsystem.
//!
//! ## Modules
//!
//! - `replay_log`: Append-only file log backing the in-memory index

pub mod replay_log;

pub use replay_log::{LogRecord, ReplayLog, RECORD_LEN};
