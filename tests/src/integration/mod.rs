//! # Integration Flows
//!
//! Exercise the replay-protection manager the way a node drives it: the
//! admission path, the block commit path and state-sync bootstrap at once.

pub mod state_sync;
