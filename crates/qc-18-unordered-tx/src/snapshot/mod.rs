//! State-sync snapshot extension for the replay-protection set.

pub mod codec;
pub mod snapshotter;

pub use codec::{decode_chunk, decode_header, encode_chunk, encode_header};
pub use snapshotter::UnorderedTxSnapshotter;
