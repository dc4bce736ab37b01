//! # Core Primitive Types
//!
//! Aliases used across every subsystem boundary.

/// A 32-byte hash (transaction or block digest).
pub type Hash = [u8; 32];

/// Absolute point in time, in seconds since the Unix epoch.
///
/// Block times and transaction timeouts are both expressed in this unit.
pub type Timestamp = u64;

/// Current wall-clock time as a [`Timestamp`].
pub fn unix_now() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Short hex prefix of a hash for log lines.
pub fn short_hash(hash: &Hash) -> String {
    format!("{:02x}{:02x}{:02x}{:02x}", hash[0], hash[1], hash[2], hash[3])
}
