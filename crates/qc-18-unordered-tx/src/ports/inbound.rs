//! # Inbound Port - ReplayProtectionApi
//!
//! Primary driving port exposing the replay-protection set.
//!
//! ## Callers
//!
//! | Method | Caller |
//! |--------|--------|
//! | `contains` / `admit` / `add` | Transaction admission (ante) path |
//! | `remove` | Admission path, when a transaction is dropped after `add` |
//! | `on_new_block` | Block commit path |
//! | `size` | Operational tooling and tests |

use crate::domain::{Hash, Timestamp, UnorderedTxError};

/// Replay protection for transactions that carry no sequence number.
///
/// Implementations MUST be safe to call concurrently from the admission path
/// and the block commit path.
///
/// # Example
///
/// ```rust,ignore
/// use qc_18_unordered_tx::ports::ReplayProtectionApi;
///
/// fn check_tx(guard: &impl ReplayProtectionApi, hash: [u8; 32], timeout: u64) -> bool {
///     // Atomic check-and-insert; a concurrent duplicate loses the race.
///     guard.admit(hash, timeout).is_ok()
/// }
/// ```
pub trait ReplayProtectionApi: Send + Sync {
    /// True iff `hash` is held and its window is still open.
    ///
    /// Never returns `false` for a live hash that was already added.
    fn contains(&self, hash: &Hash) -> bool;

    /// Registers `hash` until `expires_at`.
    ///
    /// Idempotent: re-adding a live hash leaves state unchanged.
    /// The record is durable before this returns `Ok`.
    ///
    /// # Errors
    /// - `Storage`: replay log append failed; the transaction MUST be rejected
    /// - `ManagerClosed`: the manager was shut down
    fn add(&self, hash: Hash, expires_at: Timestamp) -> Result<(), UnorderedTxError>;

    /// Check-and-add under a single critical section.
    ///
    /// # Errors
    /// - `DuplicateTransaction`: the hash is already live
    /// - Any error from `add`
    fn admit(&self, hash: Hash, expires_at: Timestamp) -> Result<(), UnorderedTxError>;

    /// Drops `hash` regardless of expiry. Returns true if it was held.
    fn remove(&self, hash: &Hash) -> Result<bool, UnorderedTxError>;

    /// Advances the reference time to `block_time` and sweeps expired entries.
    ///
    /// Returns the number of entries removed.
    fn on_new_block(&self, block_time: Timestamp) -> Result<usize, UnorderedTxError>;

    /// Number of entries held (post-sweep semantics).
    fn size(&self) -> usize;
}
