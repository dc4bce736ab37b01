//! # Expiry Index
//!
//! In-memory set of protected hashes with two views:
//!
//! - `by_hash`: O(1) membership and expiry lookup
//! - `by_expiry`: `(expires_at, hash)` ordered set, so a sweep is a single
//!   `split_off` at the reference time instead of a full scan
//!
//! INVARIANT: both views always hold exactly the same entries.

use super::entities::{Hash, Timestamp, TxEntry};
use std::collections::{BTreeSet, HashMap};

/// Hash → expiry index with expiry-ordered sweeping.
#[derive(Debug, Default, Clone)]
pub struct ExpiryIndex {
    by_hash: HashMap<Hash, Timestamp>,
    by_expiry: BTreeSet<(Timestamp, Hash)>,
}

impl ExpiryIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from entries. Later entries for the same hash win.
    pub fn from_entries(entries: impl IntoIterator<Item = TxEntry>) -> Self {
        let mut index = Self::new();
        for entry in entries {
            index.insert(entry);
        }
        index
    }

    /// Number of entries held.
    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    /// True if no entries are held.
    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    /// Expiry of `hash`, if held.
    pub fn get(&self, hash: &Hash) -> Option<Timestamp> {
        self.by_hash.get(hash).copied()
    }

    /// True if `hash` is held and still live at `reference`.
    pub fn is_live(&self, hash: &Hash, reference: Timestamp) -> bool {
        self.get(hash).is_some_and(|expires_at| expires_at > reference)
    }

    /// Inserts an entry, replacing any previous expiry for the same hash.
    ///
    /// Returns the replaced expiry.
    pub fn insert(&mut self, entry: TxEntry) -> Option<Timestamp> {
        let previous = self.by_hash.insert(entry.hash, entry.expires_at);
        if let Some(old) = previous {
            self.by_expiry.remove(&(old, entry.hash));
        }
        self.by_expiry.insert((entry.expires_at, entry.hash));
        previous
    }

    /// Removes `hash`, returning its expiry.
    pub fn remove(&mut self, hash: &Hash) -> Option<Timestamp> {
        let expires_at = self.by_hash.remove(hash)?;
        self.by_expiry.remove(&(expires_at, *hash));
        Some(expires_at)
    }

    /// Removes every entry with `expires_at <= reference`.
    ///
    /// Returns the removed entries in expiry order.
    pub fn expire(&mut self, reference: Timestamp) -> Vec<TxEntry> {
        let expired = match reference.checked_add(1) {
            Some(bound) => {
                let live = self.by_expiry.split_off(&(bound, [0u8; 32]));
                std::mem::replace(&mut self.by_expiry, live)
            }
            None => std::mem::take(&mut self.by_expiry),
        };

        expired
            .into_iter()
            .map(|(expires_at, hash)| {
                self.by_hash.remove(&hash);
                TxEntry::new(hash, expires_at)
            })
            .collect()
    }

    /// Entries still live at `reference`, in expiry order.
    pub fn live_entries(&self, reference: Timestamp) -> Vec<TxEntry> {
        match reference.checked_add(1) {
            Some(bound) => self
                .by_expiry
                .range((bound, [0u8; 32])..)
                .map(|(expires_at, hash)| TxEntry::new(*hash, *expires_at))
                .collect(),
            None => Vec::new(),
        }
    }

    /// All held entries, in expiry order.
    pub fn entries(&self) -> Vec<TxEntry> {
        self.by_expiry
            .iter()
            .map(|(expires_at, hash)| TxEntry::new(*hash, *expires_at))
            .collect()
    }
}
