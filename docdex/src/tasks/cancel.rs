//! Cancellation registry consulted by retry loops and workers.
//!
//! Logically each flag belongs to a task record, but the flags live in their
//! own concurrent map because they are read from a different code path
//! (remote-call retry loops) than the status-update path, and those reads
//! must not contend with the record lock.

use dashmap::DashMap;

/// Tracks which task identifiers have been marked cancelled.
///
/// Requesting cancellation is idempotent; flags are only removed when the
/// owning record is cleaned up.
#[derive(Debug, Default)]
pub struct CancellationRegistry {
    flags: DashMap<String, ()>,
}

impl CancellationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks cancellation as requested for `id`. No-op if already set.
    pub fn request_cancel(&self, id: &str) {
        self.flags.insert(id.to_string(), ());
    }

    /// Returns the current flag value; `false` for identifiers that were
    /// never flagged.
    #[must_use]
    pub fn is_cancelled(&self, id: &str) -> bool {
        self.flags.contains_key(id)
    }

    /// Removes the flag for `id`, if any. Called when the owning record is
    /// removed from the store.
    pub fn clear(&self, id: &str) {
        self.flags.remove(id);
    }

    /// Returns the number of flagged identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Returns true if no identifier is flagged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}
