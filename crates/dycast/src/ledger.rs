//! Deduplication ledger.

use rustc_hash::FxHashSet;

/// Set of message identifiers seen within one capture session.
///
/// Owned by the consumer-side dispatch path. It deliberately survives
/// internal reconnects, so frames the platform re-delivers after a reconnect
/// are dropped instead of double-counted. There is no eviction: the ledger is
/// cleared only when the consumer starts a new capture.
#[derive(Debug, Default)]
pub struct DedupLedger {
    seen: FxHashSet<String>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id`; returns `false` if it was already present.
    pub fn insert(&mut self, id: &str) -> bool {
        self.seen.insert(id.to_string())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Drop all recorded ids (new capture session).
    pub fn clear(&mut self) {
        self.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
