//! In-memory record of tickets that have already been alerted.
//!
//! Lives for the process lifetime only. After a restart every ticket that is
//! still `New` is alerted once more.

use std::collections::HashSet;

/// Tracks alerted ticket identifiers.
#[derive(Debug, Clone, Default)]
pub struct SeenSet {
    seen: HashSet<String>,
}

impl SeenSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a ticket has not been seen yet.
    pub fn is_new(&self, id: &str) -> bool {
        !self.seen.contains(id)
    }

    /// Mark a ticket as seen. Idempotent.
    pub fn mark_seen(&mut self, id: &str) {
        if !self.seen.contains(id) {
            self.seen.insert(id.to_string());
        }
    }

    /// Number of tickets seen so far.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
