use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::ticket::Ticket;

/// Position of a queued ticket. Ordering is by creation time, then id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BacklogEntry {
    pub created_at: DateTime<Utc>,
    pub ticket_id: i64,
}

impl BacklogEntry {
    pub fn of(ticket: &Ticket) -> Self {
        Self {
            created_at: ticket.created_at,
            ticket_id: ticket.id,
        }
    }
}

/// Ordered set of the queued tickets of one desk.
///
/// Insertion and removal are O(log n). Because the key carries the original
/// creation time, a requeued ticket goes back to the position it had.
#[derive(Debug, Default)]
pub struct Backlog {
    entries: BTreeSet<BacklogEntry>,
}

impl Backlog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the entry was already present.
    pub fn insert(&mut self, entry: BacklogEntry) -> bool {
        self.entries.insert(entry)
    }

    pub fn remove(&mut self, entry: &BacklogEntry) -> bool {
        self.entries.remove(entry)
    }

    pub fn pop_front(&mut self) -> Option<BacklogEntry> {
        self.entries.pop_first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries in claim order.
    pub fn iter(&self) -> impl Iterator<Item = &BacklogEntry> {
        self.entries.iter()
    }
}
