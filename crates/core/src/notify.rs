//! Ticket change notifications for live observers.
//!
//! Delivery is best-effort: a subscriber that falls behind skips to the most
//! recent messages, and nothing is replayed to late subscribers. Changes to
//! one ticket are published in the order they were committed.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::ticket::Ticket;

/// What happened to the ticket.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Claimed,
    Requeued,
    Closed,
    Reassigned,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Claimed => "claimed",
            ChangeKind::Requeued => "requeued",
            ChangeKind::Closed => "closed",
            ChangeKind::Reassigned => "reassigned",
        }
    }
}

/// A committed change, carrying the ticket as it is after the change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TicketChange {
    pub kind: ChangeKind,
    pub ticket: Ticket,
}

/// Publisher side of the change stream. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<TicketChange>,
}

impl ChangeNotifier {
    /// Create a notifier whose subscribers buffer up to `capacity` changes.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish a change. Never blocks.
    pub fn publish(&self, kind: ChangeKind, ticket: &Ticket) {
        // Send errors only mean nobody is listening
        let _ = self.sender.send(TicketChange {
            kind,
            ticket: ticket.clone(),
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TicketChange> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(256)
    }
}
