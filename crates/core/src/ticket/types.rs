//! Core ticket data types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle stage of a ticket.
///
/// Declared in workflow order: a ticket only ever moves forward, except for
/// the requeue step back from `InProgress` to `Queued`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Waiting in the desk backlog.
    Queued,
    /// Claimed by an operator and being served.
    InProgress,
    /// Finished or withdrawn. Terminal.
    Closed,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 3] = [
        TicketStatus::Queued,
        TicketStatus::InProgress,
        TicketStatus::Closed,
    ];

    /// Returns the status as the string used in storage and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Queued => "queued",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Closed => "closed",
        }
    }

    /// Parse the storage/wire representation.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TicketStatus::Closed)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a ticket was closed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// Served to completion by the desk.
    Completed,
    /// Withdrawn while still waiting.
    Cancelled,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::Completed => "completed",
            CloseReason::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "completed" => Some(CloseReason::Completed),
            "cancelled" => Some(CloseReason::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ticket (bon) routed to a desk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Store-assigned identifier; strictly increasing in creation order.
    pub id: i64,
    /// Desk currently owning the ticket.
    pub desk_id: i64,
    /// Sequence number printed on the ticket, per issuing desk.
    pub number: u32,
    pub status: TicketStatus,
    /// Operator token of the current (or last) claimant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    /// Set only once the ticket is closed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_reason: Option<CloseReason>,
    /// Immutable; orders the backlog.
    pub created_at: DateTime<Utc>,
    /// Bumped on every status transition, and only then.
    pub modified_at: DateTime<Utc>,
}

impl Ticket {
    pub fn is_queued(&self) -> bool {
        self.status == TicketStatus::Queued
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings_round_trip() {
        for status in TicketStatus::ALL {
            assert_eq!(TicketStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TicketStatus::parse("taken"), None);
    }

    #[test]
    fn test_status_workflow_order() {
        assert!(TicketStatus::Queued < TicketStatus::InProgress);
        assert!(TicketStatus::InProgress < TicketStatus::Closed);
    }

    #[test]
    fn test_only_closed_is_terminal() {
        assert!(!TicketStatus::Queued.is_terminal());
        assert!(!TicketStatus::InProgress.is_terminal());
        assert!(TicketStatus::Closed.is_terminal());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&TicketStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");

        let deserialized: TicketStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, TicketStatus::InProgress);
    }

    #[test]
    fn test_close_reason_parse() {
        assert_eq!(CloseReason::parse("completed"), Some(CloseReason::Completed));
        assert_eq!(CloseReason::parse("cancelled"), Some(CloseReason::Cancelled));
        assert_eq!(CloseReason::parse("abandoned"), None);
    }

    #[test]
    fn test_ticket_serialization_skips_empty_fields() {
        let now = Utc::now();
        let ticket = Ticket {
            id: 1,
            desk_id: 2,
            number: 3,
            status: TicketStatus::Queued,
            operator: None,
            close_reason: None,
            created_at: now,
            modified_at: now,
        };

        let json = serde_json::to_string(&ticket).unwrap();
        assert!(json.contains("\"deskId\":2"));
        assert!(json.contains("\"status\":\"queued\""));
        assert!(!json.contains("operator"));
        assert!(!json.contains("closeReason"));

        let deserialized: Ticket = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, ticket);
    }
}
