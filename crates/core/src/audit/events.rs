use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    // System events
    ServiceStarted {
        version: String,
        config_hash: String,
    },
    ServiceStopped {
        reason: String,
    },

    // Desk registry
    DeskRegistered {
        desk_id: i64,
        desk_code: String,
        name: String,
    },
    DeskUpdated {
        desk_id: i64,
        desk_code: String,
        /// Code before the edit, when it changed
        #[serde(default, skip_serializing_if = "Option::is_none")]
        previous_code: Option<String>,
    },
    DeskActivated {
        desk_id: i64,
        desk_code: String,
    },
    DeskDeactivated {
        desk_id: i64,
        desk_code: String,
        /// Tickets still waiting when the desk was closed
        queued: usize,
    },

    // Ticket lifecycle
    TicketCreated {
        ticket_id: i64,
        desk_id: i64,
        desk_code: String,
        number: u32,
    },
    TicketClaimed {
        ticket_id: i64,
        desk_id: i64,
        desk_code: String,
        /// Opaque operator token
        operator: String,
        /// Seconds since the ticket last entered the backlog
        waited_secs: f64,
    },
    TicketRequeued {
        ticket_id: i64,
        desk_id: i64,
        desk_code: String,
        /// Operator that gave the ticket back
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operator: Option<String>,
    },
    TicketClosed {
        ticket_id: i64,
        desk_id: i64,
        desk_code: String,
        /// "completed" or "cancelled"
        reason: String,
        previous_status: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operator: Option<String>,
    },
    TicketReassigned {
        ticket_id: i64,
        /// Destination desk
        desk_id: i64,
        from_desk: String,
        to_desk: String,
    },
}

impl AuditEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ServiceStarted { .. } => "service_started",
            Self::ServiceStopped { .. } => "service_stopped",
            Self::DeskRegistered { .. } => "desk_registered",
            Self::DeskUpdated { .. } => "desk_updated",
            Self::DeskActivated { .. } => "desk_activated",
            Self::DeskDeactivated { .. } => "desk_deactivated",
            Self::TicketCreated { .. } => "ticket_created",
            Self::TicketClaimed { .. } => "ticket_claimed",
            Self::TicketRequeued { .. } => "ticket_requeued",
            Self::TicketClosed { .. } => "ticket_closed",
            Self::TicketReassigned { .. } => "ticket_reassigned",
        }
    }

    pub fn ticket_id(&self) -> Option<i64> {
        match self {
            Self::TicketCreated { ticket_id, .. }
            | Self::TicketClaimed { ticket_id, .. }
            | Self::TicketRequeued { ticket_id, .. }
            | Self::TicketClosed { ticket_id, .. }
            | Self::TicketReassigned { ticket_id, .. } => Some(*ticket_id),
            _ => None,
        }
    }

    /// Desk the event concerns, by id so history survives a code change.
    /// Reassignments report the destination.
    pub fn desk_id(&self) -> Option<i64> {
        match self {
            Self::DeskRegistered { desk_id, .. }
            | Self::DeskUpdated { desk_id, .. }
            | Self::DeskActivated { desk_id, .. }
            | Self::DeskDeactivated { desk_id, .. }
            | Self::TicketCreated { desk_id, .. }
            | Self::TicketClaimed { desk_id, .. }
            | Self::TicketRequeued { desk_id, .. }
            | Self::TicketClosed { desk_id, .. }
            | Self::TicketReassigned { desk_id, .. } => Some(*desk_id),
            Self::ServiceStarted { .. } | Self::ServiceStopped { .. } => None,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::TicketClaimed { operator, .. } => Some(operator),
            Self::TicketRequeued { operator, .. } | Self::TicketClosed { operator, .. } => {
                operator.as_deref()
            }
            _ => None,
        }
    }
}

/// A stored audit record with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub ticket_id: Option<i64>,
    pub desk_id: Option<i64>,
    pub user_id: Option<String>,
    pub data: AuditEvent,
}

impl AuditRecord {
    /// Build an unsaved record; the store assigns the id.
    pub fn from_event(timestamp: DateTime<Utc>, event: AuditEvent) -> Self {
        Self {
            id: 0,
            timestamp,
            event_type: event.event_type().to_string(),
            ticket_id: event.ticket_id(),
            desk_id: event.desk_id(),
            user_id: event.user_id().map(String::from),
            data: event,
        }
    }
}
