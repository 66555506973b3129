//! Ticket storage trait and types.

use thiserror::Error;

use crate::error::ErrorKind;
use crate::lifecycle::Transition;
use crate::ticket::{Ticket, TicketStatus};

/// Error type for ticket operations.
#[derive(Debug, Error)]
pub enum TicketError {
    /// Ticket not found.
    #[error("Ticket not found: {0}")]
    NotFound(i64),

    /// The referenced desk does not exist.
    #[error("Desk not found: {0}")]
    DeskNotFound(i64),

    /// The referenced desk is deactivated.
    #[error("Desk {0} is inactive")]
    DeskInactive(String),

    /// Status change not permitted from the current status.
    #[error("Cannot {transition} ticket {ticket_id}: current status is {from}")]
    InvalidTransition {
        ticket_id: i64,
        from: TicketStatus,
        transition: &'static str,
    },

    /// Someone else already claimed the ticket.
    #[error("Ticket {ticket_id} is already claimed")]
    AlreadyClaimed {
        ticket_id: i64,
        operator: Option<String>,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl TicketError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TicketError::NotFound(_) | TicketError::DeskNotFound(_) => ErrorKind::NotFound,
            TicketError::DeskInactive(_) => ErrorKind::Inactive,
            TicketError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            TicketError::AlreadyClaimed { .. } => ErrorKind::AlreadyClaimed,
            TicketError::Database(_) => ErrorKind::Storage,
        }
    }
}

impl From<rusqlite::Error> for TicketError {
    fn from(e: rusqlite::Error) -> Self {
        TicketError::Database(e.to_string())
    }
}

/// Filter for querying tickets.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    /// Filter by status.
    pub status: Option<TicketStatus>,
    /// Filter by owning desk.
    pub desk_id: Option<i64>,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl TicketFilter {
    /// Create a new filter with defaults.
    pub fn new() -> Self {
        Self {
            status: None,
            desk_id: None,
            limit: 100,
            offset: 0,
        }
    }

    /// Filter by status.
    pub fn with_status(mut self, status: TicketStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filter by desk.
    pub fn with_desk_id(mut self, desk_id: i64) -> Self {
        self.desk_id = Some(desk_id);
        self
    }

    /// Set limit.
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Set offset.
    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    /// Drop pagination, keeping the predicates.
    pub fn unbounded(self) -> Self {
        Self {
            limit: i64::MAX,
            offset: 0,
            ..self
        }
    }
}

/// Trait for ticket storage backends.
///
/// Implementations must apply every write atomically: a failed call leaves
/// the stored ticket exactly as it was.
pub trait TicketStore: Send + Sync {
    /// Create a queued ticket for an existing, active desk.
    fn create(&self, desk_id: i64) -> Result<Ticket, TicketError>;

    /// Get a ticket by ID.
    fn get(&self, id: i64) -> Result<Ticket, TicketError>;

    /// List tickets matching the filter, oldest first.
    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError>;

    /// Count tickets matching the filter (pagination is ignored).
    fn count(&self, filter: &TicketFilter) -> Result<i64, TicketError>;

    /// Apply a lifecycle transition, stamping `modified_at`.
    fn update(&self, id: i64, transition: &Transition) -> Result<Ticket, TicketError>;

    /// Move a queued ticket to another active desk. The status does not
    /// change, so neither does `modified_at`.
    fn reassign(&self, id: i64, desk_id: i64) -> Result<Ticket, TicketError>;
}
