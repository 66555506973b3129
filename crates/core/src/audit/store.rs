//! Storage seam for the audit trail.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::AuditRecord;

/// Page size used when a query does not ask for one.
pub const DEFAULT_PAGE_SIZE: i64 = 100;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Audit storage failed: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Audit payload unreadable: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Which slice of the audit trail to read.
///
/// Desks are matched by id, so a desk keeps its history across code edits.
#[derive(Debug, Clone)]
pub struct AuditFilter {
    pub ticket_id: Option<i64>,
    pub desk_id: Option<i64>,
    pub event_type: Option<String>,
    pub operator: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for AuditFilter {
    fn default() -> Self {
        Self {
            ticket_id: None,
            desk_id: None,
            event_type: None,
            operator: None,
            since: None,
            until: None,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl AuditFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// History of one ticket.
    pub fn ticket(mut self, ticket_id: i64) -> Self {
        self.ticket_id = Some(ticket_id);
        self
    }

    /// Everything that touched one desk, including tickets moved onto it.
    pub fn desk(mut self, desk_id: i64) -> Self {
        self.desk_id = Some(desk_id);
        self
    }

    /// Only events with this `type` tag, e.g. `ticket_claimed`.
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    /// Inclusive bounds; either side may be open.
    pub fn between(mut self, since: Option<DateTime<Utc>>, until: Option<DateTime<Utc>>) -> Self {
        self.since = since;
        self.until = until;
        self
    }

    pub fn page(mut self, limit: i64, offset: i64) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }
}

/// Append-only home for audit records.
pub trait AuditStore: Send + Sync {
    /// Persist a record and return its id.
    fn insert(&self, record: &AuditRecord) -> Result<i64, AuditError>;

    /// Matching records, newest first, one page at a time.
    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, AuditError>;

    /// Number of matching records regardless of paging.
    fn count(&self, filter: &AuditFilter) -> Result<i64, AuditError>;
}
