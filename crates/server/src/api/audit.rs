use axum::extract::{rejection::QueryRejection, Query, State};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

use ghiseu_core::{AuditFilter, AuditRecord};

use super::response::{ApiResponse, ApiResult};
use crate::state::AppState;

/// Maximum allowed limit for audit queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for audit queries
const DEFAULT_LIMIT: i64 = 100;

/// Query parameters for audit endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditQueryParams {
    /// Filter by ticket ID
    pub ticket_id: Option<i64>,
    /// Filter by desk ID; history survives edits to the desk code
    pub desk_id: Option<i64>,
    /// Filter by event type
    pub event_type: Option<String>,
    /// Filter by operator
    pub user_id: Option<String>,
    /// Filter events after this timestamp (ISO 8601)
    pub from: Option<DateTime<Utc>>,
    /// Filter events before this timestamp (ISO 8601)
    pub to: Option<DateTime<Utc>>,
    /// Maximum number of events to return (default 100, max 1000)
    pub limit: Option<i64>,
    /// Pagination offset (default 0)
    pub offset: Option<i64>,
}

/// Query audit events, newest first
pub async fn query_audit(
    State(state): State<Arc<AppState>>,
    params: Result<Query<AuditQueryParams>, QueryRejection>,
) -> ApiResult<AuditRecord> {
    let Query(params) = params?;

    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = AuditFilter::new()
        .page(limit, offset)
        .between(params.from, params.to);

    if let Some(ticket_id) = params.ticket_id {
        filter = filter.ticket(ticket_id);
    }
    if let Some(desk_id) = params.desk_id {
        filter = filter.desk(desk_id);
    }
    if let Some(event_type) = params.event_type {
        filter = filter.event_type(event_type);
    }
    if let Some(user_id) = params.user_id {
        filter = filter.operator(user_id);
    }

    let events = state.audit_store().query(&filter)?;
    Ok(ApiResponse::many(events))
}
