//! Ticket API handlers.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use ghiseu_core::{TicketFilter, TicketStatus};

use super::response::{ApiError, ApiResponse, ApiResult, TicketResponse};
use crate::state::AppState;

/// Maximum allowed limit for ticket queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for ticket queries
const DEFAULT_LIMIT: i64 = 100;

// ============================================================================
// Request Types
// ============================================================================

/// Request body for issuing a ticket
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketBody {
    pub desk_id: i64,
}

/// Request body for moving a ticket to another desk
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReassignBody {
    pub desk_code: String,
}

/// Query parameters for listing tickets
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTicketsParams {
    /// Filter by status ("queued", "in_progress", "closed")
    pub status: Option<String>,
    /// Filter by owning desk
    pub desk_id: Option<i64>,
    /// Maximum number of tickets to return
    pub limit: Option<i64>,
    /// Pagination offset
    pub offset: Option<i64>,
}

fn ticket_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    let Path(id) = path?;
    Ok(id)
}

// ============================================================================
// Handlers
// ============================================================================

/// Issue a ticket for a desk
pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateTicketBody>, JsonRejection>,
) -> ApiResult<TicketResponse> {
    let Json(body) = payload?;
    let ticket = state.queue().admit(body.desk_id)?;
    Ok(ApiResponse::ok(TicketResponse::from(ticket)))
}

/// Get a ticket by ID
pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<TicketResponse> {
    let ticket = state.tickets().get(ticket_id(path)?)?;
    Ok(ApiResponse::ok(TicketResponse::from(ticket)))
}

/// List tickets with optional filters, oldest first
pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListTicketsParams>, QueryRejection>,
) -> ApiResult<TicketResponse> {
    let Query(params) = params?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = TicketFilter::new().with_limit(limit).with_offset(offset);

    if let Some(ref status) = params.status {
        let status = TicketStatus::parse(status)
            .ok_or_else(|| ApiError::bad_request(format!("unknown status: {}", status)))?;
        filter = filter.with_status(status);
    }

    if let Some(desk_id) = params.desk_id {
        filter = filter.with_desk_id(desk_id);
    }

    let tickets = state.tickets().list(&filter)?;
    Ok(ApiResponse::many(
        tickets.into_iter().map(TicketResponse::from).collect(),
    ))
}

/// Close a ticket: completes it when in progress, cancels it when queued
pub async fn close_ticket(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<TicketResponse> {
    let ticket = state.queue().close(ticket_id(path)?)?;
    Ok(ApiResponse::ok(TicketResponse::from(ticket)))
}

/// Withdraw a waiting ticket
pub async fn cancel_ticket(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<TicketResponse> {
    let ticket = state.queue().cancel(ticket_id(path)?)?;
    Ok(ApiResponse::ok(TicketResponse::from(ticket)))
}

/// Give an in-progress ticket back to its desk
pub async fn requeue_ticket(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<TicketResponse> {
    let ticket = state.queue().requeue(ticket_id(path)?)?;
    Ok(ApiResponse::ok(TicketResponse::from(ticket)))
}

/// Move a waiting ticket to another desk
pub async fn reassign_ticket(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ReassignBody>, JsonRejection>,
) -> ApiResult<TicketResponse> {
    let id = ticket_id(path)?;
    let Json(body) = payload?;
    let ticket = state.queue().reassign(id, &body.desk_code)?;
    Ok(ApiResponse::ok(TicketResponse::from(ticket)))
}
