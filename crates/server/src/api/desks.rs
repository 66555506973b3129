//! Desk API handlers: registration, availability, backlog and claims.

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use ghiseu_core::{AuditEvent, Desk, DeskRequest};

use super::response::{ApiResult, ApiResponse, DeskResponse, TicketResponse};
use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

/// Request body for registering (no `id`) or editing (with `id`) a desk
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDeskBody {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(flatten)]
    pub desk: DeskRequest,
}

/// Query parameters for listing desks
#[derive(Debug, Default, Deserialize)]
pub struct ListDesksParams {
    /// Only desks accepting claims
    #[serde(default)]
    pub active: bool,
}

/// Request body for claiming the next ticket
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimBody {
    /// Opaque token identifying the operator at the desk
    pub operator: String,
}

fn desk_response(state: &AppState, desk: Desk) -> DeskResponse {
    let queued = state.queue().depth(desk.id);
    DeskResponse::new(desk, queued)
}

/// Audit event for a desk whose active flag just changed.
fn availability_event(desk: &Desk, queued: usize) -> AuditEvent {
    if desk.active {
        AuditEvent::DeskActivated {
            desk_id: desk.id,
            desk_code: desk.code.clone(),
        }
    } else {
        AuditEvent::DeskDeactivated {
            desk_id: desk.id,
            desk_code: desk.code.clone(),
            queued,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Register a new desk, or edit an existing one when `id` is present
pub async fn save_desk(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SaveDeskBody>, JsonRejection>,
) -> ApiResult<DeskResponse> {
    let Json(body) = payload?;

    let desk = match body.id {
        None => {
            let desk = state.desks().register(body.desk)?;
            info!(desk = %desk.code, "Desk registered");
            state
                .audit()
                .emit(AuditEvent::DeskRegistered {
                    desk_id: desk.id,
                    desk_code: desk.code.clone(),
                    name: desk.name.clone(),
                })
                .await;
            desk
        }
        Some(id) => {
            let edit = state.queue().update_desk(id, body.desk)?;
            let desk = edit.desk;
            info!(desk = %desk.code, "Desk updated");
            state
                .audit()
                .emit(AuditEvent::DeskUpdated {
                    desk_id: desk.id,
                    desk_code: desk.code.clone(),
                    previous_code: (edit.previous.code != desk.code).then_some(edit.previous.code),
                })
                .await;
            if let Some(queued) = edit.toggled {
                state.audit().emit(availability_event(&desk, queued)).await;
            }
            desk
        }
    };

    Ok(ApiResponse::ok(desk_response(&state, desk)))
}

/// List desks ordered by code
pub async fn list_desks(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListDesksParams>, QueryRejection>,
) -> ApiResult<DeskResponse> {
    let Query(params) = params?;
    let desks = state.desks().list(params.active)?;

    Ok(ApiResponse::many(
        desks
            .into_iter()
            .map(|desk| desk_response(&state, desk))
            .collect(),
    ))
}

/// Get a desk by code
pub async fn get_desk(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> ApiResult<DeskResponse> {
    let desk = state.desks().get(&code)?;
    Ok(ApiResponse::ok(desk_response(&state, desk)))
}

/// Stop accepting claims at a desk; waiting tickets stay queued
pub async fn deactivate_desk(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> ApiResult<DeskResponse> {
    let (desk, queued) = state.queue().set_desk_active(&code, false)?;
    state.audit().emit(availability_event(&desk, queued)).await;

    Ok(ApiResponse::ok(DeskResponse::new(desk, queued)))
}

/// Resume claims at a desk
pub async fn activate_desk(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> ApiResult<DeskResponse> {
    let (desk, queued) = state.queue().set_desk_active(&code, true)?;
    state.audit().emit(availability_event(&desk, queued)).await;

    Ok(ApiResponse::ok(DeskResponse::new(desk, queued)))
}

/// Waiting tickets in claim order
pub async fn get_backlog(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> ApiResult<TicketResponse> {
    let tickets = state.queue().backlog(&code)?;
    Ok(ApiResponse::many(
        tickets.into_iter().map(TicketResponse::from).collect(),
    ))
}

/// Claim the oldest waiting ticket at a desk
pub async fn claim_next(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    payload: Result<Json<ClaimBody>, JsonRejection>,
) -> ApiResult<TicketResponse> {
    let Json(body) = payload?;
    let ticket = state.queue().claim_next(&code, &body.operator)?;
    Ok(ApiResponse::ok(TicketResponse::from(ticket)))
}
