//! Response envelope shared by every queue endpoint.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use ghiseu_core::{
    AuditError, Desk, DeskError, ErrorKind, QueueError, Ticket, TicketError, TicketStatus,
};

/// `{ isSuccess, result, errorMessage }`. `result` is empty on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub is_success: bool,
    pub result: Vec<T>,
    pub error_message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(item: T) -> Self {
        Self::many(vec![item])
    }

    pub fn many(items: Vec<T>) -> Self {
        Self {
            is_success: true,
            result: items,
            error_message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            is_success: false,
            result: Vec::new(),
            error_message: Some(message.into()),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

/// A failed request, rendered as a failure envelope.
#[derive(Debug)]
pub struct ApiError {
    kind: ErrorKind,
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: status_for(kind),
            message: message.into(),
        }
    }

    /// Request that could not be parsed at all.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Invalid,
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Inactive
        | ErrorKind::QueueEmpty
        | ErrorKind::InvalidTransition
        | ErrorKind::AlreadyClaimed
        | ErrorKind::AlreadyExists => StatusCode::CONFLICT,
        ErrorKind::Invalid => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.kind == ErrorKind::Storage {
            error!("Request failed: {}", self.message);
        }
        let body: ApiResponse<()> = ApiResponse::failure(format!("{}: {}", self.kind, self.message));
        (self.status, Json(body)).into_response()
    }
}

impl From<QueueError> for ApiError {
    fn from(e: QueueError) -> Self {
        ApiError::new(e.kind(), e.to_string())
    }
}

impl From<DeskError> for ApiError {
    fn from(e: DeskError) -> Self {
        ApiError::new(e.kind(), e.to_string())
    }
}

impl From<TicketError> for ApiError {
    fn from(e: TicketError) -> Self {
        ApiError::new(e.kind(), e.to_string())
    }
}

impl From<AuditError> for ApiError {
    fn from(e: AuditError) -> Self {
        ApiError::new(ErrorKind::Storage, e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::bad_request(e.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self {
        ApiError::bad_request(e.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError::bad_request(e.body_text())
    }
}

/// Desk as returned by the API, with its current backlog depth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeskResponse {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub active: bool,
    pub queued: usize,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl DeskResponse {
    pub fn new(desk: Desk, queued: usize) -> Self {
        Self {
            id: desk.id,
            code: desk.code,
            name: desk.name,
            description: desk.description,
            icon: desk.icon,
            active: desk.active,
            queued,
            created_at: desk.created_at,
            modified_at: desk.modified_at,
        }
    }
}

/// Ticket as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketResponse {
    pub id: i64,
    pub desk_id: i64,
    pub number: u32,
    pub status: TicketStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl From<Ticket> for TicketResponse {
    fn from(ticket: Ticket) -> Self {
        Self {
            id: ticket.id,
            desk_id: ticket.desk_id,
            number: ticket.number,
            status: ticket.status,
            operator: ticket.operator,
            close_reason: ticket.close_reason.map(|r| r.as_str().to_string()),
            created_at: ticket.created_at,
            modified_at: ticket.modified_at,
        }
    }
}
