use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use crate::models::SessionStatus;
use crate::recurrence::RecurrenceError;

/// Domain errors surfaced by the booking engine. All variants except
/// `InternalInvariant` are caller-correctable and map to 4xx responses.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    Validation(String),
    #[error("capacity exceeded: requested {requested} seats, {available} available")]
    CapacityExceeded { requested: u32, available: u32 },
    #[error("session is not open for booking (status {status:?})")]
    SessionNotBookable { status: SessionStatus },
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: &'static str, to: &'static str },
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: Uuid },
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

impl From<RecurrenceError> for EngineError {
    fn from(value: RecurrenceError) -> Self {
        EngineError::Validation(value.to_string())
    }
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg).into_response(),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg).into_response(),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response(),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(value: EngineError) -> Self {
        match value {
            EngineError::Validation(_) => ApiError::BadRequest(value.to_string()),
            EngineError::CapacityExceeded { .. }
            | EngineError::SessionNotBookable { .. }
            | EngineError::InvalidStateTransition { .. } => ApiError::Conflict(value.to_string()),
            EngineError::NotFound { .. } => ApiError::NotFound(value.to_string()),
            EngineError::InternalInvariant(ref detail) => {
                error!("invariant breach: {detail}");
                ApiError::Internal("Internal consistency error".into())
            }
        }
    }
}
