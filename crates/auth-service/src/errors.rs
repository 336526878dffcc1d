use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::messaging::rpc::RpcError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("RPC timeout: {0}")]
    RpcTimeout(String),

    #[error("RPC transport error: {0}")]
    RpcTransport(String),

    #[error("Token signing error: {0}")]
    Signing(String),

    #[error("Internal server error")]
    Internal,
}

impl From<RpcError> for AuthError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Timeout { topic } => AuthError::RpcTimeout(topic),
            RpcError::Remote { code, message } => match code.as_str() {
                "conflict" => AuthError::Conflict(message),
                "not_found" => AuthError::NotFound(message),
                _ => AuthError::RpcTransport(format!("remote error {code}: {message}")),
            },
            other => AuthError::RpcTransport(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AuthError::Validation(detail) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", detail.clone())
            }
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid credentials".to_string(),
            ),
            // Token failures are deliberately indistinguishable to the
            // caller: expired and malformed report the same thing.
            AuthError::InvalidToken(_) => (
                StatusCode::UNAUTHORIZED,
                "INVALID_TOKEN",
                "invalid token".to_string(),
            ),
            AuthError::Unauthenticated(reason) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", reason.clone())
            }
            AuthError::Conflict(detail) => (StatusCode::CONFLICT, "CONFLICT", detail.clone()),
            AuthError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            AuthError::RpcTimeout(topic) => {
                error!(topic = %topic, "identity store request timed out");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            AuthError::RpcTransport(detail) => {
                error!(detail = %detail, "identity store transport failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            AuthError::Signing(detail) => {
                error!(detail = %detail, "token signing failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            AuthError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(error_response)).into_response()
    }
}
