//! Gateway error type
//!
//! Errors raised before the upgrade become HTTP responses. Errors raised
//! inside a live connection end up either as an `error` frame to the
//! sender or as the connection's terminal result.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lunar_cache::{BusError, SessionError};
use lunar_common::AppError;
use lunar_core::DomainError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Credentials missing or rejected by the authenticator
    #[error("{0}")]
    Unauthenticated(#[source] AppError),

    #[error("Origin not allowed")]
    OriginRejected,

    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("{0}")]
    Bus(#[from] BusError),

    #[error("{0}")]
    Session(#[from] SessionError),

    /// Session endpoints are not configured on this process
    #[error("Session store unavailable")]
    SessionsDisabled,

    #[error("Malformed frame: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("WebSocket transport error: {0}")]
    Transport(String),

    #[error("Connection closed unexpectedly (code {0:?})")]
    UnexpectedClose(Option<u16>),

    #[error("Connection task ended abnormally")]
    TaskAborted,

    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl GatewayError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::OriginRejected => StatusCode::FORBIDDEN,
            Self::Domain(e) => {
                if e.is_not_found() {
                    StatusCode::NOT_FOUND
                } else if e.is_authorization() {
                    StatusCode::FORBIDDEN
                } else if e.is_validation() {
                    StatusCode::BAD_REQUEST
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
            Self::Session(e) if e.is_invalid_token() => StatusCode::UNAUTHORIZED,
            Self::Bus(_) | Self::Session(_) | Self::SessionsDisabled => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Decode(_) => StatusCode::BAD_REQUEST,
            Self::Encode(_)
            | Self::Transport(_)
            | Self::UnexpectedClose(_)
            | Self::TaskAborted
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn error_code(&self) -> &str {
        match self {
            Self::Unauthenticated(e) => e.error_code(),
            Self::OriginRejected => "ORIGIN_NOT_ALLOWED",
            Self::Domain(e) => e.code(),
            Self::Bus(e) => e.code(),
            Self::Session(e) => e.code(),
            Self::SessionsDisabled => "SESSIONS_DISABLED",
            Self::Decode(_) => "INVALID_FRAME",
            Self::Encode(_) => "ENCODE_ERROR",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::UnexpectedClose(_) => "UNEXPECTED_CLOSE",
            Self::TaskAborted => "TASK_ABORTED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Errors that end a live connection
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::UnexpectedClose(_) | Self::TaskAborted
        )
    }

    /// Rejections caused by what the client sent, as opposed to a failing backend
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    pub(crate) fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<AppError> for GatewayError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Domain(e) => Self::Domain(e),
            e if e.is_unauthenticated() => Self::Unauthenticated(e),
            AppError::Forbidden(_) => Self::OriginRejected,
            e => Self::Internal(e.into()),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code().to_string();
        let message = self.to_string();

        // Log server errors
        if status.is_server_error() {
            error!(error = ?self, "Server error occurred");
        }

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;
