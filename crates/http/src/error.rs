//! Error handling for the shelf HTTP layer

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// Standard error response format for all HTTP errors
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub details: Vec<serde_json::Value>,
    pub trace_id: String,
    pub timestamp: String,
}

/// Envelope wrapping [`ErrorBody`] under an `error` key
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("bad request: {message}")]
    BadRequest { message: String, code: String },

    #[error("not found: {message}")]
    NotFound { message: String, code: String },

    #[error("conflict: {message}")]
    Conflict {
        details: Vec<serde_json::Value>,
        code: String,
        message: String,
    },

    #[error("failed precondition: {message}")]
    FailedPrecondition { message: String, code: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            code: "bad_request".to_string(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            code: "not_found".to_string(),
        }
    }

    /// Create a conflict error
    pub fn conflict(details: Vec<serde_json::Value>, message: impl Into<String>) -> Self {
        Self::Conflict {
            details,
            code: "conflict".to_string(),
            message: message.into(),
        }
    }

    /// Create a failed precondition error
    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::FailedPrecondition {
            message: message.into(),
            code: "failed_precondition".to_string(),
        }
    }

    /// HTTP status this error maps to
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } | AppError::FailedPrecondition { .. } => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::bad_request(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4();
        let timestamp = OffsetDateTime::now_utc().to_string();
        let status = self.status();

        let (error_code, message, details) = match self {
            AppError::BadRequest { message, code }
            | AppError::NotFound { message, code }
            | AppError::FailedPrecondition { message, code } => (code, message, Vec::new()),
            AppError::Conflict {
                details,
                code,
                message,
            } => (code, message, details),
            AppError::Internal(e) => ("internal_error".to_string(), format!("{e:#}"), Vec::new()),
        };

        if status.is_server_error() {
            tracing::error!(
                error_id = %error_id,
                error_code = %error_code,
                status_code = %status.as_u16(),
                error = %message,
                "Request error"
            );
        } else {
            tracing::warn!(
                error_id = %error_id,
                error_code = %error_code,
                status_code = %status.as_u16(),
                error = %message,
                "Request rejected"
            );
        }

        // In production, we might want to hide internal error details
        let message = if cfg!(not(debug_assertions)) && status == StatusCode::INTERNAL_SERVER_ERROR
        {
            "An internal server error occurred".to_string()
        } else {
            message
        };

        let envelope = ErrorEnvelope {
            error: ErrorBody {
                code: error_code,
                message,
                details,
                trace_id: error_id.to_string(),
                timestamp,
            },
        };

        (status, Json(envelope)).into_response()
    }
}
