//! Game errors and their HTTP envelope.
//!
//! Every command failure maps to a status and a stable code that clients
//! switch on. Rule rejections carry the phase the round was in.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug)]
pub enum AppError {
    /// Missing or wrong room key
    Unauthorized(String),
    NotFound(String),
    /// Input the game can never accept (names, titles, drawings)
    Validation(String),
    /// Rejected by a game rule in the round's current state
    Guard {
        message: String,
        phase: Option<&'static str>,
    },
    Database(String),
    Internal(String),
    /// Request body that is not the JSON the route expects
    BadRequest(String),
}

impl AppError {
    /// Guard violation without phase context.
    pub fn guard(message: impl Into<String>) -> Self {
        AppError::Guard {
            message: message.into(),
            phase: None,
        }
    }

    fn parts(&self) -> (StatusCode, &'static str, &str) {
        match self {
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "NOT_FOUND", m.as_str()),
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", m.as_str()),
            AppError::Guard { message, .. } => (StatusCode::CONFLICT, "GUARD_VIOLATION", message.as_str()),
            AppError::Database(m) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR", m.as_str()),
            AppError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", m.as_str()),
            AppError::BadRequest(m) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", m.as_str()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.parts().0
    }

    pub fn error_code(&self) -> &'static str {
        self.parts().1
    }

    pub fn message(&self) -> &str {
        self.parts().2
    }

    /// A request body that failed to parse.
    pub fn malformed_body(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("Malformed request body: {}", err))
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AppError::Database(format!("Database error: {}", err))
    }
}

/// Game records are encoded server-side, so failures are internal.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("Serialization error: {:?}", err);
        AppError::Internal(format!("Serialization error: {}", err))
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// `{ success: false, error, revisionId }`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
    pub revision_id: i64,
}

impl ErrorResponse {
    pub fn new(error: &AppError, revision_id: i64) -> Self {
        let details = match error {
            AppError::Guard {
                phase: Some(phase), ..
            } => Some(json!({ "phase": phase })),
            _ => None,
        };

        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code(),
                message: error.message().to_string(),
                details,
            },
            revision_id,
        }
    }
}

/// An error paired with the store revision the client should resync from.
pub struct AppErrorWithRevision {
    pub error: AppError,
    pub revision_id: i64,
}

impl IntoResponse for AppErrorWithRevision {
    fn into_response(self) -> Response {
        let body = ErrorResponse::new(&self.error, self.revision_id);
        (self.error.status_code(), Json(body)).into_response()
    }
}
