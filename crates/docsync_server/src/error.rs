//! Error types for the server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use docsync_engine::SyncError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while serving a request.
#[derive(Error, Debug)]
pub enum ServerError {
    /// A required field was missing or empty.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The request has no valid authenticated session.
    #[error("not authenticated: {0}")]
    Unauthenticated(String),

    /// The identity provider or the document API failed.
    #[error("{context}: {detail}")]
    Upstream {
        /// Generic message shown to the caller.
        context: String,
        /// Underlying error detail.
        detail: String,
    },

    /// A document was created but its content could not be inserted.
    #[error("failed to seed document {document_id}: {detail}")]
    SeedFailed {
        /// Id of the empty document left behind.
        document_id: String,
        /// Underlying error detail.
        detail: String,
    },

    /// The session store failed while logging out.
    #[error("session teardown failed: {0}")]
    SessionTeardown(String),

    /// The session store failed.
    #[error("session store error: {0}")]
    SessionStore(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Wraps an upstream failure with the message shown to the caller.
    pub fn upstream(context: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Upstream {
            context: context.into(),
            detail: detail.into(),
        }
    }

    /// Maps a sync engine error, using `context` as the caller-facing message.
    pub fn from_sync(context: &str, err: SyncError) -> Self {
        match err {
            SyncError::InvalidInput(message) => Self::InvalidRequest(message),
            SyncError::Upstream { message, .. } => Self::upstream(context, message),
            SyncError::FailedToSeedContent {
                document_id,
                message,
            } => Self::SeedFailed {
                document_id,
                detail: message,
            },
        }
    }

    /// Returns the HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ServerError::Upstream { .. }
            | ServerError::SeedFailed { .. }
            | ServerError::SessionTeardown(_)
            | ServerError::SessionStore(_)
            | ServerError::Config(_)
            | ServerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the stable machine-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            ServerError::InvalidRequest(_) => "INVALID_INPUT",
            ServerError::Unauthenticated(_) => "UNAUTHENTICATED",
            ServerError::Upstream { .. } => "UPSTREAM_FAILURE",
            ServerError::SeedFailed { .. } => "FAILED_TO_SEED_CONTENT",
            ServerError::SessionTeardown(_) => "SESSION_TEARDOWN_FAILURE",
            ServerError::SessionStore(_) | ServerError::Config(_) | ServerError::Io(_) => {
                "INTERNAL"
            }
        }
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let reason = self.reason();
        if status.is_server_error() {
            error!(reason, error = %self, "request failed");
        }

        let body = match &self {
            ServerError::InvalidRequest(message)
            | ServerError::Unauthenticated(message)
            | ServerError::SessionTeardown(message) => json!({
                "message": message,
                "reason": reason,
            }),
            ServerError::Upstream { context, detail } => json!({
                "message": context,
                "error": detail,
                "reason": reason,
            }),
            ServerError::SeedFailed {
                document_id,
                detail,
            } => json!({
                "message": "Failed to seed document content",
                "error": detail,
                "fileId": document_id,
                "reason": reason,
            }),
            ServerError::SessionStore(_) | ServerError::Config(_) | ServerError::Io(_) => json!({
                "message": "Internal server error",
                "error": self.to_string(),
                "reason": reason,
            }),
        };

        (status, Json(body)).into_response()
    }
}
