//! Error types for the sync engine.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during document sync.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A required input was missing or empty. Raised before any network call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The document-hosting API failed or rejected the call.
    #[error("upstream error: {message}")]
    Upstream {
        /// Error message, passed through from the API where available.
        message: String,
        /// HTTP status returned by the API, if a response was received.
        status: Option<u16>,
    },

    /// A document was created but its initial text could not be inserted.
    ///
    /// The empty document is left in place; its id is reported so it can be
    /// cleaned up.
    #[error("failed to seed content of document {document_id}: {message}")]
    FailedToSeedContent {
        /// Id of the created, empty document.
        document_id: String,
        /// Underlying upstream error message.
        message: String,
    },
}

impl SyncError {
    /// Creates an upstream error without an HTTP status.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
            status: None,
        }
    }

    /// Creates an upstream error carrying the API's HTTP status.
    pub fn upstream_status(status: u16, message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
            status: Some(status),
        }
    }

    /// Returns the stable machine-readable kind of this error.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::InvalidInput(_) => "INVALID_INPUT",
            SyncError::Upstream { .. } => "UPSTREAM_FAILURE",
            SyncError::FailedToSeedContent { .. } => "FAILED_TO_SEED_CONTENT",
        }
    }

    /// Returns true if the caller supplied bad input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, SyncError::InvalidInput(_))
    }

    /// Returns the id of a document left behind by a failed create.
    pub fn orphaned_document(&self) -> Option<&str> {
        match self {
            SyncError::FailedToSeedContent { document_id, .. } => Some(document_id),
            _ => None,
        }
    }

    /// Returns the underlying error detail without the kind prefix.
    pub fn detail(&self) -> &str {
        match self {
            SyncError::InvalidInput(message)
            | SyncError::Upstream { message, .. }
            | SyncError::FailedToSeedContent { message, .. } => message,
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        Self::Upstream {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}
