//! Error types for verification-rs.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
///
/// Each variant carries a fixed HTTP status so call sites select the code by
/// choosing the variant. The boundary renders every error as
/// `{"error": "<context> - <message>"}`.
#[derive(Debug, Error)]
pub enum AppError {
    // === Client Errors ===
    #[error("Case not found: {0}")]
    CaseNotFound(String),

    /// Lock ownership violation on a pending case.
    #[error("Locking error: {0}")]
    Locked(String),

    /// Domain state conflict, e.g. closing a case that is not Approved.
    #[error("Verification error: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    // === Server Errors ===
    /// Lock management refused, e.g. locking a resolved case.
    #[error("Locking error: {0}")]
    Locking(String),

    /// Generic domain rule violation surfaced as a server error.
    #[error("Verification error: {0}")]
    Verification(String),

    /// Persistence failure on a read path.
    #[error("Storage error: {0}")]
    StorageRead(String),

    /// Persistence failure on a write path.
    #[error("Storage error: {0}")]
    StorageWrite(String),

    /// An external dependency timed out, refused the connection, or
    /// returned a non-2xx status.
    #[error("Dependency error: {0}")]
    Dependency(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// An error wrapped with a per-endpoint context prefix.
    #[error("{context} - {source}")]
    Context {
        /// Fixed per-endpoint prefix, e.g. `Failed to approve case`.
        context: String,
        /// The underlying error; status and code are taken from it.
        #[source]
        source: Box<AppError>,
    },
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 4xx Client Errors
            Self::CaseNotFound(_) => StatusCode::NOT_FOUND,
            Self::Locked(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,

            // 422 for persistence failures on write paths
            Self::StorageWrite(_) => StatusCode::UNPROCESSABLE_ENTITY,

            // 5xx Server Errors
            Self::Locking(_)
            | Self::Verification(_)
            | Self::StorageRead(_)
            | Self::Dependency(_)
            | Self::Config(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,

            Self::Context { source, .. } => source.status_code(),
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::CaseNotFound(_) => "CASE_NOT_FOUND",
            Self::Locked(_) | Self::Locking(_) => "LOCKING_ERROR",
            Self::Conflict(_) | Self::Verification(_) => "VERIFICATION_ERROR",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::StorageRead(_) | Self::StorageWrite(_) => "STORAGE_ERROR",
            Self::Dependency(_) => "DEPENDENCY_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Context { source, .. } => source.error_code(),
        }
    }

    /// Wraps this error with a per-endpoint context prefix.
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        if self.is_server_error() {
            tracing::error!(error = %self, code = code, "Server error occurred");
        } else {
            tracing::debug!(error = %self, code = code, "Client error occurred");
        }

        let body = Json(json!({ "error": self.to_string() }));

        (status, body).into_response()
    }
}

// === From implementations ===

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}
