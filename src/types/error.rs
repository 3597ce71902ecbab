//! Error types for Stampbook
//!
//! Local validation failures come from the stamp core; everything else
//! (store outages, auth, HTTP plumbing) is folded into `StampbookError`.

use hyper::StatusCode;

use crate::stamps::ValidationError;

/// Main error type for Stampbook operations
#[derive(Debug, thiserror::Error)]
pub enum StampbookError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Report error: {0}")]
    Report(String),
}

impl StampbookError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(ValidationError::IndexAlreadyStamped(_)) => StatusCode::CONFLICT,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Http(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Report(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code for JSON responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(ValidationError::InvalidReason) => "INVALID_REASON",
            Self::Validation(ValidationError::IndexOutOfRange { .. }) => "INDEX_OUT_OF_RANGE",
            Self::Validation(ValidationError::IndexAlreadyStamped(_)) => "INDEX_ALREADY_STAMPED",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::BadRequest(_) | Self::Http(_) => "BAD_REQUEST",
            Self::Unauthorized(_) | Self::Auth(_) => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Report(_) => "REPORT_ERROR",
        }
    }
}

// Implement From conversions for common error types

impl From<std::io::Error> for StampbookError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for StampbookError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for StampbookError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for StampbookError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

impl From<bson::ser::Error> for StampbookError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Internal(format!("BSON encode error: {}", err))
    }
}

/// Result type alias for Stampbook operations
pub type Result<T> = std::result::Result<T, StampbookError>;
