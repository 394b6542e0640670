//! Error types for downloads-catalog
//!
//! Core operations follow a "signal, don't raise" policy: an absent record, a
//! throttled tracking call or a rename that had nothing to do are all `Ok`
//! values. [`Error`] is reserved for things that actually went wrong (storage,
//! serialization, templates) and for caller-side validation of write input.
//!
//! This module also provides:
//! - HTTP status code mapping for API integration ([`ToHttpStatus`])
//! - Structured error responses with machine-readable error codes ([`ApiError`])

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for downloads-catalog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for downloads-catalog
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "tracking.throttle_window")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Write input rejected before any persistence attempt
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Record or resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTML template failed to compile or render
    #[error("template error: {0}")]
    Template(String),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Validation failures for download write input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Title is empty once markup and whitespace are stripped
    #[error("title is required")]
    MissingTitle,

    /// Media source selected but no attachment given
    #[error("a media file is required when the file source is 'media'")]
    MissingFile,

    /// Direct source selected but no URL given
    #[error("a direct URL is required when the file source is 'direct'")]
    MissingDirectUrl,

    /// Direct URL is not an absolute http(s) URL
    #[error("direct URL '{0}' is not an absolute http(s) URL")]
    InvalidDirectUrl(String),

    /// Term slug normalized to nothing
    #[error("term slug is empty")]
    EmptySlug,
}

impl ValidationError {
    /// Name of the input field that failed validation
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingTitle => "title",
            ValidationError::MissingFile => "file_id",
            ValidationError::MissingDirectUrl | ValidationError::InvalidDirectUrl(_) => {
                "direct_url"
            }
            ValidationError::EmptySlug => "slug",
        }
    }
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "validation_error",
///     "message": "validation error: title is required",
///     "details": {
///       "field": "title"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }

    /// Create an "unauthorized" error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Config { .. } => 400,
            Error::Validation(_) => 422,
            Error::NotFound(_) => 404,
            Error::Database(_) => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::Template(_) => 500,
            Error::ApiServerError(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(_) => "validation_error",
            Error::NotFound(_) => "not_found",
            Error::Database(_) => "database_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::Template(_) => "template_error",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Validation(e) => Some(serde_json::json!({
                "field": e.field(),
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    /// Returns (Error, expected_status_code, expected_error_code) for every
    /// match arm in ToHttpStatus.
    fn all_error_variants() -> Vec<(Error, u16, &'static str)> {
        vec![
            (
                Error::Config {
                    message: "bad value".into(),
                    key: Some("tracking.throttle_window".into()),
                },
                400,
                "config_error",
            ),
            (
                Error::Validation(ValidationError::MissingTitle),
                422,
                "validation_error",
            ),
            (Error::NotFound("download 99".into()), 404, "not_found"),
            (
                Error::Database(DatabaseError::QueryFailed("timeout".into())),
                500,
                "database_error",
            ),
            (
                Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")),
                500,
                "io_error",
            ),
            (Error::Template("unclosed tag".into()), 500, "template_error"),
            (
                Error::ApiServerError("bind failed".into()),
                500,
                "api_server_error",
            ),
        ]
    }

    #[test]
    fn every_variant_maps_to_expected_status_code() {
        for (error, expected_status, expected_code) in all_error_variants() {
            let actual_status = error.status_code();
            assert_eq!(
                actual_status, expected_status,
                "Error variant with error_code={expected_code} returned status {actual_status}, expected {expected_status}"
            );
        }
    }

    #[test]
    fn every_variant_maps_to_expected_error_code() {
        for (error, expected_status, expected_code) in all_error_variants() {
            let actual_code = error.error_code();
            assert_eq!(
                actual_code, expected_code,
                "Error variant with expected status={expected_status} returned error_code={actual_code}, expected {expected_code}"
            );
        }
    }

    #[test]
    fn validation_error_carries_field_in_details() {
        let api_error: ApiError = Error::Validation(ValidationError::MissingDirectUrl).into();

        assert_eq!(api_error.error.code, "validation_error");
        assert!(api_error.error.message.contains("direct URL"));
        assert_eq!(api_error.error.details.unwrap()["field"], "direct_url");
    }

    #[test]
    fn config_error_carries_key_in_details() {
        let api_error: ApiError = Error::Config {
            message: "must be positive".into(),
            key: Some("tracking.throttle_window".into()),
        }
        .into();

        assert_eq!(
            api_error.error.details.unwrap()["key"],
            "tracking.throttle_window"
        );
    }

    #[test]
    fn not_found_has_no_details() {
        let api_error: ApiError = Error::NotFound("download 3".into()).into();
        assert!(api_error.error.details.is_none());
        assert!(api_error.error.message.contains("download 3"));
    }

    #[test]
    fn validation_fields() {
        assert_eq!(ValidationError::MissingTitle.field(), "title");
        assert_eq!(ValidationError::MissingFile.field(), "file_id");
        assert_eq!(
            ValidationError::InvalidDirectUrl("ftp://x".into()).field(),
            "direct_url"
        );
        assert_eq!(ValidationError::EmptySlug.field(), "slug");
    }
}
