//! Error types module
//!
//! All pipeline failures are unified under the `AppError` enum before they
//! cross into the HTTP layer. Each variant carries enough internal detail for
//! logging; the client-facing message is derived separately so process stderr
//! and database errors are never echoed to callers.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx`
//! feature so the storage and processing crates can depend on this crate
//! without pulling in a database driver.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented.
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "TRANSCODE_FAILED")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Staging I/O error: {0}")]
    StagingIo(String),

    #[error("Transcoder unavailable: {0}")]
    TranscodeUnavailable(String),

    #[error("Transcode failed: {0}")]
    TranscodeFailed(String),

    #[error("Thumbnail generation failed: {0}")]
    ThumbnailFailed(String),

    #[error("Incomplete transcode output: {0}")]
    IncompleteOutput(String),

    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl AppError {
    /// Variant name for structured log fields.
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::UnsupportedMediaType(_) => "UnsupportedMediaType",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::StagingIo(_) => "StagingIo",
            AppError::TranscodeUnavailable(_) => "TranscodeUnavailable",
            AppError::TranscodeFailed(_) => "TranscodeFailed",
            AppError::ThumbnailFailed(_) => "ThumbnailFailed",
            AppError::IncompleteOutput(_) => "IncompleteOutput",
            AppError::Database(_) => "Database",
            AppError::NotFound(_) => "NotFound",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::Internal(_) => "Internal",
        }
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        match self {
            AppError::UnsupportedMediaType(_) => 415,
            AppError::PayloadTooLarge(_) => 413,
            AppError::InvalidInput(_) => 400,
            AppError::NotFound(_) => 404,
            AppError::TranscodeUnavailable(_) => 503,
            AppError::StagingIo(_)
            | AppError::TranscodeFailed(_)
            | AppError::ThumbnailFailed(_)
            | AppError::IncompleteOutput(_)
            | AppError::Database(_)
            | AppError::Internal(_) => 500,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::UnsupportedMediaType(_) => "UNSUPPORTED_MEDIA_TYPE",
            AppError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            AppError::StagingIo(_) => "STAGING_IO_ERROR",
            AppError::TranscodeUnavailable(_) => "TRANSCODE_UNAVAILABLE",
            AppError::TranscodeFailed(_) => "TRANSCODE_FAILED",
            AppError::ThumbnailFailed(_) => "THUMBNAIL_FAILED",
            AppError::IncompleteOutput(_) => "INCOMPLETE_OUTPUT",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::TranscodeUnavailable(_) | AppError::Database(_) | AppError::StagingIo(_)
        )
    }

    fn client_message(&self) -> String {
        match self {
            // Client errors carry their real message; it contains nothing
            // beyond what the client already sent us.
            AppError::UnsupportedMediaType(msg)
            | AppError::PayloadTooLarge(msg)
            | AppError::InvalidInput(msg)
            | AppError::NotFound(msg) => msg.clone(),
            AppError::StagingIo(_) => "Error uploading video".to_string(),
            AppError::TranscodeUnavailable(_)
            | AppError::TranscodeFailed(_)
            | AppError::ThumbnailFailed(_)
            | AppError::IncompleteOutput(_) => "Error converting video".to_string(),
            AppError::Database(_) => "Error saving video metadata".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            AppError::UnsupportedMediaType(_)
            | AppError::PayloadTooLarge(_)
            | AppError::InvalidInput(_)
            | AppError::NotFound(_) => LogLevel::Debug,
            AppError::TranscodeUnavailable(_) => LogLevel::Warn,
            AppError::StagingIo(_)
            | AppError::TranscodeFailed(_)
            | AppError::ThumbnailFailed(_)
            | AppError::IncompleteOutput(_)
            | AppError::Database(_)
            | AppError::Internal(_) => LogLevel::Error,
        }
    }
}
