//! Error types module
//!
//! Application-level errors used throughout Arca. All layers converge on
//! `AppError`; the `ErrorMetadata` trait lets the HTTP boundary render an
//! error without knowing which layer produced it.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx`
//! feature so the storage crate can depend on this crate without pulling in
//! a database driver.

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like lookups that miss
    Debug,
    /// Warning level - for recoverable issues like upstream throttling
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented.
/// This trait allows errors to self-describe their HTTP response characteristics.
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "NOT_FOUND")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried by the caller)
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upstream transient failure: {0}")]
    UpstreamTransient(String),

    #[error("Upstream permanent failure: {0}")]
    UpstreamPermanent(String),

    #[error("Inconsistent state: {0}")]
    Inconsistent(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        match self {
            AppError::Database(_) => 500,
            AppError::NotFound(_) => 404,
            AppError::PermissionDenied(_) => 403,
            AppError::Unauthorized(_) => 401,
            AppError::InvalidInput(_) | AppError::BadRequest(_) => 400,
            // Upstream failures surface as bad gateway; the caller decides
            // whether to retry based on `is_recoverable`.
            AppError::UpstreamTransient(_) | AppError::UpstreamPermanent(_) => 502,
            AppError::Inconsistent(_) => 500,
            AppError::Internal(_) | AppError::InternalWithSource { .. } => 500,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::PermissionDenied(_) => "PERMISSION_DENIED",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::UpstreamTransient(_) => "UPSTREAM_TRANSIENT",
            AppError::UpstreamPermanent(_) => "UPSTREAM_PERMANENT",
            AppError::Inconsistent(_) => "INCONSISTENT_STATE",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "INTERNAL_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, AppError::UpstreamTransient(_))
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "A database error occurred".to_string(),
            AppError::NotFound(msg) => format!("Not found: {}", msg),
            // Never reveal whether the resource exists or is merely
            // unauthorized.
            AppError::PermissionDenied(_) => "Access denied".to_string(),
            AppError::Unauthorized(_) => "Authentication required".to_string(),
            AppError::InvalidInput(msg) => format!("Invalid input: {}", msg),
            AppError::BadRequest(msg) => format!("Bad request: {}", msg),
            AppError::UpstreamTransient(_) => {
                "The storage backend is temporarily unavailable".to_string()
            }
            AppError::UpstreamPermanent(_) => "The storage backend rejected the request".to_string(),
            AppError::Inconsistent(_) => "An internal consistency error occurred".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "An internal error occurred".to_string()
            }
        }
    }

    fn is_sensitive(&self) -> bool {
        matches!(
            self,
            AppError::Database(_)
                | AppError::PermissionDenied(_)
                | AppError::Internal(_)
                | AppError::InternalWithSource { .. }
        )
    }

    fn log_level(&self) -> LogLevel {
        match self {
            AppError::NotFound(_) | AppError::InvalidInput(_) | AppError::BadRequest(_) => {
                LogLevel::Debug
            }
            AppError::PermissionDenied(_)
            | AppError::Unauthorized(_)
            | AppError::UpstreamTransient(_) => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

impl AppError {
    /// Short variant name, used as a structured logging field.
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Database(_) => "Database",
            AppError::NotFound(_) => "NotFound",
            AppError::PermissionDenied(_) => "PermissionDenied",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::BadRequest(_) => "BadRequest",
            AppError::UpstreamTransient(_) => "UpstreamTransient",
            AppError::UpstreamPermanent(_) => "UpstreamPermanent",
            AppError::Inconsistent(_) => "Inconsistent",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Full internal message, including the source chain where present.
    pub fn detailed_message(&self) -> String {
        match self {
            AppError::InternalWithSource { message, source } => {
                format!("{}: {:#}", message, source)
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_does_not_leak_detail() {
        let err = AppError::PermissionDenied("folder 42 owned by someone else".to_string());
        assert_eq!(err.http_status_code(), 403);
        assert!(!err.client_message().contains("folder 42"));
    }

    #[test]
    fn test_only_transient_errors_are_recoverable() {
        assert!(AppError::UpstreamTransient("503".into()).is_recoverable());
        assert!(!AppError::UpstreamPermanent("quota".into()).is_recoverable());
        assert!(!AppError::NotFound("x".into()).is_recoverable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::NotFound("x".into()).http_status_code(), 404);
        assert_eq!(AppError::Unauthorized("x".into()).http_status_code(), 401);
        assert_eq!(AppError::InvalidInput("x".into()).http_status_code(), 400);
        assert_eq!(
            AppError::UpstreamTransient("x".into()).http_status_code(),
            502
        );
        assert_eq!(AppError::Inconsistent("x".into()).http_status_code(), 500);
    }
}
