//! HTTP error response conversion
//!
//! **Preferred handler pattern:** return `Result<impl IntoResponse,
//! HttpAppError>` and let domain errors convert through `AppError`, so every
//! failure renders consistently (status, body, logging).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use arca_core::{AppError, ErrorMetadata, LogLevel};
use arca_storage::{StorageError, TokenError};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
}

/// Wrapper type for AppError to implement IntoResponse.
/// Necessary because of the orphan rule: IntoResponse is external and so is
/// AppError (it lives in arca-core).
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::from(err))
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        HttpAppError(AppError::from(err))
    }
}

impl From<TokenError> for HttpAppError {
    fn from(err: TokenError) -> Self {
        HttpAppError(AppError::from(err))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .map(|env| {
            let env = env.to_lowercase();
            env == "production" || env == "prod"
        })
        .unwrap_or(false)
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        // Details are always hidden in production; elsewhere only
        // non-sensitive errors expose them.
        let body = if is_production_env() || app_error.is_sensitive() {
            Json(ErrorResponse {
                error: app_error.client_message(),
                details: None,
                error_type: None,
                code: app_error.error_code().to_string(),
                recoverable: app_error.is_recoverable(),
            })
        } else {
            Json(ErrorResponse {
                error: app_error.client_message(),
                details: Some(app_error.detailed_message()),
                error_type: Some(app_error.error_type().to_string()),
                code: app_error.error_code().to_string(),
                recoverable: app_error.is_recoverable(),
            })
        };

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_errors_map_to_app_errors() {
        let err = HttpAppError::from(StorageError::NotFound("gdrive download: gone".into()));
        assert_eq!(err.0.http_status_code(), 404);

        let err = HttpAppError::from(StorageError::Transient("timeout".into()));
        assert_eq!(err.0.http_status_code(), 502);
        assert!(err.0.is_recoverable());

        let err = HttpAppError::from(StorageError::PermissionDenied("no rights".into()));
        assert_eq!(err.0.http_status_code(), 403);
        assert_eq!(err.0.client_message(), "Access denied");
    }

    #[test]
    fn test_token_errors_map_to_upstream_errors() {
        let err = HttpAppError::from(TokenError::RefreshUnavailable);
        assert_eq!(err.0.http_status_code(), 502);
        assert!(!err.0.is_recoverable());

        let err = HttpAppError::from(TokenError::RefreshTransient("503".into()));
        assert!(err.0.is_recoverable());
    }
}
