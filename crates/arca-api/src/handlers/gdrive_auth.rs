//! Google Drive OAuth connection management.
//!
//! The interactive OAuth handshake happens in an external UI; these endpoints
//! receive its result, report connection status, and disconnect. Admin only.

use crate::auth::UserContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use arca_core::AppError;
use arca_storage::TokenSet;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConnectRequest {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Lifetime in seconds, as returned by the token endpoint.
    pub expires_in: i64,
    pub scope: Option<String>,
    pub token_type: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

fn require_admin(ctx: &UserContext) -> Result<(), HttpAppError> {
    if ctx.is_admin {
        return Ok(());
    }
    Err(HttpAppError(AppError::PermissionDenied(format!(
        "user {} is not an administrator",
        ctx.user_id
    ))))
}

#[utoipa::path(
    post,
    path = "/api/v0/gdrive/connect",
    tag = "gdrive",
    request_body = ConnectRequest,
    responses(
        (status = 204, description = "Credentials stored"),
        (status = 400, description = "Invalid token set", body = ErrorResponse),
        (status = 403, description = "Access denied", body = ErrorResponse)
    )
)]
pub async fn connect(
    ctx: UserContext,
    State(state): State<Arc<AppState>>,
    Json(body): Json<ConnectRequest>,
) -> Result<StatusCode, HttpAppError> {
    require_admin(&ctx)?;

    if body.access_token.trim().is_empty() {
        return Err(HttpAppError(AppError::BadRequest(
            "access_token must not be empty".to_string(),
        )));
    }
    if body.expires_in <= 0 {
        return Err(HttpAppError(AppError::BadRequest(
            "expires_in must be positive".to_string(),
        )));
    }

    state
        .tokens
        .store_tokens(TokenSet {
            access_token: body.access_token,
            refresh_token: body.refresh_token,
            expires_at: Utc::now() + Duration::seconds(body.expires_in),
            scope: body.scope,
            token_kind: body.token_type.unwrap_or_else(|| "Bearer".to_string()),
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/api/v0/gdrive/connect",
    tag = "gdrive",
    responses(
        (status = 204, description = "Credentials removed"),
        (status = 403, description = "Access denied", body = ErrorResponse)
    )
)]
pub async fn disconnect(
    ctx: UserContext,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, HttpAppError> {
    require_admin(&ctx)?;

    state.tokens.disconnect().await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v0/gdrive/status",
    tag = "gdrive",
    responses(
        (status = 200, description = "Connection status", body = StatusResponse),
        (status = 403, description = "Access denied", body = ErrorResponse)
    )
)]
pub async fn status(
    ctx: UserContext,
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, HttpAppError> {
    require_admin(&ctx)?;

    let credential = state.tokens.status().await?;

    Ok(Json(match credential {
        Some(c) => StatusResponse {
            connected: true,
            expires_at: Some(c.expires_at),
            scope: c.scope,
        },
        None => StatusResponse {
            connected: false,
            expires_at: None,
            scope: None,
        },
    }))
}
