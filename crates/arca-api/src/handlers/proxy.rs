//! Streaming proxy for remote-store assets.
//!
//! Relays Drive content through this service so browsers never need a Google
//! credential. Content mode forwards byte ranges for seekable video playback;
//! thumbnail mode resolves a user-supplied thumbnail object first and falls
//! back to Drive's auto-generated thumbnail link.

use crate::auth::UserContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::services::activity::{self, ActionKind, ActivityEntry};
use crate::state::AppState;
use arca_core::models::MediaAsset;
use arca_core::{AppError, StorageBackend};
use arca_storage::{GoogleDriveProvider, StorageProvider};
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
};
use futures::StreamExt;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

const THUMBNAIL_CACHE_CONTROL: &str = "public, max-age=3600";

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    /// `type=thumbnail` selects thumbnail mode; anything else is content mode.
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// 206 only when a range was requested AND the backend echoed a
/// content-range; a backend that ignored the range gets relayed as 200.
fn proxy_status(range_requested: bool, has_content_range: bool) -> StatusCode {
    if range_requested && has_content_range {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    }
}

fn relay_body(response: reqwest::Response) -> Body {
    // Incremental relay; a mid-stream backend error terminates the body
    // instead of silently truncating.
    Body::from_stream(
        response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other)),
    )
}

fn build_response(status: StatusCode, upstream: reqwest::Response) -> Result<Response, HttpAppError> {
    let mut builder = Response::builder()
        .status(status)
        .header(header::ACCEPT_RANGES, "bytes");

    for name in [
        header::CONTENT_TYPE,
        header::CONTENT_LENGTH,
        header::CONTENT_RANGE,
    ] {
        if let Some(value) = upstream.headers().get(&name).and_then(|v| v.to_str().ok()) {
            builder = builder.header(&name, value);
        }
    }

    builder
        .body(relay_body(upstream))
        .map_err(|e| HttpAppError(AppError::Internal(format!("failed to build response: {}", e))))
}

#[utoipa::path(
    get,
    path = "/api/v0/media/{id}/proxy",
    tag = "media",
    params(
        ("id" = Uuid, Path, description = "Media asset ID"),
        ("type" = Option<String>, Query, description = "Set to 'thumbnail' for thumbnail mode")
    ),
    responses(
        (status = 200, description = "Full content or thumbnail"),
        (status = 206, description = "Partial content for a ranged request"),
        (status = 403, description = "Access denied", body = ErrorResponse),
        (status = 404, description = "Asset not found", body = ErrorResponse),
        (status = 502, description = "Backend failure", body = ErrorResponse)
    )
)]
pub async fn proxy_media(
    ctx: UserContext,
    Path(id): Path<Uuid>,
    Query(query): Query<ProxyQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<Response, HttpAppError> {
    let asset = state
        .media
        .media(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("media asset {}", id)))?;

    if !ctx.is_admin && !state.gate.has_folder_access(ctx.user_id, asset.folder_id).await {
        return Err(HttpAppError(AppError::PermissionDenied(format!(
            "user {} has no access to folder {}",
            ctx.user_id, asset.folder_id
        ))));
    }

    if asset.storage_backend != StorageBackend::GoogleDrive {
        return Err(HttpAppError(AppError::InvalidInput(format!(
            "asset {} is not proxied (backend {})",
            id, asset.storage_backend
        ))));
    }

    let gdrive = state.registry.gdrive().ok_or_else(|| {
        HttpAppError(AppError::Internal(
            "google drive backend is not configured".to_string(),
        ))
    })?;

    let thumbnail_mode = query.kind.as_deref() == Some("thumbnail");

    let response = if thumbnail_mode {
        serve_thumbnail(&gdrive, &asset).await?
    } else {
        serve_content(&gdrive, &asset, &headers).await?
    };

    let folder_name = match state.folders.folder(asset.folder_id).await {
        Ok(Some(folder)) => folder.name,
        _ => asset.folder_id.to_string(),
    };

    activity::record(
        state.activity.clone(),
        ActivityEntry {
            actor_id: ctx.user_id,
            action: ActionKind::Download,
            asset_id: asset.id,
            file_name: asset.name.clone(),
            media_kind: asset.kind,
            folder_id: asset.folder_id,
            folder_name,
        },
    );

    Ok(response)
}

async fn serve_content(
    gdrive: &GoogleDriveProvider,
    asset: &MediaAsset,
    headers: &HeaderMap,
) -> Result<Response, HttpAppError> {
    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let upstream = gdrive
        .fetch_media(&asset.storage_file_id, range.as_deref())
        .await?;

    let has_content_range = upstream.headers().contains_key(header::CONTENT_RANGE);
    let status = proxy_status(range.is_some(), has_content_range);

    build_response(status, upstream)
}

async fn serve_thumbnail(
    gdrive: &GoogleDriveProvider,
    asset: &MediaAsset,
) -> Result<Response, HttpAppError> {
    // A user-supplied thumbnail object takes priority.
    if asset.thumbnail_is_custom {
        if let Some(thumbnail_id) = &asset.thumbnail_file_id {
            match gdrive.download(thumbnail_id).await {
                Ok(bytes) => {
                    return Response::builder()
                        .status(StatusCode::OK)
                        .header(header::CONTENT_TYPE, "image/jpeg")
                        .header(header::CACHE_CONTROL, THUMBNAIL_CACHE_CONTROL)
                        .body(Body::from(bytes))
                        .map_err(|e| {
                            HttpAppError(AppError::Internal(format!(
                                "failed to build response: {}",
                                e
                            )))
                        });
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        asset_id = %asset.id,
                        thumbnail_id = %thumbnail_id,
                        "custom thumbnail fetch failed, falling back to generated link"
                    );
                }
            }
        }
    }

    // Fall back to the backend's auto-generated thumbnail. Failures surface
    // to the caller rather than degrading into a broken image.
    let link = gdrive
        .thumbnail_link(&asset.storage_file_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no thumbnail for asset {}", asset.id)))?;

    let upstream = gdrive.fetch_thumbnail(&link).await?;

    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("image/jpeg")
        .to_string();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, THUMBNAIL_CACHE_CONTROL)
        .body(relay_body(upstream))
        .map_err(|e| HttpAppError(AppError::Internal(format!("failed to build response: {}", e))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_status_requires_both_conditions() {
        assert_eq!(proxy_status(true, true), StatusCode::PARTIAL_CONTENT);
        assert_eq!(proxy_status(true, false), StatusCode::OK);
        assert_eq!(proxy_status(false, true), StatusCode::OK);
        assert_eq!(proxy_status(false, false), StatusCode::OK);
    }
}
