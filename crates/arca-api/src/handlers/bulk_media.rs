//! Bulk media operations: multi-file upload, delete, and rename.

use crate::auth::UserContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::services::bulk::UploadItem;
use crate::state::AppState;
use arca_core::{AppError, StorageBackend};
use axum::extract::{Multipart, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

const MAX_BULK_SIZE: usize = 50;
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadedAsset {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub storage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkUploadResponse {
    pub uploaded: Vec<UploadedAsset>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkDeleteRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkDeleteResult {
    pub id: Uuid,
    pub deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkDeleteResponse {
    pub results: Vec<BulkDeleteResult>,
    pub deleted_count: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkRenameRequest {
    pub ids: Vec<Uuid>,
    pub base_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkRenameResult {
    pub id: Uuid,
    pub new_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkRenameResponse {
    pub results: Vec<BulkRenameResult>,
}

fn check_batch_size(len: usize) -> Result<(), HttpAppError> {
    if len == 0 {
        return Err(HttpAppError(AppError::BadRequest(
            "no items in request".to_string(),
        )));
    }
    if len > MAX_BULK_SIZE {
        return Err(HttpAppError(AppError::BadRequest(format!(
            "batch size exceeds maximum of {}",
            MAX_BULK_SIZE
        ))));
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/v0/media/bulk/upload",
    tag = "media",
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "All files uploaded", body = BulkUploadResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Access denied", body = ErrorResponse),
        (status = 502, description = "Backend failure, nothing persisted", body = ErrorResponse)
    )
)]
pub async fn bulk_upload(
    ctx: UserContext,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<BulkUploadResponse>, HttpAppError> {
    let mut folder_id: Option<Uuid> = None;
    let mut backend = StorageBackend::Local;
    let mut items: Vec<UploadItem> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart request: {}", e)))?
    {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("folder_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("invalid folder_id field: {}", e)))?;
                folder_id = Some(
                    Uuid::parse_str(text.trim())
                        .map_err(|_| AppError::BadRequest("folder_id is not a UUID".to_string()))?,
                );
            }
            Some("storage") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("invalid storage field: {}", e)))?;
                backend = text
                    .parse()
                    .map_err(|e: String| AppError::BadRequest(e))?;
            }
            _ => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::BadRequest("file part without a name".to_string()))?;
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("failed to read file part: {}", e)))?
                    .to_vec();

                items.push(UploadItem {
                    file_name,
                    content_type,
                    data,
                });
            }
        }
    }

    let folder_id = folder_id
        .ok_or_else(|| AppError::BadRequest("missing folder_id field".to_string()))?;
    check_batch_size(items.len())?;

    let assets = state
        .orchestrator
        .upload_many(&ctx, folder_id, backend, items)
        .await?;

    Ok(Json(BulkUploadResponse {
        uploaded: assets
            .into_iter()
            .map(|a| UploadedAsset {
                id: a.id,
                name: a.name,
                url: a.url,
                storage: a.storage_backend.to_string(),
                thumbnail_url: a.thumbnail_url,
            })
            .collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v0/media/bulk/delete",
    tag = "media",
    request_body = BulkDeleteRequest,
    responses(
        (status = 200, description = "Bulk delete completed", body = BulkDeleteResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse)
    )
)]
pub async fn bulk_delete(
    ctx: UserContext,
    State(state): State<Arc<AppState>>,
    Json(body): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteResponse>, HttpAppError> {
    check_batch_size(body.ids.len())?;

    let results = state.orchestrator.delete_many(&ctx, body.ids).await?;

    let deleted_count = results.iter().filter(|r| r.deleted).count();
    Ok(Json(BulkDeleteResponse {
        results: results
            .into_iter()
            .map(|r| BulkDeleteResult {
                id: r.id,
                deleted: r.deleted,
                error: r.error,
            })
            .collect(),
        deleted_count,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v0/media/bulk/rename",
    tag = "media",
    request_body = BulkRenameRequest,
    responses(
        (status = 200, description = "All assets renamed", body = BulkRenameResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "An asset was not found", body = ErrorResponse),
        (status = 502, description = "Backend failure; earlier renames stay applied", body = ErrorResponse)
    )
)]
pub async fn bulk_rename(
    ctx: UserContext,
    State(state): State<Arc<AppState>>,
    Json(body): Json<BulkRenameRequest>,
) -> Result<Json<BulkRenameResponse>, HttpAppError> {
    check_batch_size(body.ids.len())?;

    if body.base_name.trim().is_empty() {
        return Err(HttpAppError(AppError::BadRequest(
            "base_name must not be empty".to_string(),
        )));
    }

    let results = state
        .orchestrator
        .rename_many(&ctx, body.ids, &body.base_name)
        .await?;

    Ok(Json(BulkRenameResponse {
        results: results
            .into_iter()
            .map(|r| BulkRenameResult {
                id: r.id,
                new_name: r.new_name,
                url: r.url,
            })
            .collect(),
    }))
}
