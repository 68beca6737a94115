//! OpenAPI documentation.

use crate::error;
use crate::handlers;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Arca API",
        version = "0.1.0",
        description = "Media storage and synchronization API (v0): pluggable storage backends (local filesystem, Google Drive, Cloudinary), streaming proxy with range support, and bulk media operations."
    ),
    paths(
        handlers::proxy::proxy_media,
        handlers::bulk_media::bulk_upload,
        handlers::bulk_media::bulk_delete,
        handlers::bulk_media::bulk_rename,
        handlers::gdrive_auth::connect,
        handlers::gdrive_auth::disconnect,
        handlers::gdrive_auth::status,
    ),
    components(schemas(
        error::ErrorResponse,
        handlers::bulk_media::UploadedAsset,
        handlers::bulk_media::BulkUploadResponse,
        handlers::bulk_media::BulkDeleteRequest,
        handlers::bulk_media::BulkDeleteResult,
        handlers::bulk_media::BulkDeleteResponse,
        handlers::bulk_media::BulkRenameRequest,
        handlers::bulk_media::BulkRenameResult,
        handlers::bulk_media::BulkRenameResponse,
        handlers::gdrive_auth::ConnectRequest,
        handlers::gdrive_auth::StatusResponse,
    )),
    tags(
        (name = "media", description = "Media storage operations"),
        (name = "gdrive", description = "Google Drive integration management")
    )
)]
pub struct ApiDoc;

pub fn openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
