//! Storage abstraction trait
//!
//! This module defines the `StorageProvider` contract that all backends
//! implement, and the error taxonomy they report through.

use arca_core::{AppError, StorageBackend};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Storage operation errors.
///
/// Every variant carries the backend name, operation, and underlying message
/// (folded into the string by the constructors below) so the caller layer can
/// log a diagnosable message without this crate knowing about its transport.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("quota exhausted or rate limited: {0}")]
    RateLimited(String),

    #[error("transient backend failure: {0}")]
    Transient(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("inconsistent backend response: {0}")]
    Inconsistent(String),

    #[error("storage configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    pub fn not_found(backend: StorageBackend, op: &str, detail: impl fmt::Display) -> Self {
        StorageError::NotFound(format!("{} {}: {}", backend, op, detail))
    }

    pub fn permission_denied(backend: StorageBackend, op: &str, detail: impl fmt::Display) -> Self {
        StorageError::PermissionDenied(format!("{} {}: {}", backend, op, detail))
    }

    pub fn rate_limited(backend: StorageBackend, op: &str, detail: impl fmt::Display) -> Self {
        StorageError::RateLimited(format!("{} {}: {}", backend, op, detail))
    }

    pub fn transient(backend: StorageBackend, op: &str, detail: impl fmt::Display) -> Self {
        StorageError::Transient(format!("{} {}: {}", backend, op, detail))
    }

    pub fn invalid_input(backend: StorageBackend, op: &str, detail: impl fmt::Display) -> Self {
        StorageError::InvalidInput(format!("{} {}: {}", backend, op, detail))
    }

    pub fn inconsistent(backend: StorageBackend, op: &str, detail: impl fmt::Display) -> Self {
        StorageError::Inconsistent(format!("{} {}: {}", backend, op, detail))
    }

    /// Classify an HTTP status returned by a backend REST API.
    pub fn from_status(
        backend: StorageBackend,
        op: &str,
        status: u16,
        body: impl fmt::Display,
    ) -> Self {
        let detail = format!("HTTP {}: {}", status, body);
        match status {
            404 | 410 => Self::not_found(backend, op, detail),
            401 | 403 => Self::permission_denied(backend, op, detail),
            429 => Self::rate_limited(backend, op, detail),
            400 | 422 => Self::invalid_input(backend, op, detail),
            s if s >= 500 => Self::transient(backend, op, detail),
            _ => Self::inconsistent(backend, op, detail),
        }
    }

    /// Wrap a transport-level client error (connect/timeout/body).
    pub fn from_request(backend: StorageBackend, op: &str, err: reqwest::Error) -> Self {
        Self::transient(backend, op, err)
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::PermissionDenied(msg) => AppError::PermissionDenied(msg),
            StorageError::RateLimited(msg) => AppError::UpstreamPermanent(msg),
            StorageError::Transient(msg) => AppError::UpstreamTransient(msg),
            StorageError::InvalidInput(msg) => AppError::InvalidInput(msg),
            StorageError::Inconsistent(msg) => AppError::Inconsistent(msg),
            StorageError::Config(msg) => AppError::Internal(msg),
            StorageError::Io(err) => AppError::Internal(format!("IO error: {}", err)),
        }
    }
}

// Database failures seen through the store traits surface as storage errors
// at this layer; the lookup itself is retryable from the caller's viewpoint.
impl From<AppError> for StorageError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::NotFound(msg) => StorageError::NotFound(msg),
            AppError::Inconsistent(msg) => StorageError::Inconsistent(msg),
            other => StorageError::Transient(format!("store lookup failed: {}", other)),
        }
    }
}

/// Logical destination of an upload: `<folderId>/<fileName>`.
///
/// Backends are free to reinterpret the folder segment — the remote
/// hierarchical store maps it onto its own folder tree, the local backend
/// treats it as a literal directory, and the CDN host ignores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalPath {
    pub folder_id: Uuid,
    pub file_name: String,
}

impl LogicalPath {
    pub fn new(folder_id: Uuid, file_name: impl Into<String>) -> Self {
        Self {
            folder_id,
            file_name: file_name.into(),
        }
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.folder_id, self.file_name)
    }
}

/// What an upload produced.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// Backend-specific locator for the stored object.
    pub file_id: String,
    /// Publicly usable content URL.
    pub url: String,
    pub backend: StorageBackend,
    /// Thumbnail URL when the backend provides one immediately.
    pub thumbnail_url: Option<String>,
}

/// What a rename produced. `file_id` may differ from the input id
/// (backend-dependent); callers must persist whatever comes back.
#[derive(Debug, Clone)]
pub struct RenameOutcome {
    pub file_id: String,
    pub url: Option<String>,
}

/// Storage abstraction trait
///
/// All backends implement this trait so callers resolve a provider from an
/// asset's backend tag and never couple to implementation details. All four
/// operations are safe to call concurrently for unrelated paths.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Store `data` at the logical path and return its locator and URL.
    async fn upload(
        &self,
        path: &LogicalPath,
        content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<UploadOutcome>;

    /// Fetch the full object bytes. Fails with `NotFound` when the id is
    /// unknown to this backend.
    async fn download(&self, file_id: &str) -> StorageResult<Vec<u8>>;

    /// Remove the object. Idempotent: deleting a non-existent id is a no-op,
    /// so cleanup-after-failure is safe to retry.
    async fn delete(&self, file_id: &str) -> StorageResult<()>;

    /// Change the object's display name. May return a new file id.
    async fn rename(&self, file_id: &str, new_name: &str) -> StorageResult<RenameOutcome>;

    /// Which backend this provider is.
    fn backend_type(&self) -> StorageBackend;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let backend = StorageBackend::GoogleDrive;
        assert!(matches!(
            StorageError::from_status(backend, "download", 404, "gone"),
            StorageError::NotFound(_)
        ));
        assert!(matches!(
            StorageError::from_status(backend, "upload", 403, "denied"),
            StorageError::PermissionDenied(_)
        ));
        assert!(matches!(
            StorageError::from_status(backend, "upload", 429, "slow down"),
            StorageError::RateLimited(_)
        ));
        assert!(matches!(
            StorageError::from_status(backend, "upload", 503, "unavailable"),
            StorageError::Transient(_)
        ));
        assert!(matches!(
            StorageError::from_status(backend, "upload", 400, "bad"),
            StorageError::InvalidInput(_)
        ));
    }

    #[test]
    fn test_errors_carry_backend_and_operation() {
        let err = StorageError::from_status(StorageBackend::Cloudinary, "rename", 500, "boom");
        let msg = err.to_string();
        assert!(msg.contains("cloudinary"));
        assert!(msg.contains("rename"));
        assert!(msg.contains("boom"));
    }

    #[test]
    fn test_logical_path_display() {
        let folder_id = Uuid::nil();
        let path = LogicalPath::new(folder_id, "photo.jpg");
        assert_eq!(
            path.to_string(),
            format!("{}/photo.jpg", Uuid::nil())
        );
    }
}
