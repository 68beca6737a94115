//! Store traits — the database collaborators of the synchronization core.
//!
//! The storage and API crates depend on these traits, never on a concrete
//! database. `arca-db` provides the Postgres implementations; tests use
//! in-memory fakes.

use crate::error::AppError;
use crate::models::{DriveCredential, Folder, MediaAsset};
use async_trait::async_trait;
use uuid::Uuid;

/// Read access to the internal folder tree.
#[async_trait]
pub trait FolderStore: Send + Sync {
    /// Primary lookup: the full folder row.
    async fn folder(&self, id: Uuid) -> Result<Option<Folder>, AppError>;

    /// Fallback lookup used by the Access Gate when the primary row shape is
    /// unavailable (schema drift): only (owner_id, is_public).
    async fn folder_access_meta(&self, id: Uuid) -> Result<Option<(Uuid, bool)>, AppError>;
}

/// Existence checks for explicit folder grants.
#[async_trait]
pub trait GrantStore: Send + Sync {
    async fn grant_exists(&self, user_id: Uuid, folder_id: Uuid) -> Result<bool, AppError>;
}

/// Read/write access to media asset rows.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn media(&self, id: Uuid) -> Result<Option<MediaAsset>, AppError>;

    async fn insert(&self, asset: &MediaAsset) -> Result<(), AppError>;

    /// Returns false when no row existed.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    /// Persist a rename: new display name, the locator the backend returned,
    /// and the new URL when the backend produced one (None keeps the old URL).
    async fn update_storage_ref(
        &self,
        id: Uuid,
        name: &str,
        storage_file_id: &str,
        url: Option<&str>,
    ) -> Result<(), AppError>;
}

/// The single-record credential cell for the Drive integration.
///
/// `replace` must atomically delete any existing record and insert the new
/// one — never merge fields.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> Result<Option<DriveCredential>, AppError>;

    async fn replace(&self, credential: &DriveCredential) -> Result<(), AppError>;

    async fn clear(&self) -> Result<(), AppError>;
}
