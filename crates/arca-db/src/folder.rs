use arca_core::{models::Folder, AppError, FolderStore};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Repository for reading the internal folder tree.
#[derive(Clone)]
pub struct FolderRepository {
    pool: PgPool,
}

impl FolderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FolderStore for FolderRepository {
    #[tracing::instrument(skip(self), fields(db.table = "folders", db.operation = "select", db.record_id = %id))]
    async fn folder(&self, id: Uuid) -> Result<Option<Folder>, AppError> {
        let folder = sqlx::query_as::<Postgres, Folder>(
            "SELECT id, name, parent_id, owner_id, is_public, created_at, updated_at FROM folders WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(folder)
    }

    /// Narrow fallback query used when the full row cannot be decoded, e.g.
    /// after a partial migration added or retyped columns.
    #[tracing::instrument(skip(self), fields(db.table = "folders", db.operation = "select", db.record_id = %id))]
    async fn folder_access_meta(&self, id: Uuid) -> Result<Option<(Uuid, bool)>, AppError> {
        let row = sqlx::query_as::<Postgres, (Uuid, bool)>(
            "SELECT owner_id, is_public FROM folders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
