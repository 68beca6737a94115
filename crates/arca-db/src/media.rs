use arca_core::{models::MediaAsset, AppError, MediaStore};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Repository for media asset rows.
#[derive(Clone)]
pub struct MediaRepository {
    pool: PgPool,
}

impl MediaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MediaStore for MediaRepository {
    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select", db.record_id = %id))]
    async fn media(&self, id: Uuid) -> Result<Option<MediaAsset>, AppError> {
        let asset = sqlx::query_as::<Postgres, MediaAsset>(
            r#"
            SELECT id, folder_id, name, kind, file_size, format, storage_type,
                   storage_file_id, url, thumbnail_url, thumbnail_file_id,
                   thumbnail_is_custom, created_at, updated_at
            FROM media WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(asset)
    }

    #[tracing::instrument(skip(self, asset), fields(db.table = "media", db.operation = "insert", db.record_id = %asset.id))]
    async fn insert(&self, asset: &MediaAsset) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO media (id, folder_id, name, kind, file_size, format,
                               storage_type, storage_file_id, url, thumbnail_url,
                               thumbnail_file_id, thumbnail_is_custom, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(asset.id)
        .bind(asset.folder_id)
        .bind(&asset.name)
        .bind(asset.kind.as_str())
        .bind(asset.file_size)
        .bind(&asset.format)
        .bind(asset.storage_backend.as_str())
        .bind(&asset.storage_file_id)
        .bind(&asset.url)
        .bind(&asset.thumbnail_url)
        .bind(&asset.thumbnail_file_id)
        .bind(asset.thumbnail_is_custom)
        .bind(asset.created_at)
        .bind(asset.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let rows_affected = sqlx::query("DELETE FROM media WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "update", db.record_id = %id))]
    async fn update_storage_ref(
        &self,
        id: Uuid,
        name: &str,
        storage_file_id: &str,
        url: Option<&str>,
    ) -> Result<(), AppError> {
        // COALESCE keeps the previous URL when the backend returned none.
        let rows_affected = sqlx::query(
            r#"
            UPDATE media
            SET name = $2, storage_file_id = $3, url = COALESCE($4, url), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(storage_file_id)
        .bind(url)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!("media {}", id)));
        }

        Ok(())
    }
}
