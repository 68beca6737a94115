use arca_core::{models::DriveCredential, AppError, CredentialStore};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres};

/// Repository for the single Drive credential record.
///
/// The table holds at most one row. `replace` runs delete-then-insert in one
/// transaction so readers never observe two records.
#[derive(Clone)]
pub struct CredentialRepository {
    pool: PgPool,
}

impl CredentialRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for CredentialRepository {
    #[tracing::instrument(skip(self), fields(db.table = "drive_credentials", db.operation = "select"))]
    async fn load(&self) -> Result<Option<DriveCredential>, AppError> {
        let credential = sqlx::query_as::<Postgres, DriveCredential>(
            r#"
            SELECT id, access_token, refresh_token, expires_at, scope, token_kind, created_at
            FROM drive_credentials
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(credential)
    }

    #[tracing::instrument(skip(self, credential), fields(db.table = "drive_credentials", db.operation = "replace"))]
    async fn replace(&self, credential: &DriveCredential) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM drive_credentials")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO drive_credentials (id, access_token, refresh_token, expires_at, scope, token_kind, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(credential.id)
        .bind(&credential.access_token)
        .bind(&credential.refresh_token)
        .bind(credential.expires_at)
        .bind(&credential.scope)
        .bind(&credential.token_kind)
        .bind(credential.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "drive_credentials", db.operation = "delete"))]
    async fn clear(&self) -> Result<(), AppError> {
        sqlx::query("DELETE FROM drive_credentials")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
