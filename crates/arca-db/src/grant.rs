use arca_core::{AppError, GrantStore};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Repository for explicit folder grants.
#[derive(Clone)]
pub struct GrantRepository {
    pool: PgPool,
}

impl GrantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GrantStore for GrantRepository {
    #[tracing::instrument(skip(self), fields(db.table = "folder_grants", db.operation = "select"))]
    async fn grant_exists(&self, user_id: Uuid, folder_id: Uuid) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<Postgres, bool>(
            "SELECT EXISTS(SELECT 1 FROM folder_grants WHERE user_id = $1 AND folder_id = $2)",
        )
        .bind(user_id)
        .bind(folder_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}
