use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "sqlx")]
use sqlx::FromRow;
use uuid::Uuid;

/// Folder model for organizing media assets hierarchically.
///
/// The folder's position in this internal tree determines the path used to
/// mirror it into the remote hierarchical store; the mirror is keyed by
/// folder *names*, not ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct Folder {
    pub id: Uuid,
    pub name: String,
    /// None means this is a root folder.
    pub parent_id: Option<Uuid>,
    pub owner_id: Uuid,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
