use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "sqlx")]
use sqlx::FromRow;
use uuid::Uuid;

/// The single active OAuth credential set for the Drive integration.
///
/// At most one record exists system-wide; writing a new one fully replaces
/// the previous record. The persisted record is the only truth — there is no
/// in-memory cache, so a disconnect takes effect on the very next operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct DriveCredential {
    pub id: Uuid,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub scope: Option<String>,
    pub token_kind: String,
    pub created_at: DateTime<Utc>,
}
