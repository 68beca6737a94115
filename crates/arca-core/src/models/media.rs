use crate::storage_types::StorageBackend;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "sqlx")]
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Media kind. Arca only manages images and videos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            other => Err(format!("unknown media kind: {}", other)),
        }
    }
}

impl TryFrom<String> for MediaKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A stored media object plus its database record.
///
/// `storage_backend` says which backend owns the bytes; `storage_file_id` is
/// the backend-specific locator (a relative path for the local backend, a
/// Drive file id, or a Cloudinary public id). Rename may replace the locator,
/// so callers always persist whatever id a provider hands back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct MediaAsset {
    pub id: Uuid,
    pub folder_id: Uuid,
    pub name: String,
    #[cfg_attr(feature = "sqlx", sqlx(try_from = "String"))]
    pub kind: MediaKind,
    pub file_size: i64,
    pub format: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "storage_type", try_from = "String"))]
    pub storage_backend: StorageBackend,
    pub storage_file_id: String,
    pub url: String,
    pub thumbnail_url: Option<String>,
    /// Backend locator of a user-supplied thumbnail object, if one exists.
    pub thumbnail_file_id: Option<String>,
    /// True when the thumbnail was uploaded by the user rather than derived
    /// by the backend.
    pub thumbnail_is_custom: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_roundtrip() {
        assert_eq!("image".parse::<MediaKind>(), Ok(MediaKind::Image));
        assert_eq!("Video".parse::<MediaKind>(), Ok(MediaKind::Video));
        assert!("audio".parse::<MediaKind>().is_err());
    }

    #[test]
    fn test_serializes_with_wire_tags() {
        let asset = sample_asset("clip.mp4");
        let json = serde_json::to_value(&asset).unwrap();
        assert_eq!(json["kind"], "video");
        assert_eq!(json["storage_backend"], "local");
    }

    fn sample_asset(name: &str) -> MediaAsset {
        MediaAsset {
            id: Uuid::new_v4(),
            folder_id: Uuid::new_v4(),
            name: name.to_string(),
            kind: MediaKind::Video,
            file_size: 1024,
            format: Some("mp4".to_string()),
            storage_backend: StorageBackend::Local,
            storage_file_id: "x/y".to_string(),
            url: "http://localhost:3000/media/x/y".to_string(),
            thumbnail_url: None,
            thumbnail_file_id: None,
            thumbnail_is_custom: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
