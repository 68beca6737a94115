//! Storage backend tags.
//!
//! Every media asset row carries one of these tags; the provider factory maps
//! the tag back to a concrete backend. The set is closed on purpose: adding a
//! backend means adding a variant here and an arm in the factory.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The storage backend owning a media object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Local filesystem under a configured root directory.
    Local,
    /// Google Drive (remote hierarchical store with its own folder tree).
    #[serde(rename = "gdrive")]
    GoogleDrive,
    /// Cloudinary (CDN media host, namespaced by backend-assigned id).
    Cloudinary,
}

impl StorageBackend {
    /// Canonical wire/database tag for this backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Local => "local",
            StorageBackend::GoogleDrive => "gdrive",
            StorageBackend::Cloudinary => "cloudinary",
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(StorageBackend::Local),
            // "google-drive" is the historical tag, kept for rows written
            // before the short form became canonical.
            "gdrive" | "google-drive" => Ok(StorageBackend::GoogleDrive),
            "cloudinary" => Ok(StorageBackend::Cloudinary),
            other => Err(format!("unknown storage backend tag: {}", other)),
        }
    }
}

impl TryFrom<String> for StorageBackend {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_tags() {
        assert_eq!("local".parse::<StorageBackend>(), Ok(StorageBackend::Local));
        assert_eq!(
            "gdrive".parse::<StorageBackend>(),
            Ok(StorageBackend::GoogleDrive)
        );
        assert_eq!(
            "google-drive".parse::<StorageBackend>(),
            Ok(StorageBackend::GoogleDrive)
        );
        assert_eq!(
            "cloudinary".parse::<StorageBackend>(),
            Ok(StorageBackend::Cloudinary)
        );
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(
            "GDrive".parse::<StorageBackend>(),
            Ok(StorageBackend::GoogleDrive)
        );
    }

    #[test]
    fn test_unknown_tag_rejected() {
        assert!("s3".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_roundtrip_through_canonical_tag() {
        for backend in [
            StorageBackend::Local,
            StorageBackend::GoogleDrive,
            StorageBackend::Cloudinary,
        ] {
            assert_eq!(backend.as_str().parse::<StorageBackend>(), Ok(backend));
        }
    }
}
