//! Arca Storage Library
//!
//! The storage abstraction and synchronization layer. Every backend — local
//! filesystem, Google Drive (remote hierarchical store), Cloudinary (CDN
//! media host) — implements the same `StorageProvider` contract so the rest
//! of the system cannot tell them apart.
//!
//! # File id formats
//!
//! - **Local**: the relative key `{folder_id}/{sanitized_file_name}`.
//! - **Google Drive**: the Drive file id; stable across renames.
//! - **Cloudinary**: the public id `{media_kind}/{file_stem}`; rename
//!   produces a *new* public id, which callers must persist.

pub mod cloudinary;
pub mod factory;
pub mod gdrive;
pub mod local;
pub mod naming;
pub mod token;
pub mod traits;

// Re-export commonly used types
pub use arca_core::StorageBackend;
pub use cloudinary::CloudinaryProvider;
pub use factory::{build_registry, ProviderRegistry};
pub use gdrive::{CredentialResolver, GoogleDriveProvider, HierarchySynchronizer};
pub use local::LocalProvider;
pub use token::{GoogleRefreshEndpoint, RefreshEndpoint, TokenError, TokenManager, TokenSet};
pub use traits::{
    LogicalPath, RenameOutcome, StorageError, StorageProvider, StorageResult, UploadOutcome,
};
