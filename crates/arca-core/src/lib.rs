//! Arca Core Library
//!
//! Domain models, configuration, and error types shared by every Arca crate,
//! plus the store traits the storage and API layers consume. Database access
//! is always behind these traits so the synchronization core never couples to
//! a concrete database.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod stores;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
pub use stores::{CredentialStore, FolderStore, GrantStore, MediaStore};
