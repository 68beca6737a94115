//! Arca Database Library
//!
//! Postgres repositories implementing the store traits from `arca-core`.
//! One repository per entity; all queries are tenant-free (Arca is a
//! single-installation system) and instrumented with table/operation fields.

mod credential;
mod folder;
mod grant;
mod media;

pub use credential::CredentialRepository;
pub use folder::FolderRepository;
pub use grant::GrantRepository;
pub use media::MediaRepository;
