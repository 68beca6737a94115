pub mod credential;
pub mod folder;
pub mod media;

pub use credential::DriveCredential;
pub use folder::Folder;
pub use media::{MediaAsset, MediaKind};
