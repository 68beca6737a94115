pub mod bulk_media;
pub mod gdrive_auth;
pub mod proxy;
