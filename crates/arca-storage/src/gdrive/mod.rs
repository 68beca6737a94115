//! Google Drive storage implementation
//!
//! Remote hierarchical store: uploads mirror the internal folder tree onto
//! Drive first, then place the file in the resolved remote folder. The file
//! id is Drive's own id and stays stable across renames.

mod client;
mod credentials;
mod hierarchy;

pub use client::{DriveClient, DriveFile};
pub use credentials::{CredentialResolver, ServiceAccountAuth};
pub use hierarchy::{HierarchySynchronizer, RemoteFolderApi};

use crate::traits::{
    LogicalPath, RenameOutcome, StorageProvider, StorageResult, UploadOutcome,
};
use arca_core::StorageBackend;
use async_trait::async_trait;

pub struct GoogleDriveProvider {
    client: DriveClient,
    resolver: CredentialResolver,
    hierarchy: HierarchySynchronizer,
}

impl GoogleDriveProvider {
    pub fn new(
        client: DriveClient,
        resolver: CredentialResolver,
        hierarchy: HierarchySynchronizer,
    ) -> Self {
        Self {
            client,
            resolver,
            hierarchy,
        }
    }

    fn content_url(file: &DriveFile) -> String {
        file.web_content_link.clone().unwrap_or_else(|| {
            format!("https://drive.google.com/uc?id={}&export=download", file.id)
        })
    }

    /// Raw media response for streaming relay, optionally ranged.
    pub async fn fetch_media(
        &self,
        file_id: &str,
        range: Option<&str>,
    ) -> StorageResult<reqwest::Response> {
        let token = self.resolver.access_token().await?;
        self.client.fetch_media(&token, file_id, range).await
    }

    /// Drive's own thumbnail link for a file, when it has generated one.
    pub async fn thumbnail_link(&self, file_id: &str) -> StorageResult<Option<String>> {
        let token = self.resolver.access_token().await?;
        let file = self.client.get_file(&token, file_id).await?;
        Ok(file.thumbnail_link)
    }

    /// Fetch a thumbnail link's content for relay.
    pub async fn fetch_thumbnail(&self, link: &str) -> StorageResult<reqwest::Response> {
        let token = self.resolver.access_token().await?;
        self.client.fetch_url(&token, link).await
    }
}

#[async_trait]
impl StorageProvider for GoogleDriveProvider {
    async fn upload(
        &self,
        path: &LogicalPath,
        content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<UploadOutcome> {
        let token = self.resolver.access_token().await?;
        let size = data.len();

        let parent_id = self
            .hierarchy
            .resolve(&self.client, &token, path.folder_id)
            .await?;

        let start = std::time::Instant::now();

        let file = self
            .client
            .upload_file(&token, &parent_id, &path.file_name, content_type, data)
            .await?;

        tracing::info!(
            file_id = %file.id,
            name = %file.name,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "drive upload successful"
        );

        Ok(UploadOutcome {
            url: Self::content_url(&file),
            thumbnail_url: file.thumbnail_link.clone(),
            file_id: file.id,
            backend: StorageBackend::GoogleDrive,
        })
    }

    async fn download(&self, file_id: &str) -> StorageResult<Vec<u8>> {
        let token = self.resolver.access_token().await?;
        self.client.download(&token, file_id).await
    }

    async fn delete(&self, file_id: &str) -> StorageResult<()> {
        let token = self.resolver.access_token().await?;
        self.client.delete_file(&token, file_id).await?;
        tracing::info!(file_id = %file_id, "drive delete successful");
        Ok(())
    }

    async fn rename(&self, file_id: &str, new_name: &str) -> StorageResult<RenameOutcome> {
        let token = self.resolver.access_token().await?;
        let file = self.client.rename_file(&token, file_id, new_name).await?;

        tracing::info!(file_id = %file.id, name = %file.name, "drive rename successful");

        // The id never changes on rename; the content link can.
        Ok(RenameOutcome {
            url: Some(Self::content_url(&file)),
            file_id: file.id,
        })
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::GoogleDrive
    }
}
