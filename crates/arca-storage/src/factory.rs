//! Provider registry
//!
//! Builds the configured backends once at startup and hands out
//! `Arc<dyn StorageProvider>` by backend tag. Only the local backend is
//! mandatory; the others exist when their credentials are configured.

use crate::cloudinary::CloudinaryProvider;
use crate::gdrive::{
    CredentialResolver, DriveClient, GoogleDriveProvider, HierarchySynchronizer,
    ServiceAccountAuth,
};
use crate::local::LocalProvider;
use crate::token::TokenManager;
use crate::traits::{StorageError, StorageProvider, StorageResult};
use arca_core::stores::FolderStore;
use arca_core::{Config, StorageBackend};
use std::sync::Arc;

const DEFAULT_DRIVE_ROOT: &str = "root";

#[derive(Clone)]
pub struct ProviderRegistry {
    local: Arc<LocalProvider>,
    gdrive: Option<Arc<GoogleDriveProvider>>,
    cloudinary: Option<Arc<CloudinaryProvider>>,
}

impl ProviderRegistry {
    pub fn new(
        local: Arc<LocalProvider>,
        gdrive: Option<Arc<GoogleDriveProvider>>,
        cloudinary: Option<Arc<CloudinaryProvider>>,
    ) -> Self {
        Self {
            local,
            gdrive,
            cloudinary,
        }
    }

    /// Registry with only the mandatory backend, used by tests.
    pub fn local_only(local: Arc<LocalProvider>) -> Self {
        Self::new(local, None, None)
    }

    /// Resolve a provider by the backend tag stored on an asset.
    pub fn provider_for(&self, backend: StorageBackend) -> StorageResult<Arc<dyn StorageProvider>> {
        match backend {
            StorageBackend::Local => Ok(self.local.clone()),
            StorageBackend::GoogleDrive => self
                .gdrive
                .clone()
                .map(|p| p as Arc<dyn StorageProvider>)
                .ok_or_else(|| {
                    StorageError::Config("google drive backend is not configured".to_string())
                }),
            StorageBackend::Cloudinary => self
                .cloudinary
                .clone()
                .map(|p| p as Arc<dyn StorageProvider>)
                .ok_or_else(|| {
                    StorageError::Config("cloudinary backend is not configured".to_string())
                }),
        }
    }

    /// Concrete handle for the streaming proxy, which needs Drive-specific
    /// operations beyond the provider contract.
    pub fn gdrive(&self) -> Option<Arc<GoogleDriveProvider>> {
        self.gdrive.clone()
    }
}

/// Build the registry from configuration. The token manager is owned by the
/// caller because the OAuth connect/disconnect endpoints need it too.
pub async fn build_registry(
    config: &Config,
    folders: Arc<dyn FolderStore>,
    tokens: Arc<TokenManager>,
) -> StorageResult<ProviderRegistry> {
    let local = Arc::new(
        LocalProvider::new(
            config.local_storage_path.clone(),
            config.local_storage_base_url.clone(),
        )
        .await?,
    );

    let gdrive = if config.gdrive_configured() {
        let service = match (
            &config.google_service_account_email,
            &config.google_service_account_key,
        ) {
            (Some(email), Some(key)) => Some(ServiceAccountAuth::new(
                email.clone(),
                key,
                config.google_token_endpoint.clone(),
            )?),
            _ => None,
        };

        let resolver = CredentialResolver::new(tokens, service);
        let root = config
            .drive_root_folder_id
            .clone()
            .unwrap_or_else(|| DEFAULT_DRIVE_ROOT.to_string());
        let hierarchy = HierarchySynchronizer::new(folders, root);

        tracing::info!("google drive backend enabled");
        Some(Arc::new(GoogleDriveProvider::new(
            DriveClient::new(),
            resolver,
            hierarchy,
        )))
    } else {
        None
    };

    let cloudinary = match (
        &config.cloudinary_cloud_name,
        &config.cloudinary_api_key,
        &config.cloudinary_api_secret,
    ) {
        (Some(cloud), Some(key), Some(secret)) => {
            tracing::info!(cloud_name = %cloud, "cloudinary backend enabled");
            Some(Arc::new(CloudinaryProvider::new(
                cloud.clone(),
                key.clone(),
                secret.clone(),
            )))
        }
        _ => None,
    };

    Ok(ProviderRegistry::new(local, gdrive, cloudinary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_unconfigured_backends_are_config_errors() {
        let dir = tempdir().unwrap();
        let local = Arc::new(
            LocalProvider::new(dir.path(), "http://localhost:3000/media".to_string())
                .await
                .unwrap(),
        );

        let registry = ProviderRegistry::local_only(local);

        assert!(registry.provider_for(StorageBackend::Local).is_ok());
        assert!(matches!(
            registry.provider_for(StorageBackend::GoogleDrive),
            Err(StorageError::Config(_))
        ));
        assert!(matches!(
            registry.provider_for(StorageBackend::Cloudinary),
            Err(StorageError::Config(_))
        ));
        assert!(registry.gdrive().is_none());
    }
}
