use crate::naming;
use crate::traits::{
    LogicalPath, RenameOutcome, StorageError, StorageProvider, StorageResult, UploadOutcome,
};
use arca_core::StorageBackend;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
///
/// Maps the logical path directly under a fixed root directory. The file id
/// is the relative key; `download`/`delete` also accept the canonical public
/// URL for backward compatibility with rows written by older versions.
#[derive(Clone)]
pub struct LocalProvider {
    base_path: PathBuf,
    base_url: String,
}

impl LocalProvider {
    /// Create a new LocalProvider rooted at `base_path`, serving files under
    /// `base_url` (e.g. "http://localhost:3000/media").
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::Config(format!(
                "failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalProvider {
            base_path,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Accept either the canonical public path or the raw relative key.
    fn normalize_key(&self, file_id: &str) -> String {
        let key = match file_id.strip_prefix(&self.base_url) {
            Some(rest) => rest,
            None => file_id,
        };
        key.trim_start_matches('/').to_string()
    }

    /// Convert a relative key to a filesystem path, rejecting keys that could
    /// escape the storage root.
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() || key.contains("..") || key.starts_with('/') {
            return Err(StorageError::invalid_input(
                StorageBackend::Local,
                "resolve",
                format!("storage key {:?} escapes the storage root", key),
            ));
        }

        Ok(self.base_path.join(key))
    }

    fn key_for(path: &LogicalPath) -> String {
        format!(
            "{}/{}",
            path.folder_id,
            naming::sanitize_file_name(&path.file_name)
        )
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    async fn ensure_parent_dir(path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageProvider for LocalProvider {
    async fn upload(
        &self,
        path: &LogicalPath,
        _content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<UploadOutcome> {
        let key = Self::key_for(path);
        let fs_path = self.key_to_path(&key)?;
        let size = data.len();

        Self::ensure_parent_dir(&fs_path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&fs_path).await.map_err(|e| {
            StorageError::transient(
                StorageBackend::Local,
                "upload",
                format!("failed to create {}: {}", fs_path.display(), e),
            )
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::transient(
                StorageBackend::Local,
                "upload",
                format!("failed to write {}: {}", fs_path.display(), e),
            )
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::transient(
                StorageBackend::Local,
                "upload",
                format!("failed to sync {}: {}", fs_path.display(), e),
            )
        })?;

        tracing::info!(
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "local upload successful"
        );

        Ok(UploadOutcome {
            url: self.url_for(&key),
            file_id: key,
            backend: StorageBackend::Local,
            thumbnail_url: None,
        })
    }

    async fn download(&self, file_id: &str) -> StorageResult<Vec<u8>> {
        let key = self.normalize_key(file_id);
        let path = self.key_to_path(&key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::not_found(
                StorageBackend::Local,
                "download",
                &key,
            ));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::transient(
                StorageBackend::Local,
                "download",
                format!("failed to read {}: {}", path.display(), e),
            )
        })?;

        Ok(data)
    }

    async fn delete(&self, file_id: &str) -> StorageResult<()> {
        let key = self.normalize_key(file_id);
        let path = self.key_to_path(&key)?;

        // Deleting a missing file is a no-op; callers rely on this to make
        // cleanup-after-failure retryable.
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::transient(
                StorageBackend::Local,
                "delete",
                format!("failed to delete {}: {}", path.display(), e),
            )
        })?;

        tracing::info!(key = %key, "local delete successful");

        Ok(())
    }

    async fn rename(&self, file_id: &str, new_name: &str) -> StorageResult<RenameOutcome> {
        let key = self.normalize_key(file_id);
        let old_path = self.key_to_path(&key)?;

        if !fs::try_exists(&old_path).await.unwrap_or(false) {
            return Err(StorageError::not_found(
                StorageBackend::Local,
                "rename",
                &key,
            ));
        }

        // Rename in place: same directory, sanitized new file name.
        let new_key = match key.rfind('/') {
            Some(idx) => format!("{}/{}", &key[..idx], naming::sanitize_file_name(new_name)),
            None => naming::sanitize_file_name(new_name),
        };
        let new_path = self.key_to_path(&new_key)?;

        fs::rename(&old_path, &new_path).await.map_err(|e| {
            StorageError::transient(
                StorageBackend::Local,
                "rename",
                format!(
                    "failed to rename {} to {}: {}",
                    old_path.display(),
                    new_path.display(),
                    e
                ),
            )
        })?;

        tracing::info!(from = %key, to = %new_key, "local rename successful");

        Ok(RenameOutcome {
            url: Some(self.url_for(&new_key)),
            file_id: new_key,
        })
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use uuid::Uuid;

    const BASE_URL: &str = "http://localhost:3000/media";

    async fn provider(dir: &tempfile::TempDir) -> LocalProvider {
        LocalProvider::new(dir.path(), BASE_URL.to_string())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_download_roundtrip() {
        let dir = tempdir().unwrap();
        let storage = provider(&dir).await;

        let path = LogicalPath::new(Uuid::new_v4(), "test.txt");
        let data = b"test data".to_vec();

        let outcome = storage.upload(&path, "text/plain", data.clone()).await.unwrap();

        assert!(outcome.file_id.contains("test.txt"));
        assert!(outcome.url.starts_with(BASE_URL));

        let downloaded = storage.download(&outcome.file_id).await.unwrap();
        assert_eq!(data, downloaded);
    }

    #[tokio::test]
    async fn test_download_accepts_public_url() {
        let dir = tempdir().unwrap();
        let storage = provider(&dir).await;

        let path = LogicalPath::new(Uuid::new_v4(), "via_url.txt");
        let outcome = storage
            .upload(&path, "text/plain", b"body".to_vec())
            .await
            .unwrap();

        let downloaded = storage.download(&outcome.url).await.unwrap();
        assert_eq!(downloaded, b"body");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let storage = provider(&dir).await;

        let path = LogicalPath::new(Uuid::new_v4(), "gone.txt");
        let outcome = storage
            .upload(&path, "text/plain", b"x".to_vec())
            .await
            .unwrap();

        storage.delete(&outcome.file_id).await.unwrap();
        // Second delete of the same id must not raise.
        storage.delete(&outcome.file_id).await.unwrap();
        // Nor does deleting something that never existed.
        storage.delete("nonexistent/file.txt").await.unwrap();
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = provider(&dir).await;

        let result = storage.download("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidInput(_))));

        let result = storage.delete("../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_rename_sanitizes_and_returns_new_id() {
        let dir = tempdir().unwrap();
        let storage = provider(&dir).await;

        let folder_id = Uuid::new_v4();
        let path = LogicalPath::new(folder_id, "before.txt");
        let outcome = storage
            .upload(&path, "text/plain", b"content".to_vec())
            .await
            .unwrap();

        let renamed = storage
            .rename(&outcome.file_id, "after name?.txt")
            .await
            .unwrap();

        assert_eq!(renamed.file_id, format!("{}/after_name_.txt", folder_id));
        assert_eq!(
            renamed.url.as_deref(),
            Some(format!("{}/{}/after_name_.txt", BASE_URL, folder_id).as_str())
        );

        // Old id is gone, new id resolves.
        assert!(matches!(
            storage.download(&outcome.file_id).await,
            Err(StorageError::NotFound(_))
        ));
        assert_eq!(storage.download(&renamed.file_id).await.unwrap(), b"content");
    }

    #[tokio::test]
    async fn test_upload_sanitizes_file_name() {
        let dir = tempdir().unwrap();
        let storage = provider(&dir).await;

        let path = LogicalPath::new(Uuid::new_v4(), "weird name!.png");
        let outcome = storage
            .upload(&path, "image/png", b"png".to_vec())
            .await
            .unwrap();

        assert!(outcome.file_id.ends_with("weird_name_.png"));
    }
}
