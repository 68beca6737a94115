//! Bulk operation orchestration.
//!
//! Strictly sequential per request: file-by-file processing keeps the
//! compensation bookkeeping simple and the rename numbering deterministic.
//! Cross-request coordination is out of scope; two concurrent bulk calls
//! touching the same asset is a caller error.

use crate::auth::UserContext;
use crate::services::access_gate::AccessGate;
use crate::services::activity::{self, ActionKind, ActivityEntry, ActivityLogger};
use arca_core::models::{MediaAsset, MediaKind};
use arca_core::stores::{FolderStore, MediaStore};
use arca_core::{AppError, ErrorMetadata, StorageBackend};
use arca_storage::naming;
use arca_storage::{LogicalPath, ProviderRegistry};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// One file of a bulk upload request.
pub struct UploadItem {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Per-asset outcome of a bulk delete.
pub struct DeleteResult {
    pub id: Uuid,
    pub deleted: bool,
    pub error: Option<String>,
}

/// Per-asset outcome of a bulk rename.
pub struct RenameResult {
    pub id: Uuid,
    pub new_name: String,
    pub storage_file_id: String,
    pub url: Option<String>,
}

/// A compensating storage delete, recorded before the matching DB write.
struct Compensation {
    backend: StorageBackend,
    file_id: String,
}

pub struct BulkOrchestrator {
    registry: ProviderRegistry,
    media: Arc<dyn MediaStore>,
    folders: Arc<dyn FolderStore>,
    gate: AccessGate,
    activity: Arc<dyn ActivityLogger>,
}

impl BulkOrchestrator {
    pub fn new(
        registry: ProviderRegistry,
        media: Arc<dyn MediaStore>,
        folders: Arc<dyn FolderStore>,
        gate: AccessGate,
        activity: Arc<dyn ActivityLogger>,
    ) -> Self {
        Self {
            registry,
            media,
            folders,
            gate,
            activity,
        }
    }

    /// Display name only; a folder that cannot be resolved is reported by id.
    async fn folder_name(&self, folder_id: Uuid) -> String {
        match self.folders.folder(folder_id).await {
            Ok(Some(folder)) => folder.name,
            _ => folder_id.to_string(),
        }
    }

    fn record_activity(
        &self,
        ctx: &UserContext,
        action: ActionKind,
        asset: &MediaAsset,
        folder_name: &str,
    ) {
        activity::record(
            self.activity.clone(),
            ActivityEntry {
                actor_id: ctx.user_id,
                action,
                asset_id: asset.id,
                file_name: asset.name.clone(),
                media_kind: asset.kind,
                folder_id: asset.folder_id,
                folder_name: folder_name.to_string(),
            },
        );
    }

    async fn authorize(&self, ctx: &UserContext, folder_id: Uuid) -> Result<(), AppError> {
        if ctx.is_admin {
            return Ok(());
        }
        if self.gate.has_folder_access(ctx.user_id, folder_id).await {
            return Ok(());
        }
        Err(AppError::PermissionDenied(format!(
            "user {} has no access to folder {}",
            ctx.user_id, folder_id
        )))
    }

    /// Upload all files or none. A compensating storage delete is pushed
    /// before each DB insert and every inserted row id is tracked; on any
    /// failure the rows come back out and the whole compensation list runs
    /// in FIFO order (individual failures logged and swallowed), then the
    /// original error is re-raised.
    pub async fn upload_many(
        &self,
        ctx: &UserContext,
        folder_id: Uuid,
        backend: StorageBackend,
        items: Vec<UploadItem>,
    ) -> Result<Vec<MediaAsset>, AppError> {
        self.authorize(ctx, folder_id).await?;

        let folder_name = self.folder_name(folder_id).await;
        let provider = self.registry.provider_for(backend)?;
        let mut compensations: Vec<Compensation> = Vec::with_capacity(items.len());
        let mut inserted: Vec<MediaAsset> = Vec::with_capacity(items.len());

        for item in items {
            let path = LogicalPath::new(folder_id, item.file_name.clone());
            let file_size = item.data.len() as i64;
            let format = format_tag(&item.file_name, &item.content_type);

            let outcome = match provider.upload(&path, &item.content_type, item.data).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.roll_back(&inserted, compensations).await;
                    return Err(e.into());
                }
            };

            // From here on this file's stored object must be cleaned up if
            // anything later fails.
            compensations.push(Compensation {
                backend: outcome.backend,
                file_id: outcome.file_id.clone(),
            });

            let now = Utc::now();
            let asset = MediaAsset {
                id: Uuid::new_v4(),
                folder_id,
                name: item.file_name,
                kind: kind_from_content_type(&item.content_type),
                file_size,
                format,
                storage_backend: outcome.backend,
                storage_file_id: outcome.file_id,
                url: outcome.url,
                thumbnail_url: outcome.thumbnail_url,
                thumbnail_file_id: None,
                thumbnail_is_custom: false,
                created_at: now,
                updated_at: now,
            };

            if let Err(e) = self.media.insert(&asset).await {
                self.roll_back(&inserted, compensations).await;
                return Err(e);
            }

            self.record_activity(ctx, ActionKind::Upload, &asset, &folder_name);
            inserted.push(asset);
        }

        Ok(inserted)
    }

    /// Storage delete is best-effort; the DB row always goes away so the UI
    /// can never "delete" the same asset twice.
    pub async fn delete_many(
        &self,
        ctx: &UserContext,
        ids: Vec<Uuid>,
    ) -> Result<Vec<DeleteResult>, AppError> {
        let mut results = Vec::with_capacity(ids.len());

        for id in ids {
            let Some(asset) = self.media.media(id).await? else {
                results.push(DeleteResult {
                    id,
                    deleted: false,
                    error: Some("not found".to_string()),
                });
                continue;
            };

            if let Err(e) = self.authorize(ctx, asset.folder_id).await {
                // Per-item errors are serialized verbatim into the response,
                // so only the sanitized message may go in.
                results.push(DeleteResult {
                    id,
                    deleted: false,
                    error: Some(e.client_message()),
                });
                continue;
            }

            match self.registry.provider_for(asset.storage_backend) {
                Ok(provider) => {
                    if let Err(e) = provider.delete(&asset.storage_file_id).await {
                        tracing::warn!(
                            error = %e,
                            asset_id = %id,
                            file_id = %asset.storage_file_id,
                            "storage delete failed, removing record anyway"
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        asset_id = %id,
                        "no provider for asset backend, removing record anyway"
                    );
                }
            }

            let deleted = self.media.delete(id).await?;
            if deleted {
                let folder_name = self.folder_name(asset.folder_id).await;
                self.record_activity(ctx, ActionKind::Delete, &asset, &folder_name);
            }
            results.push(DeleteResult {
                id,
                deleted,
                error: None,
            });
        }

        Ok(results)
    }

    /// Renames in ascending creation order so the numeric suffixes are
    /// reproducible across retries. Aborts on the first failure; renames
    /// already applied stay applied.
    pub async fn rename_many(
        &self,
        ctx: &UserContext,
        ids: Vec<Uuid>,
        base_name: &str,
    ) -> Result<Vec<RenameResult>, AppError> {
        let base = naming::sanitize_file_name(base_name);
        let base = naming::file_stem(&base).to_string();

        let mut assets = Vec::with_capacity(ids.len());
        for id in ids {
            let asset = self
                .media
                .media(id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("media asset {}", id)))?;
            self.authorize(ctx, asset.folder_id).await?;
            assets.push(asset);
        }

        assets.sort_by_key(|a| a.created_at);

        let mut results = Vec::with_capacity(assets.len());

        for (index, mut asset) in assets.into_iter().enumerate() {
            let new_name = naming::numbered_name(&base, index + 1, &asset.name);
            let provider = self.registry.provider_for(asset.storage_backend)?;

            let outcome = provider.rename(&asset.storage_file_id, &new_name).await?;

            self.media
                .update_storage_ref(asset.id, &new_name, &outcome.file_id, outcome.url.as_deref())
                .await?;

            asset.name = new_name.clone();
            let folder_name = self.folder_name(asset.folder_id).await;
            self.record_activity(ctx, ActionKind::Rename, &asset, &folder_name);

            results.push(RenameResult {
                id: asset.id,
                new_name,
                storage_file_id: outcome.file_id,
                url: outcome.url,
            });
        }

        Ok(results)
    }

    /// Undo a partial bulk upload: remove the rows already inserted, then the
    /// stored objects, FIFO. Failures are logged and swallowed so the rest of
    /// the list still runs.
    async fn roll_back(&self, inserted: &[MediaAsset], compensations: Vec<Compensation>) {
        for asset in inserted {
            if let Err(e) = self.media.delete(asset.id).await {
                tracing::warn!(
                    error = %e,
                    asset_id = %asset.id,
                    "compensating row delete failed"
                );
            }
        }

        for comp in compensations {
            let provider = match self.registry.provider_for(comp.backend) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(error = %e, file_id = %comp.file_id, "compensation skipped");
                    continue;
                }
            };

            if let Err(e) = provider.delete(&comp.file_id).await {
                tracing::warn!(
                    error = %e,
                    file_id = %comp.file_id,
                    "compensating delete failed"
                );
            }
        }
    }
}

fn kind_from_content_type(content_type: &str) -> MediaKind {
    if content_type.starts_with("video/") {
        MediaKind::Video
    } else {
        MediaKind::Image
    }
}

fn format_tag(file_name: &str, content_type: &str) -> Option<String> {
    let ext = naming::extension(file_name);
    if !ext.is_empty() {
        return Some(ext.trim_start_matches('.').to_ascii_lowercase());
    }
    content_type.split_once('/').map(|(_, sub)| sub.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arca_core::models::Folder;
    use arca_core::stores::{FolderStore, GrantStore};
    use async_trait::async_trait;
    use chrono::Duration;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct FakeFolders {
        rows: HashMap<Uuid, Folder>,
    }

    #[async_trait]
    impl FolderStore for FakeFolders {
        async fn folder(&self, id: Uuid) -> Result<Option<Folder>, AppError> {
            Ok(self.rows.get(&id).cloned())
        }

        async fn folder_access_meta(&self, id: Uuid) -> Result<Option<(Uuid, bool)>, AppError> {
            Ok(self.rows.get(&id).map(|f| (f.owner_id, f.is_public)))
        }
    }

    struct NoGrants;

    #[async_trait]
    impl GrantStore for NoGrants {
        async fn grant_exists(&self, _user_id: Uuid, _folder_id: Uuid) -> Result<bool, AppError> {
            Ok(false)
        }
    }

    /// In-memory media store that can be told to fail the nth insert.
    #[derive(Default)]
    struct FakeMedia {
        rows: Mutex<HashMap<Uuid, MediaAsset>>,
        fail_insert_at: Option<usize>,
        inserts: Mutex<usize>,
    }

    #[async_trait]
    impl MediaStore for FakeMedia {
        async fn media(&self, id: Uuid) -> Result<Option<MediaAsset>, AppError> {
            Ok(self.rows.lock().unwrap().get(&id).cloned())
        }

        async fn insert(&self, asset: &MediaAsset) -> Result<(), AppError> {
            let mut count = self.inserts.lock().unwrap();
            *count += 1;
            if Some(*count) == self.fail_insert_at {
                return Err(AppError::Internal("simulated insert failure".into()));
            }
            self.rows.lock().unwrap().insert(asset.id, asset.clone());
            Ok(())
        }

        async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
            Ok(self.rows.lock().unwrap().remove(&id).is_some())
        }

        async fn update_storage_ref(
            &self,
            id: Uuid,
            name: &str,
            storage_file_id: &str,
            url: Option<&str>,
        ) -> Result<(), AppError> {
            let mut rows = self.rows.lock().unwrap();
            let asset = rows
                .get_mut(&id)
                .ok_or_else(|| AppError::NotFound(format!("media asset {}", id)))?;
            asset.name = name.to_string();
            asset.storage_file_id = storage_file_id.to_string();
            if let Some(url) = url {
                asset.url = url.to_string();
            }
            Ok(())
        }
    }

    /// Captures entries instead of emitting them.
    #[derive(Default)]
    struct RecordingLogger {
        entries: Mutex<Vec<ActivityEntry>>,
    }

    #[async_trait]
    impl ActivityLogger for RecordingLogger {
        async fn log(&self, entry: ActivityEntry) {
            self.entries.lock().unwrap().push(entry);
        }
    }

    struct Fixture {
        orchestrator: BulkOrchestrator,
        media: Arc<FakeMedia>,
        activity: Arc<RecordingLogger>,
        owner: UserContext,
        stranger: UserContext,
        folder_id: Uuid,
        _dir: tempfile::TempDir,
        storage_root: std::path::PathBuf,
    }

    async fn fixture(fail_insert_at: Option<usize>) -> Fixture {
        let dir = tempdir().unwrap();
        let storage_root = dir.path().to_path_buf();

        let local = arca_storage::LocalProvider::new(
            dir.path(),
            "http://localhost:3000/media".to_string(),
        )
        .await
        .unwrap();
        let registry = ProviderRegistry::local_only(Arc::new(local));

        let owner_id = Uuid::new_v4();
        let folder = Folder {
            id: Uuid::new_v4(),
            name: "pics".to_string(),
            parent_id: None,
            owner_id,
            is_public: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let folder_id = folder.id;

        let folders = Arc::new(FakeFolders {
            rows: [(folder.id, folder)].into_iter().collect(),
        });
        let media = Arc::new(FakeMedia {
            fail_insert_at,
            ..Default::default()
        });
        let activity = Arc::new(RecordingLogger::default());
        let gate = AccessGate::new(folders.clone(), Arc::new(NoGrants));
        let orchestrator = BulkOrchestrator::new(
            registry,
            media.clone(),
            folders,
            gate,
            activity.clone(),
        );

        Fixture {
            orchestrator,
            media,
            activity,
            owner: UserContext {
                user_id: owner_id,
                is_admin: false,
            },
            stranger: UserContext {
                user_id: Uuid::new_v4(),
                is_admin: false,
            },
            folder_id,
            _dir: dir,
            storage_root,
        }
    }

    fn items(names: &[&str]) -> Vec<UploadItem> {
        names
            .iter()
            .map(|n| UploadItem {
                file_name: n.to_string(),
                content_type: "image/jpeg".to_string(),
                data: b"bytes".to_vec(),
            })
            .collect()
    }

    fn stored_file_count(root: &std::path::Path) -> usize {
        fn walk(dir: &std::path::Path, count: &mut usize) {
            for entry in std::fs::read_dir(dir).unwrap() {
                let entry = entry.unwrap();
                if entry.path().is_dir() {
                    walk(&entry.path(), count);
                } else {
                    *count += 1;
                }
            }
        }
        let mut count = 0;
        walk(root, &mut count);
        count
    }

    #[tokio::test]
    async fn test_upload_many_stores_and_records_all() {
        let fx = fixture(None).await;

        let assets = fx
            .orchestrator
            .upload_many(
                &fx.owner,
                fx.folder_id,
                StorageBackend::Local,
                items(&["a.jpg", "b.jpg", "c.jpg"]),
            )
            .await
            .unwrap();

        assert_eq!(assets.len(), 3);
        assert_eq!(fx.media.rows.lock().unwrap().len(), 3);
        assert_eq!(stored_file_count(&fx.storage_root), 3);
        assert!(assets.iter().all(|a| a.kind == MediaKind::Image));
    }

    #[tokio::test]
    async fn test_upload_rollback_leaves_nothing_behind() {
        // Third insert fails: all three stored objects and all rows must go.
        let fx = fixture(Some(3)).await;

        let result = fx
            .orchestrator
            .upload_many(
                &fx.owner,
                fx.folder_id,
                StorageBackend::Local,
                items(&["a.jpg", "b.jpg", "c.jpg"]),
            )
            .await;

        assert!(result.is_err());
        assert_eq!(fx.media.rows.lock().unwrap().len(), 0);
        assert_eq!(stored_file_count(&fx.storage_root), 0);
    }

    #[tokio::test]
    async fn test_upload_denied_for_stranger() {
        let fx = fixture(None).await;

        let result = fx
            .orchestrator
            .upload_many(
                &fx.stranger,
                fx.folder_id,
                StorageBackend::Local,
                items(&["a.jpg"]),
            )
            .await;

        assert!(matches!(result, Err(AppError::PermissionDenied(_))));
        assert_eq!(stored_file_count(&fx.storage_root), 0);
    }

    #[tokio::test]
    async fn test_admin_bypasses_gate() {
        let fx = fixture(None).await;
        let admin = UserContext {
            user_id: Uuid::new_v4(),
            is_admin: true,
        };

        let assets = fx
            .orchestrator
            .upload_many(&admin, fx.folder_id, StorageBackend::Local, items(&["a.jpg"]))
            .await
            .unwrap();
        assert_eq!(assets.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_many_removes_rows_even_if_storage_fails() {
        let fx = fixture(None).await;

        let assets = fx
            .orchestrator
            .upload_many(
                &fx.owner,
                fx.folder_id,
                StorageBackend::Local,
                items(&["a.jpg", "b.jpg"]),
            )
            .await
            .unwrap();

        // Remove one object out from under the orchestrator; the idempotent
        // local delete treats it as a no-op and the row still goes away.
        std::fs::remove_file(fx.storage_root.join(&assets[0].storage_file_id)).unwrap();

        let results = fx
            .orchestrator
            .delete_many(&fx.owner, assets.iter().map(|a| a.id).collect())
            .await
            .unwrap();

        assert!(results.iter().all(|r| r.deleted && r.error.is_none()));
        assert_eq!(fx.media.rows.lock().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_delete_many_reports_missing_assets() {
        let fx = fixture(None).await;

        let results = fx
            .orchestrator
            .delete_many(&fx.owner, vec![Uuid::new_v4()])
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert!(!results[0].deleted);
        assert_eq!(results[0].error.as_deref(), Some("not found"));
    }

    #[tokio::test]
    async fn test_delete_denied_error_is_sanitized() {
        let fx = fixture(None).await;

        let assets = fx
            .orchestrator
            .upload_many(&fx.owner, fx.folder_id, StorageBackend::Local, items(&["a.jpg"]))
            .await
            .unwrap();

        let results = fx
            .orchestrator
            .delete_many(&fx.stranger, vec![assets[0].id])
            .await
            .unwrap();

        assert!(!results[0].deleted);
        // Per-item errors go to the client verbatim; the denial must not
        // reveal which folder (or that it exists at all).
        let error = results[0].error.as_deref().unwrap();
        assert_eq!(error, "Access denied");
        assert!(!error.contains(&fx.folder_id.to_string()));
    }

    #[tokio::test]
    async fn test_upload_records_activity_with_folder_name() {
        let fx = fixture(None).await;

        fx.orchestrator
            .upload_many(&fx.owner, fx.folder_id, StorageBackend::Local, items(&["a.jpg"]))
            .await
            .unwrap();

        // Dispatch is spawned; yield so the logging task gets to run.
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }

        let entries = fx.activity.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(matches!(entries[0].action, ActionKind::Upload));
        assert_eq!(entries[0].folder_id, fx.folder_id);
        assert_eq!(entries[0].folder_name, "pics");
    }

    #[tokio::test]
    async fn test_rename_numbering_ignores_input_order() {
        let fx = fixture(None).await;

        let assets = fx
            .orchestrator
            .upload_many(
                &fx.owner,
                fx.folder_id,
                StorageBackend::Local,
                items(&["first.jpg", "second.png", "third.gif"]),
            )
            .await
            .unwrap();

        // Force distinct, known creation times.
        {
            let mut rows = fx.media.rows.lock().unwrap();
            let t0 = Utc::now();
            for (i, asset) in assets.iter().enumerate() {
                rows.get_mut(&asset.id).unwrap().created_at = t0 + Duration::seconds(i as i64);
            }
        }

        // Pass ids in reverse; numbering must still follow creation time.
        let results = fx
            .orchestrator
            .rename_many(
                &fx.owner,
                assets.iter().rev().map(|a| a.id).collect(),
                "vacation",
            )
            .await
            .unwrap();

        let names: Vec<&str> = results.iter().map(|r| r.new_name.as_str()).collect();
        assert_eq!(names, vec!["vacation_1.jpg", "vacation_2.png", "vacation_3.gif"]);

        // The store reflects the returned locators.
        let rows = fx.media.rows.lock().unwrap();
        for result in &results {
            let row = rows.get(&result.id).unwrap();
            assert_eq!(row.name, result.new_name);
            assert_eq!(row.storage_file_id, result.storage_file_id);
        }
    }

    #[tokio::test]
    async fn test_rename_missing_asset_fails_before_any_rename() {
        let fx = fixture(None).await;

        let assets = fx
            .orchestrator
            .upload_many(&fx.owner, fx.folder_id, StorageBackend::Local, items(&["a.jpg"]))
            .await
            .unwrap();

        let result = fx
            .orchestrator
            .rename_many(&fx.owner, vec![assets[0].id, Uuid::new_v4()], "base")
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        // Validation happens up front, so the existing asset is untouched.
        assert_eq!(
            fx.media.rows.lock().unwrap().get(&assets[0].id).unwrap().name,
            "a.jpg"
        );
    }

    #[test]
    fn test_kind_from_content_type() {
        assert_eq!(kind_from_content_type("video/mp4"), MediaKind::Video);
        assert_eq!(kind_from_content_type("image/png"), MediaKind::Image);
        assert_eq!(
            kind_from_content_type("application/octet-stream"),
            MediaKind::Image
        );
    }

    #[test]
    fn test_format_tag() {
        assert_eq!(format_tag("photo.JPG", "image/jpeg").as_deref(), Some("jpg"));
        assert_eq!(format_tag("noext", "image/png").as_deref(), Some("png"));
    }
}
