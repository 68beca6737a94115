//! Folder hierarchy synchronization.
//!
//! The internal folder tree (database rows with parent pointers) is the
//! source of truth. Before a Drive upload, the ancestor chain of the target
//! folder is mirrored top-down onto Drive, creating folders that do not
//! exist yet and reusing ones that do.

use crate::traits::{StorageError, StorageResult};
use arca_core::stores::FolderStore;
use arca_core::StorageBackend;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Guard against a corrupted parent chain forming a cycle.
const MAX_FOLDER_DEPTH: usize = 64;

/// The two folder operations the synchronizer needs from the remote store.
#[async_trait]
pub trait RemoteFolderApi: Send + Sync {
    /// Look up a child folder by display name under `parent_id`.
    async fn find_child_folder(
        &self,
        token: &str,
        parent_id: &str,
        name: &str,
    ) -> StorageResult<Option<String>>;

    /// Create a child folder and return its remote id.
    async fn create_folder(
        &self,
        token: &str,
        parent_id: &str,
        name: &str,
    ) -> StorageResult<String>;
}

/// Mirrors internal folder paths onto the remote folder tree.
pub struct HierarchySynchronizer {
    folders: Arc<dyn FolderStore>,
    root_folder_id: String,
}

impl HierarchySynchronizer {
    pub fn new(folders: Arc<dyn FolderStore>, root_folder_id: String) -> Self {
        Self {
            folders,
            root_folder_id,
        }
    }

    /// Resolve the remote folder id for an internal folder, creating any
    /// missing ancestors on the way down. Idempotent: a second call for the
    /// same folder resolves to the same remote id without creating anything.
    pub async fn resolve(
        &self,
        api: &dyn RemoteFolderApi,
        token: &str,
        folder_id: Uuid,
    ) -> StorageResult<String> {
        let names = match self.ancestor_names(folder_id).await? {
            Some(names) => names,
            None => {
                // No folder record. Fall back to a folder named after the id
                // under the root so the upload still lands somewhere findable.
                tracing::warn!(
                    folder_id = %folder_id,
                    "no folder record for upload target, using id-named folder under root"
                );
                vec![folder_id.to_string()]
            }
        };

        let mut parent_id = self.root_folder_id.clone();
        for name in &names {
            parent_id = self.ensure_child(api, token, &parent_id, name).await?;
        }

        Ok(parent_id)
    }

    /// Walk the parent chain up to the root and return the folder names in
    /// top-down order. `None` when no record exists for `folder_id` itself.
    async fn ancestor_names(&self, folder_id: Uuid) -> StorageResult<Option<Vec<String>>> {
        let Some(folder) = self.folders.folder(folder_id).await? else {
            return Ok(None);
        };

        let mut names = vec![folder.name.clone()];
        let mut cursor = folder.parent_id;

        while let Some(parent_id) = cursor {
            if names.len() >= MAX_FOLDER_DEPTH {
                return Err(StorageError::inconsistent(
                    StorageBackend::GoogleDrive,
                    "sync-hierarchy",
                    format!(
                        "folder {} exceeds depth {}, cyclic parent chain suspected",
                        folder_id, MAX_FOLDER_DEPTH
                    ),
                ));
            }

            let parent = self.folders.folder(parent_id).await?.ok_or_else(|| {
                StorageError::inconsistent(
                    StorageBackend::GoogleDrive,
                    "sync-hierarchy",
                    format!("folder {} references missing parent {}", folder_id, parent_id),
                )
            })?;

            names.push(parent.name.clone());
            cursor = parent.parent_id;
        }

        names.reverse();
        Ok(Some(names))
    }

    /// Find-or-create one level. Concurrent callers can race past the find
    /// and both create; the duplicate folder is benign and the upload still
    /// lands in a folder with the right name.
    async fn ensure_child(
        &self,
        api: &dyn RemoteFolderApi,
        token: &str,
        parent_id: &str,
        name: &str,
    ) -> StorageResult<String> {
        if let Some(existing) = api.find_child_folder(token, parent_id, name).await? {
            return Ok(existing);
        }

        let created = api.create_folder(token, parent_id, name).await?;
        tracing::info!(name = %name, remote_id = %created, "created remote folder");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arca_core::models::Folder;
    use arca_core::AppError;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MemoryFolderStore {
        folders: HashMap<Uuid, Folder>,
    }

    impl MemoryFolderStore {
        fn new(folders: Vec<Folder>) -> Self {
            Self {
                folders: folders.into_iter().map(|f| (f.id, f)).collect(),
            }
        }
    }

    #[async_trait]
    impl FolderStore for MemoryFolderStore {
        async fn folder(&self, id: Uuid) -> Result<Option<Folder>, AppError> {
            Ok(self.folders.get(&id).cloned())
        }

        async fn folder_access_meta(&self, id: Uuid) -> Result<Option<(Uuid, bool)>, AppError> {
            Ok(self.folders.get(&id).map(|f| (f.owner_id, f.is_public)))
        }
    }

    #[derive(Default)]
    struct FakeRemote {
        // (parent_id, name) -> remote id
        existing: Mutex<HashMap<(String, String), String>>,
        creations: AtomicUsize,
    }

    impl FakeRemote {
        fn seed(&self, parent: &str, name: &str, id: &str) {
            self.existing
                .lock()
                .unwrap()
                .insert((parent.to_string(), name.to_string()), id.to_string());
        }
    }

    #[async_trait]
    impl RemoteFolderApi for FakeRemote {
        async fn find_child_folder(
            &self,
            _token: &str,
            parent_id: &str,
            name: &str,
        ) -> StorageResult<Option<String>> {
            Ok(self
                .existing
                .lock()
                .unwrap()
                .get(&(parent_id.to_string(), name.to_string()))
                .cloned())
        }

        async fn create_folder(
            &self,
            _token: &str,
            parent_id: &str,
            name: &str,
        ) -> StorageResult<String> {
            let n = self.creations.fetch_add(1, Ordering::SeqCst);
            let id = format!("remote-{}", n);
            self.seed(parent_id, name, &id);
            Ok(id)
        }
    }

    fn folder(name: &str, parent_id: Option<Uuid>) -> Folder {
        Folder {
            id: Uuid::new_v4(),
            name: name.to_string(),
            parent_id,
            owner_id: Uuid::new_v4(),
            is_public: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_resolves_nested_path_top_down() {
        let root = folder("photos", None);
        let child = folder("2024", Some(root.id));
        let leaf = folder("summer", Some(child.id));
        let leaf_id = leaf.id;

        let store = Arc::new(MemoryFolderStore::new(vec![root, child, leaf]));
        let sync = HierarchySynchronizer::new(store, "drive-root".to_string());
        let remote = FakeRemote::default();

        let resolved = sync.resolve(&remote, "tok", leaf_id).await.unwrap();

        // Three levels created, leaf is the last one.
        assert_eq!(remote.creations.load(Ordering::SeqCst), 3);
        assert_eq!(resolved, "remote-2");
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let root = folder("photos", None);
        let root_id = root.id;

        let store = Arc::new(MemoryFolderStore::new(vec![root]));
        let sync = HierarchySynchronizer::new(store, "drive-root".to_string());
        let remote = FakeRemote::default();

        let first = sync.resolve(&remote, "tok", root_id).await.unwrap();
        let second = sync.resolve(&remote, "tok", root_id).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(remote.creations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reuses_preexisting_remote_folders() {
        let root = folder("photos", None);
        let root_id = root.id;

        let store = Arc::new(MemoryFolderStore::new(vec![root]));
        let sync = HierarchySynchronizer::new(store, "drive-root".to_string());
        let remote = FakeRemote::default();
        remote.seed("drive-root", "photos", "already-there");

        let resolved = sync.resolve(&remote, "tok", root_id).await.unwrap();

        assert_eq!(resolved, "already-there");
        assert_eq!(remote.creations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_record_falls_back_to_id_named_folder() {
        let store = Arc::new(MemoryFolderStore::new(vec![]));
        let sync = HierarchySynchronizer::new(store, "drive-root".to_string());
        let remote = FakeRemote::default();

        let unknown = Uuid::new_v4();
        let resolved = sync.resolve(&remote, "tok", unknown).await.unwrap();

        assert_eq!(resolved, "remote-0");
        let created = remote.existing.lock().unwrap();
        assert!(created.contains_key(&("drive-root".to_string(), unknown.to_string())));
    }

    #[tokio::test]
    async fn test_dangling_parent_is_inconsistent() {
        let mut child = folder("orphaned", None);
        child.parent_id = Some(Uuid::new_v4());
        let child_id = child.id;

        let store = Arc::new(MemoryFolderStore::new(vec![child]));
        let sync = HierarchySynchronizer::new(store, "drive-root".to_string());
        let remote = FakeRemote::default();

        let result = sync.resolve(&remote, "tok", child_id).await;
        assert!(matches!(result, Err(StorageError::Inconsistent(_))));
    }

    #[tokio::test]
    async fn test_cyclic_parent_chain_is_inconsistent() {
        let a_id = Uuid::new_v4();
        let b_id = Uuid::new_v4();

        let mut a = folder("a", Some(b_id));
        a.id = a_id;
        let mut b = folder("b", Some(a_id));
        b.id = b_id;

        let store = Arc::new(MemoryFolderStore::new(vec![a, b]));
        let sync = HierarchySynchronizer::new(store, "drive-root".to_string());
        let remote = FakeRemote::default();

        let result = sync.resolve(&remote, "tok", a_id).await;
        assert!(matches!(result, Err(StorageError::Inconsistent(_))));
    }
}
