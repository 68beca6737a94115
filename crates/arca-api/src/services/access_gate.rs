//! Folder-level authorization.
//!
//! Access is granted when the folder is public, the caller owns it, or an
//! explicit grant exists. Admin bypass is the caller's responsibility, never
//! decided in here.

use arca_core::stores::{FolderStore, GrantStore};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct AccessGate {
    folders: Arc<dyn FolderStore>,
    grants: Arc<dyn GrantStore>,
}

impl AccessGate {
    pub fn new(folders: Arc<dyn FolderStore>, grants: Arc<dyn GrantStore>) -> Self {
        Self { folders, grants }
    }

    /// An unresolvable folder (missing row, failing lookups) denies access
    /// rather than erroring.
    pub async fn has_folder_access(&self, user_id: Uuid, folder_id: Uuid) -> bool {
        let Some((owner_id, is_public)) = self.folder_access_fields(folder_id).await else {
            return false;
        };

        if is_public || owner_id == user_id {
            return true;
        }

        match self.grants.grant_exists(user_id, folder_id).await {
            Ok(exists) => exists,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    folder_id = %folder_id,
                    "grant lookup failed, denying access"
                );
                false
            }
        }
    }

    /// Primary lookup is the full folder row; on failure the narrow
    /// (owner_id, is_public) query is tried before giving up.
    async fn folder_access_fields(&self, folder_id: Uuid) -> Option<(Uuid, bool)> {
        match self.folders.folder(folder_id).await {
            Ok(Some(folder)) => return Some((folder.owner_id, folder.is_public)),
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    folder_id = %folder_id,
                    "primary folder lookup failed, trying fallback"
                );
            }
        }

        match self.folders.folder_access_meta(folder_id).await {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    folder_id = %folder_id,
                    "fallback folder lookup failed, denying access"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arca_core::models::Folder;
    use arca_core::AppError;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::{HashMap, HashSet};

    struct FakeFolders {
        rows: HashMap<Uuid, Folder>,
        primary_broken: bool,
    }

    #[async_trait]
    impl FolderStore for FakeFolders {
        async fn folder(&self, id: Uuid) -> Result<Option<Folder>, AppError> {
            if self.primary_broken {
                return Err(AppError::Internal("column missing".into()));
            }
            Ok(self.rows.get(&id).cloned())
        }

        async fn folder_access_meta(&self, id: Uuid) -> Result<Option<(Uuid, bool)>, AppError> {
            Ok(self.rows.get(&id).map(|f| (f.owner_id, f.is_public)))
        }
    }

    struct FakeGrants {
        pairs: HashSet<(Uuid, Uuid)>,
    }

    #[async_trait]
    impl GrantStore for FakeGrants {
        async fn grant_exists(&self, user_id: Uuid, folder_id: Uuid) -> Result<bool, AppError> {
            Ok(self.pairs.contains(&(user_id, folder_id)))
        }
    }

    fn folder(owner_id: Uuid, is_public: bool) -> Folder {
        Folder {
            id: Uuid::new_v4(),
            name: "pics".to_string(),
            parent_id: None,
            owner_id,
            is_public,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn gate(folders: Vec<Folder>, grants: Vec<(Uuid, Uuid)>, primary_broken: bool) -> AccessGate {
        AccessGate::new(
            Arc::new(FakeFolders {
                rows: folders.into_iter().map(|f| (f.id, f)).collect(),
                primary_broken,
            }),
            Arc::new(FakeGrants {
                pairs: grants.into_iter().collect(),
            }),
        )
    }

    #[tokio::test]
    async fn test_public_folder_grants_anyone() {
        let f = folder(Uuid::new_v4(), true);
        let folder_id = f.id;
        let gate = gate(vec![f], vec![], false);

        assert!(gate.has_folder_access(Uuid::new_v4(), folder_id).await);
    }

    #[tokio::test]
    async fn test_private_folder_denies_stranger() {
        let f = folder(Uuid::new_v4(), false);
        let folder_id = f.id;
        let gate = gate(vec![f], vec![], false);

        assert!(!gate.has_folder_access(Uuid::new_v4(), folder_id).await);
    }

    #[tokio::test]
    async fn test_owner_has_access() {
        let owner = Uuid::new_v4();
        let f = folder(owner, false);
        let folder_id = f.id;
        let gate = gate(vec![f], vec![], false);

        assert!(gate.has_folder_access(owner, folder_id).await);
    }

    #[tokio::test]
    async fn test_explicit_grant_has_access() {
        let grantee = Uuid::new_v4();
        let f = folder(Uuid::new_v4(), false);
        let folder_id = f.id;
        let gate = gate(vec![f], vec![(grantee, folder_id)], false);

        assert!(gate.has_folder_access(grantee, folder_id).await);
    }

    #[tokio::test]
    async fn test_unresolvable_folder_denies() {
        let gate = gate(vec![], vec![], false);
        assert!(!gate.has_folder_access(Uuid::new_v4(), Uuid::new_v4()).await);
    }

    #[tokio::test]
    async fn test_fallback_lookup_used_when_primary_fails() {
        let owner = Uuid::new_v4();
        let f = folder(owner, false);
        let folder_id = f.id;
        let gate = gate(vec![f], vec![], true);

        assert!(gate.has_folder_access(owner, folder_id).await);
        assert!(!gate.has_folder_access(Uuid::new_v4(), folder_id).await);
    }
}
