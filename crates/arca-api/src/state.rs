//! Shared application state.

use crate::services::access_gate::AccessGate;
use crate::services::activity::ActivityLogger;
use crate::services::bulk::BulkOrchestrator;
use arca_core::stores::{FolderStore, GrantStore, MediaStore};
use arca_core::Config;
use arca_storage::{ProviderRegistry, TokenManager};
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub folders: Arc<dyn FolderStore>,
    pub media: Arc<dyn MediaStore>,
    pub registry: ProviderRegistry,
    pub tokens: Arc<TokenManager>,
    pub gate: AccessGate,
    pub orchestrator: BulkOrchestrator,
    pub activity: Arc<dyn ActivityLogger>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        folders: Arc<dyn FolderStore>,
        grants: Arc<dyn GrantStore>,
        media: Arc<dyn MediaStore>,
        registry: ProviderRegistry,
        tokens: Arc<TokenManager>,
        activity: Arc<dyn ActivityLogger>,
    ) -> Self {
        let gate = AccessGate::new(folders.clone(), grants);
        let orchestrator = BulkOrchestrator::new(
            registry.clone(),
            media.clone(),
            folders.clone(),
            gate.clone(),
            activity.clone(),
        );

        Self {
            config,
            folders,
            media,
            registry,
            tokens,
            gate,
            orchestrator,
            activity,
        }
    }
}
