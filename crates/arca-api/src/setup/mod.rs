//! Application setup and initialization.

pub mod database;
pub mod routes;
pub mod server;

use crate::services::activity::TracingActivityLogger;
use crate::state::AppState;
use anyhow::Result;
use arca_core::stores::{CredentialStore, FolderStore, GrantStore, MediaStore};
use arca_core::Config;
use arca_db::{CredentialRepository, FolderRepository, GrantRepository, MediaRepository};
use arca_storage::{build_registry, GoogleRefreshEndpoint, TokenManager};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

/// Wire up the database, storage backends, and routes.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    let pool = database::setup_database(&config).await?;

    let folders: Arc<dyn FolderStore> = Arc::new(FolderRepository::new(pool.clone()));
    let grants: Arc<dyn GrantStore> = Arc::new(GrantRepository::new(pool.clone()));
    let media: Arc<dyn MediaStore> = Arc::new(MediaRepository::new(pool.clone()));
    let credentials: Arc<dyn CredentialStore> = Arc::new(CredentialRepository::new(pool));

    let refresher = Arc::new(GoogleRefreshEndpoint::new(
        config.google_client_id.clone(),
        config.google_client_secret.clone(),
        config.google_token_endpoint.clone(),
    ));
    let tokens = Arc::new(TokenManager::new(credentials, refresher));

    let registry = build_registry(&config, folders.clone(), tokens.clone()).await?;

    let state = Arc::new(AppState::new(
        config.clone(),
        folders,
        grants,
        media,
        registry,
        tokens,
        Arc::new(TracingActivityLogger),
    ));

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
