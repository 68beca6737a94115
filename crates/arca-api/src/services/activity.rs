//! Activity logging.
//!
//! Invoked fire-and-forget after successful operations; a logging failure
//! must never fail the operation that triggered it.

use arca_core::models::MediaKind;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub enum ActionKind {
    Upload,
    Download,
    Delete,
    Rename,
}

impl ActionKind {
    fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Upload => "upload",
            ActionKind::Download => "download",
            ActionKind::Delete => "delete",
            ActionKind::Rename => "rename",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActivityEntry {
    pub actor_id: Uuid,
    pub action: ActionKind,
    pub asset_id: Uuid,
    pub file_name: String,
    pub media_kind: MediaKind,
    pub folder_id: Uuid,
    pub folder_name: String,
}

#[async_trait]
pub trait ActivityLogger: Send + Sync {
    async fn log(&self, entry: ActivityEntry);
}

/// Emits activity as structured tracing events.
pub struct TracingActivityLogger;

#[async_trait]
impl ActivityLogger for TracingActivityLogger {
    async fn log(&self, entry: ActivityEntry) {
        tracing::info!(
            actor_id = %entry.actor_id,
            action = entry.action.as_str(),
            asset_id = %entry.asset_id,
            file_name = %entry.file_name,
            media_kind = %entry.media_kind,
            folder_id = %entry.folder_id,
            folder_name = %entry.folder_name,
            "activity"
        );
    }
}

/// Detached dispatch; the caller never waits on or observes the logger.
pub fn record(logger: Arc<dyn ActivityLogger>, entry: ActivityEntry) {
    tokio::spawn(async move {
        logger.log(entry).await;
    });
}
