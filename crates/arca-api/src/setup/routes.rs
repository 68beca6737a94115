//! Route configuration and setup.

use crate::handlers;
use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use arca_core::Config;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

// Multipart bodies carry whole media files.
const MAX_BODY_BYTES: usize = 512 * 1024 * 1024;

pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(config)?;

    let api = Router::new()
        .route("/api/v0/media/bulk/upload", post(handlers::bulk_media::bulk_upload))
        .route("/api/v0/media/bulk/delete", post(handlers::bulk_media::bulk_delete))
        .route("/api/v0/media/bulk/rename", post(handlers::bulk_media::bulk_rename))
        .route("/api/v0/media/{id}/proxy", get(handlers::proxy::proxy_media))
        .route(
            "/api/v0/gdrive/connect",
            post(handlers::gdrive_auth::connect).delete(handlers::gdrive_auth::disconnect),
        )
        .route("/api/v0/gdrive/status", get(handlers::gdrive_auth::status))
        .with_state(state.clone());

    let router = Router::new()
        .route("/health", get(health))
        .route("/api/v0/openapi.json", get(openapi_spec))
        .merge(api)
        // Local-backend files are served straight off disk.
        .nest_service("/media", ServeDir::new(&state.config.local_storage_path))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers(Any)
    } else {
        let origins: Result<Vec<HeaderValue>, _> = config
            .cors_origins
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect();
        CorsLayer::new()
            .allow_origin(origins?)
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers(Any)
    };

    Ok(cors)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn openapi_spec() -> impl IntoResponse {
    Json(crate::api_doc::openapi_spec())
}
