#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod routes;
mod transfer;

use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};
use gridx_core::Vault;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub vault: Vault,
    /// Request body cap for uploads; `None` lifts axum's default limit.
    pub max_upload_bytes: Option<usize>,
    pub cors: bool,
}

impl AppState {
    pub fn new(vault: Vault) -> Self {
        Self {
            vault,
            max_upload_bytes: None,
            cors: false,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = match state.max_upload_bytes {
        Some(n) => DefaultBodyLimit::max(n),
        None => DefaultBodyLimit::disable(),
    };
    let cors = state.cors;

    let app = Router::new()
        .route("/", get(routes::list_files).post(routes::upload_file))
        .route("/getfile/{name}", get(routes::get_file))
        .route("/deleteFile/{id}", post(routes::delete_file))
        .route("/files/{id}", delete(routes::delete_file))
        .route("/stats", get(routes::stats))
        .route("/health", get(routes::health))
        .fallback(routes::not_found)
        .with_state(state)
        .layer(body_limit)
        .layer(TraceLayer::new_for_http());

    if cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Run `Catalog::sweep` every `interval` until the runtime shuts down.
pub fn spawn_sweeper(vault: Vault, interval: Duration, grace: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let catalog = vault.catalog();
            match tokio::task::spawn_blocking(move || catalog.sweep(grace)).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "sweep failed"),
                Err(e) => tracing::error!(error = %e, "sweep task panicked"),
            }
        }
    })
}
