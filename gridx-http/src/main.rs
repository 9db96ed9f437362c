use clap::Parser;
use gridx_core::Vault;
use gridx_http::{AppState, config::ServerConfig, router, spawn_sweeper};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gridx_http=info,gridx_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = ServerConfig::parse();
    let backend = cfg.backend();
    tracing::info!(?backend, chunk_size = cfg.chunk_size, naming = %cfg.naming, "opening store");
    let vault = Vault::open(backend, cfg.store_options())?;

    if let Some(interval) = cfg.sweep_interval() {
        spawn_sweeper(vault.clone(), interval, cfg.pending_grace());
    }

    let state = AppState {
        vault,
        max_upload_bytes: cfg.max_upload_bytes,
        cors: cfg.cors,
    };
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(cfg.listen).await?;
    tracing::info!("gridx-http listening on http://{}", cfg.listen);
    axum::serve(listener, app).await?;
    Ok(())
}
