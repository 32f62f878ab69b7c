//! # vend-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the Vend marketplace pipeline.
//! Binds to a configurable port (default 8080).

use std::sync::Arc;

use vend_api::state::{AppConfig, AppState};
use vend_catalog::{CatalogStore, MemoryCatalogStore};
use vend_ingest::PublishPipeline;
use vend_remote::{
    HttpContentPinner, HttpObjectStore, HttpSecurityScanner, HttpSourceHost, RemoteConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Build configuration from environment.
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let auth_token = std::env::var("AUTH_TOKEN")
        .ok()
        .map(vend_api::auth::SecretToken::new);
    if auth_token.is_none() {
        tracing::warn!("AUTH_TOKEN not set — the API is running open (dev mode)");
    }
    let download_ttl_secs = std::env::var("DOWNLOAD_TTL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(300);
    let config = AppConfig {
        port,
        auth_token,
        download_ttl_secs,
    };

    // Remote collaborator clients.
    let remote_config = RemoteConfig::from_env().map_err(|e| {
        tracing::error!("Remote service configuration failed: {e}");
        e
    })?;
    let objects = Arc::new(HttpObjectStore::new(&remote_config)?);
    let scanner = Arc::new(HttpSecurityScanner::new(&remote_config)?);
    let pinner = Arc::new(HttpContentPinner::new(&remote_config)?);
    let source = Arc::new(HttpSourceHost::new(&remote_config)?);

    // Catalog store: Postgres-backed when DATABASE_URL is set, in-memory
    // otherwise.
    let pool = vend_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;
    let catalog: Arc<dyn CatalogStore> = match pool {
        Some(pool) => Arc::new(vend_api::db::PgCatalogStore::new(pool)),
        None => Arc::new(MemoryCatalogStore::new()),
    };

    let pipeline = Arc::new(PublishPipeline::new(
        catalog.clone(),
        objects,
        scanner,
        pinner,
        source,
    ));

    let state = AppState::new(catalog, pipeline, config);
    let app = vend_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Vend API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
