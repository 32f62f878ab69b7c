//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! AppState holds the catalog store (Postgres-backed when `DATABASE_URL`
//! is configured, in-memory otherwise), the publication pipeline over the
//! remote collaborators, and the service configuration.

use std::sync::Arc;

use vend_catalog::CatalogStore;
use vend_ingest::PublishPipeline;

use crate::auth::SecretToken;

/// Service configuration assembled in `main`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Listen port.
    pub port: u16,
    /// Bearer token for the API routes; `None` runs open (dev mode).
    pub auth_token: Option<SecretToken>,
    /// Signed download URL lifetime in seconds.
    pub download_ttl_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            download_ttl_secs: 300,
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The catalog store, shared with the pipeline.
    pub catalog: Arc<dyn CatalogStore>,
    /// The publication pipeline.
    pub pipeline: Arc<PublishPipeline>,
    /// Service configuration.
    pub config: AppConfig,
}

impl AppState {
    /// Assemble state from its parts.
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        pipeline: Arc<PublishPipeline>,
        config: AppConfig,
    ) -> Self {
        Self {
            catalog,
            pipeline,
            config,
        }
    }
}
