//! # vend-api — Axum API Service for the Vend Pipeline
//!
//! The HTTP surface over the ingestion & publication pipeline.
//!
//! ## API Surface
//!
//! | Prefix                     | Module                 | Domain                |
//! |----------------------------|------------------------|-----------------------|
//! | `/v1/entries/*`            | [`routes::entries`]    | Entry lifecycle       |
//! | `/v1/webhooks/source`      | [`routes::webhooks`]   | Push-event sync       |
//! | `/health/*`                | `lib.rs`               | Probes (no auth)      |
//! | `/metrics`                 | `lib.rs`               | Prometheus (no auth)  |
//! | `/openapi.json`            | [`openapi`]            | API document          |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```
//!
//! Health probes, `/metrics`, and the webhook route are mounted outside
//! the auth middleware — the webhook authenticates with its per-entry
//! secret instead.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

pub use error::AppError;

/// Multipart body ceiling: the 100 MiB archive limit plus form overhead.
const MAX_BODY_BYTES: usize = 110 * 1024 * 1024;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = ApiMetrics::new();

    // Authenticated API routes.
    //
    // Auth runs inside the metrics layer so rejected requests still count.
    let api = Router::new()
        .merge(routes::entries::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(Extension(metrics.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(auth_config))
        .with_state(state.clone());

    // Unauthenticated surface: health probes, the metrics scrape, and the
    // webhook intake (authenticated by per-entry secret).
    let unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .route("/metrics", axum::routing::get(prometheus_metrics))
        .merge(routes::webhooks::router())
        .layer(Extension(metrics))
        .with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — verifies the catalog store answers.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match state.catalog.list().await {
        Ok(_) => (StatusCode::OK, "ready").into_response(),
        Err(e) => {
            tracing::warn!("catalog health check failed: {e}");
            (StatusCode::SERVICE_UNAVAILABLE, "catalog unreachable").into_response()
        }
    }
}

/// GET /metrics — Prometheus metrics scrape endpoint.
///
/// Updates the entries-by-status gauge from the catalog on each scrape
/// (pull model), then encodes the registry in text exposition format.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    if let Ok(entries) = state.catalog.list().await {
        let mut by_status: std::collections::HashMap<&'static str, usize> =
            std::collections::HashMap::new();
        for entry in &entries {
            *by_status.entry(entry.status.as_str()).or_default() += 1;
        }
        metrics.entries_total().reset();
        for (status, count) in by_status {
            metrics
                .entries_total()
                .with_label_values(&[status])
                .set(count as f64);
        }
    }

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}
