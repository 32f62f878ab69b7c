//! # OpenAPI Document
//!
//! OpenAPI 3.1 spec auto-generated from the handler annotations via
//! utoipa, served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// The API documentation root.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vend Marketplace Pipeline API",
        description = "Ingestion and publication pipeline for the Vend template marketplace: \
                       upload, versioned republish, correction, retry, source-host sync, \
                       webhook intake, review, and downloads.",
        license(name = "BUSL-1.1")
    ),
    paths(
        crate::routes::entries::create_entry,
        crate::routes::entries::list_entries,
        crate::routes::entries::get_entry,
        crate::routes::entries::publish_version,
        crate::routes::entries::update_entry,
        crate::routes::entries::retry_processing,
        crate::routes::entries::sync_entry,
        crate::routes::entries::review_entry,
        crate::routes::entries::archive_entry,
        crate::routes::entries::download_entry,
        crate::routes::webhooks::receive_push,
    ),
    components(schemas(
        crate::routes::entries::EntryResponse,
        crate::routes::entries::HistoryItem,
        crate::routes::entries::OutcomeResponse,
        crate::routes::entries::DownloadResponse,
        crate::routes::entries::ReviewRequest,
        crate::routes::webhooks::PushEvent,
        crate::routes::webhooks::PushRepository,
        crate::routes::webhooks::PushOwner,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "entries", description = "Catalog entry lifecycle"),
        (name = "webhooks", description = "Source-host webhook intake"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(serve_openapi))
}

async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_builds() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("/v1/entries"));
        assert!(json.contains("/v1/webhooks/source"));
    }
}
