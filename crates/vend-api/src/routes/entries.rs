//! # Catalog Entry API
//!
//! Routes:
//! - `POST   /v1/entries` — upload a new template (multipart)
//! - `GET    /v1/entries` — list entries
//! - `GET    /v1/entries/{id}` — entry details
//! - `POST   /v1/entries/{id}/versions` — publish a new version (multipart)
//! - `PATCH  /v1/entries/{id}` — correction path: metadata patch and/or
//!   in-place archive replacement (multipart)
//! - `POST   /v1/entries/{id}/retry` — retry processing from a failure state
//! - `POST   /v1/entries/{id}/sync` — republish from the linked repository
//! - `POST   /v1/entries/{id}/review` — admin approve/reject
//! - `DELETE /v1/entries/{id}` — owner delete (archive)
//! - `GET    /v1/entries/{id}/download` — signed URL for the active archive
//!
//! Access: sellers operate on their own entries; admins on any. Lookups on
//! entries the caller may not touch answer 404 rather than 403 to prevent
//! id enumeration.

use axum::extract::multipart::Multipart;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use vend_catalog::{CatalogEntry, EntryStatus, NewEntry, VersionHistoryEntry, VersionSubmission};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, read_upload_form, Validate};
use crate::state::AppState;

// ─── Response DTOs ──────────────────────────────────────────────────────────

/// A superseded version in the entry's history.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryItem {
    pub version_number: String,
    pub content_hash: Option<String>,
    pub changelog: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub file_size: Option<u64>,
}

impl From<&VersionHistoryEntry> for HistoryItem {
    fn from(entry: &VersionHistoryEntry) -> Self {
        Self {
            version_number: entry.version_number.to_string(),
            content_hash: entry.content_hash.clone(),
            changelog: entry.changelog.clone(),
            uploaded_at: entry.uploaded_at,
            file_size: entry.file_size,
        }
    }
}

/// Catalog entry as rendered to API clients.
///
/// The per-entry webhook secret never leaves the server.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EntryResponse {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub slug: String,
    pub title: String,
    pub tagline: Option<String>,
    pub description: Option<String>,
    pub features: Vec<String>,
    pub tech_stack: Vec<String>,
    pub category: Option<String>,
    pub preview_image_urls: Vec<String>,
    pub licensing: String,
    pub access_tier: String,
    pub price_usd: Option<u32>,
    pub version_number: String,
    pub version_history: Vec<HistoryItem>,
    pub content_hash: Option<String>,
    pub previous_content_hash: Option<String>,
    pub original_file_name: Option<String>,
    pub file_size: Option<u64>,
    pub status: String,
    pub last_processing_error: Option<String>,
    pub repo_owner: Option<String>,
    pub repo_name: Option<String>,
    pub last_synced_commit_sha: Option<String>,
    pub download_count: u64,
    pub average_rating: Option<f32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub revision: i64,
}

impl From<CatalogEntry> for EntryResponse {
    fn from(entry: CatalogEntry) -> Self {
        Self {
            id: entry.id,
            seller_id: entry.seller_id,
            slug: entry.slug.to_string(),
            title: entry.title,
            tagline: entry.tagline,
            description: entry.description,
            features: entry.features,
            tech_stack: entry.tech_stack.into_iter().collect(),
            category: entry.category,
            preview_image_urls: entry.preview_image_urls,
            licensing: entry.licensing.as_str().to_string(),
            access_tier: entry.access_tier.as_str().to_string(),
            price_usd: entry.price_usd,
            version_number: entry.version_number.to_string(),
            version_history: entry.version_history.iter().map(HistoryItem::from).collect(),
            content_hash: entry.content_hash,
            previous_content_hash: entry.previous_content_hash,
            original_file_name: entry.original_file_name,
            file_size: entry.file_size,
            status: entry.status.as_str().to_string(),
            last_processing_error: entry.last_processing_error,
            repo_owner: entry.repo_owner,
            repo_name: entry.repo_name,
            last_synced_commit_sha: entry.last_synced_commit_sha,
            download_count: entry.download_count,
            average_rating: entry.average_rating,
            created_at: entry.created_at,
            updated_at: entry.updated_at,
            published_at: entry.published_at,
            revision: entry.revision,
        }
    }
}

/// Outcome of a retry or sync request.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OutcomeResponse {
    pub success: bool,
    pub updated: bool,
    pub message: String,
}

/// Signed download URL for the active archive.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadResponse {
    pub url: String,
    pub expires_in_secs: u64,
}

/// Admin review decision.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewRequest {
    pub approve: bool,
}

impl Validate for ReviewRequest {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

// ─── Router ─────────────────────────────────────────────────────────────────

/// Build the entries router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/entries", post(create_entry).get(list_entries))
        .route(
            "/v1/entries/:id",
            get(get_entry).patch(update_entry).delete(archive_entry),
        )
        .route("/v1/entries/:id/versions", post(publish_version))
        .route("/v1/entries/:id/retry", post(retry_processing))
        .route("/v1/entries/:id/sync", post(sync_entry))
        .route("/v1/entries/:id/review", post(review_entry))
        .route("/v1/entries/:id/download", get(download_entry))
}

/// Fetch an entry the caller may mutate, answering 404 on foreign entries.
async fn fetch_owned(
    state: &AppState,
    caller: &CallerIdentity,
    id: Uuid,
) -> Result<CatalogEntry, AppError> {
    let entry = state.catalog.get(id).await?;
    if !caller.can_mutate(&entry) {
        return Err(AppError::NotFound(format!("entry {id} not found")));
    }
    Ok(entry)
}

// ─── Handlers ───────────────────────────────────────────────────────────────

/// POST /v1/entries — upload a new template.
#[utoipa::path(
    post,
    path = "/v1/entries",
    responses(
        (status = 201, description = "Entry created and queued for review", body = EntryResponse),
        (status = 422, description = "Upload rejected", body = crate::error::ErrorBody),
    ),
    tag = "entries"
)]
pub(crate) async fn create_entry(
    State(state): State<AppState>,
    caller: CallerIdentity,
    multipart: Multipart,
) -> Result<(StatusCode, Json<EntryResponse>), AppError> {
    let seller_id = caller.require_seller_id()?;
    let form = read_upload_form(multipart).await?;
    let draft: NewEntry = form.required_metadata()?;
    let (archive, images) = form.required_archive()?;

    let entry = state
        .pipeline
        .create_entry(seller_id, draft, archive, images.unwrap_or_default())
        .await?;
    Ok((StatusCode::CREATED, Json(entry.into())))
}

/// GET /v1/entries — list entries.
///
/// Admins see everything; sellers see their own entries plus the public
/// (approved) catalog.
#[utoipa::path(
    get,
    path = "/v1/entries",
    responses(
        (status = 200, description = "Entries", body = [EntryResponse]),
    ),
    tag = "entries"
)]
pub(crate) async fn list_entries(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<EntryResponse>>, AppError> {
    let entries = state.catalog.list().await?;
    let visible = entries
        .into_iter()
        .filter(|entry| {
            caller.can_mutate(entry) || entry.status == EntryStatus::Approved
        })
        .map(EntryResponse::from)
        .collect();
    Ok(Json(visible))
}

/// GET /v1/entries/{id} — entry details.
#[utoipa::path(
    get,
    path = "/v1/entries/{id}",
    params(("id" = Uuid, Path, description = "Entry id")),
    responses(
        (status = 200, description = "Entry found", body = EntryResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "entries"
)]
pub(crate) async fn get_entry(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<EntryResponse>, AppError> {
    let entry = state.catalog.get(id).await?;
    if !caller.can_mutate(&entry) && entry.status != EntryStatus::Approved {
        // 404 instead of 403 to prevent id enumeration.
        return Err(AppError::NotFound(format!("entry {id} not found")));
    }
    Ok(Json(entry.into()))
}

/// POST /v1/entries/{id}/versions — publish a new version.
#[utoipa::path(
    post,
    path = "/v1/entries/{id}/versions",
    params(("id" = Uuid, Path, description = "Entry id")),
    responses(
        (status = 200, description = "Version published and queued for review", body = EntryResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Version not increasing or entry archived", body = crate::error::ErrorBody),
    ),
    tag = "entries"
)]
pub(crate) async fn publish_version(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<EntryResponse>, AppError> {
    fetch_owned(&state, &caller, id).await?;
    let form = read_upload_form(multipart).await?;
    let submission: VersionSubmission = form.metadata_or_default()?;
    let (archive, images) = form.required_archive()?;

    let entry = state
        .pipeline
        .publish_version(id, submission, archive, images)
        .await?;
    Ok(Json(entry.into()))
}

/// PATCH /v1/entries/{id} — correction path.
#[utoipa::path(
    patch,
    path = "/v1/entries/{id}",
    params(("id" = Uuid, Path, description = "Entry id")),
    responses(
        (status = 200, description = "Entry updated", body = EntryResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "entries"
)]
pub(crate) async fn update_entry(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<EntryResponse>, AppError> {
    fetch_owned(&state, &caller, id).await?;
    let form = read_upload_form(multipart).await?;
    let patch = form.metadata_or_default()?;
    let images = form.images;
    let archive = form.archive;

    let entry = state
        .pipeline
        .update_entry(id, patch, archive, images)
        .await?;
    Ok(Json(entry.into()))
}

/// POST /v1/entries/{id}/retry — retry processing.
#[utoipa::path(
    post,
    path = "/v1/entries/{id}/retry",
    params(("id" = Uuid, Path, description = "Entry id")),
    responses(
        (status = 200, description = "Processing restarted", body = OutcomeResponse),
        (status = 409, description = "Entry is not in a retryable state", body = crate::error::ErrorBody),
    ),
    tag = "entries"
)]
pub(crate) async fn retry_processing(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<OutcomeResponse>, AppError> {
    fetch_owned(&state, &caller, id).await?;
    let outcome = state.pipeline.retry_processing(id).await?;
    Ok(Json(OutcomeResponse {
        success: true,
        updated: outcome.updated,
        message: outcome.message,
    }))
}

/// POST /v1/entries/{id}/sync — republish from the linked repository.
#[utoipa::path(
    post,
    path = "/v1/entries/{id}/sync",
    params(("id" = Uuid, Path, description = "Entry id")),
    responses(
        (status = 200, description = "Sync outcome", body = OutcomeResponse),
        (status = 409, description = "Entry is not linked to a repository", body = crate::error::ErrorBody),
    ),
    tag = "entries"
)]
pub(crate) async fn sync_entry(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<OutcomeResponse>, AppError> {
    fetch_owned(&state, &caller, id).await?;
    let outcome = state.pipeline.sync_from_source(id).await?;
    Ok(Json(OutcomeResponse {
        success: true,
        updated: outcome.updated,
        message: outcome.message,
    }))
}

/// POST /v1/entries/{id}/review — manual review decision (admin).
#[utoipa::path(
    post,
    path = "/v1/entries/{id}/review",
    params(("id" = Uuid, Path, description = "Entry id")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Review applied", body = EntryResponse),
        (status = 403, description = "Admin role required", body = crate::error::ErrorBody),
    ),
    tag = "entries"
)]
pub(crate) async fn review_entry(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<ReviewRequest>, JsonRejection>,
) -> Result<Json<EntryResponse>, AppError> {
    caller.require_admin()?;
    let req = extract_validated_json(body)?;
    let entry = state.pipeline.admin_review(id, req.approve).await?;
    Ok(Json(entry.into()))
}

/// DELETE /v1/entries/{id} — owner delete (archive).
#[utoipa::path(
    delete,
    path = "/v1/entries/{id}",
    params(("id" = Uuid, Path, description = "Entry id")),
    responses(
        (status = 200, description = "Entry archived", body = EntryResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "entries"
)]
pub(crate) async fn archive_entry(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<EntryResponse>, AppError> {
    fetch_owned(&state, &caller, id).await?;
    let entry = state.pipeline.archive_entry(id).await?;
    Ok(Json(entry.into()))
}

/// GET /v1/entries/{id}/download — signed URL for the active archive.
#[utoipa::path(
    get,
    path = "/v1/entries/{id}/download",
    params(("id" = Uuid, Path, description = "Entry id")),
    responses(
        (status = 200, description = "Signed URL", body = DownloadResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "entries"
)]
pub(crate) async fn download_entry(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<DownloadResponse>, AppError> {
    let entry = state.catalog.get(id).await?;
    // Unpublished archives are only downloadable by the owner or an admin.
    if entry.status != EntryStatus::Approved && !caller.can_mutate(&entry) {
        return Err(AppError::NotFound(format!("entry {id} not found")));
    }
    let ttl = state.config.download_ttl_secs;
    let url = state.pipeline.signed_download_url(id, ttl).await?;
    Ok(Json(DownloadResponse {
        url,
        expires_in_secs: ttl,
    }))
}
