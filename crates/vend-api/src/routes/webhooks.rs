//! # Source-Host Webhook Intake
//!
//! `POST /v1/webhooks/source` — push-event variant of the sync pipeline.
//! The event payload identifies the repository; the entry linked to it is
//! looked up and its per-entry webhook secret is verified in constant time
//! against the `x-webhook-token` header before any sync work starts.
//!
//! Mounted outside the bearer-auth middleware: the per-entry secret is the
//! credential here.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::SecretToken;
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::routes::entries::OutcomeResponse;
use crate::state::AppState;

/// Header carrying the per-entry webhook secret.
const WEBHOOK_TOKEN_HEADER: &str = "x-webhook-token";

/// Push event payload (the subset this endpoint needs).
#[derive(Debug, Deserialize, ToSchema)]
pub struct PushEvent {
    pub repository: PushRepository,
}

/// Repository identification inside a push event.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PushRepository {
    pub name: String,
    pub owner: PushOwner,
}

/// Repository owner; hosts populate `login` for users and `name` for
/// organizations, so both are accepted.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PushOwner {
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl PushOwner {
    fn id(&self) -> Option<&str> {
        self.login.as_deref().or(self.name.as_deref())
    }
}

/// Build the webhooks router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/webhooks/source", post(receive_push))
}

/// POST /v1/webhooks/source — handle a repository push event.
#[utoipa::path(
    post,
    path = "/v1/webhooks/source",
    request_body = PushEvent,
    responses(
        (status = 202, description = "Sync performed", body = OutcomeResponse),
        (status = 401, description = "Webhook secret missing or wrong", body = crate::error::ErrorBody),
        (status = 404, description = "No entry linked to this repository", body = crate::error::ErrorBody),
    ),
    tag = "webhooks"
)]
pub(crate) async fn receive_push(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<PushEvent>, JsonRejection>,
) -> Result<(StatusCode, Json<OutcomeResponse>), AppError> {
    let event = extract_json(body)?;
    let owner = event
        .repository
        .owner
        .id()
        .ok_or_else(|| AppError::BadRequest("push event has no repository owner".to_string()))?;
    let repo = event.repository.name.as_str();

    let entry = state
        .catalog
        .find_by_repo(owner, repo)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("no entry linked to repository {owner}/{repo}"))
        })?;

    let expected = entry.webhook_secret.as_deref().ok_or_else(|| {
        AppError::Unauthorized("entry has no webhook secret configured".to_string())
    })?;
    let provided = headers
        .get(WEBHOOK_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing webhook token".to_string()))?;
    if !SecretToken::new(expected.to_string()).matches(provided) {
        return Err(AppError::Unauthorized("invalid webhook token".to_string()));
    }

    tracing::info!(
        entry_id = %entry.id,
        repo = %format!("{owner}/{repo}"),
        "webhook push received, syncing"
    );
    let outcome = state.pipeline.sync_from_source(entry.id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(OutcomeResponse {
            success: true,
            updated: outcome.updated,
            message: outcome.message,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_owner_prefers_login() {
        let owner = PushOwner {
            login: Some("acme".to_string()),
            name: Some("Acme Inc".to_string()),
        };
        assert_eq!(owner.id(), Some("acme"));
    }

    #[test]
    fn push_owner_falls_back_to_name() {
        let owner = PushOwner {
            login: None,
            name: Some("acme-org".to_string()),
        };
        assert_eq!(owner.id(), Some("acme-org"));
    }

    #[test]
    fn push_event_parses_host_payload() {
        let json = r#"{
            "ref": "refs/heads/main",
            "repository": {
                "name": "starter",
                "owner": {"login": "acme"}
            }
        }"#;
        let event: PushEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.repository.name, "starter");
        assert_eq!(event.repository.owner.id(), Some("acme"));
    }
}
