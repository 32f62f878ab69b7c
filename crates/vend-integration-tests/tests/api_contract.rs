//! HTTP contract tests: the full router driven in-process with the
//! in-memory catalog and stubbed collaborators — auth, multipart intake,
//! status codes, and the webhook secret check.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

use common::Harness;
use vend_api::auth::SecretToken;
use vend_api::state::{AppConfig, AppState};
use vend_catalog::CatalogStore;

const SERVICE_SECRET: &str = "it-test-secret";

struct TestApp {
    harness: Harness,
    router: axum::Router,
    seller_id: Uuid,
}

impl TestApp {
    fn new() -> Self {
        let harness = Harness::new();
        let config = AppConfig {
            port: 0,
            auth_token: Some(SecretToken::new(SERVICE_SECRET.to_string())),
            download_ttl_secs: 300,
        };
        let state = AppState::new(
            harness.catalog.clone() as Arc<dyn CatalogStore>,
            Arc::new(vend_ingest::PublishPipeline::new(
                harness.catalog.clone() as Arc<dyn CatalogStore>,
                harness.objects.clone(),
                harness.scanner.clone(),
                harness.pinner.clone(),
                harness.source.clone(),
            )),
            config,
        );
        Self {
            router: vend_api::app(state),
            harness,
            seller_id: Uuid::new_v4(),
        }
    }

    fn seller_token(&self) -> String {
        format!("Bearer seller:{}:{SERVICE_SECRET}", self.seller_id)
    }

    fn admin_token(&self) -> String {
        format!("Bearer admin:{SERVICE_SECRET}")
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }
}

const BOUNDARY: &str = "vend-test-boundary";

/// Hand-rolled multipart body: a metadata JSON part plus an archive part.
fn upload_body(metadata: &str, archive_name: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"metadata\"\r\n\r\n{metadata}\r\n"
        )
        .as_bytes(),
    );
    if let Some(name) = archive_name {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"archive\"; \
                 filename=\"{name}\"\r\nContent-Type: application/zip\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(&vec![7u8; 4096]);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn draft_json() -> &'static str {
    r#"{"title": "HTTP Kit", "licensing": "single_use", "access_tier": "paid", "price_usd": 49}"#
}

// ── Health & auth ────────────────────────────────────────────────────

#[tokio::test]
async fn liveness_needs_no_auth() {
    let app = TestApp::new();
    let (status, _) = app
        .send(
            Request::builder()
                .uri("/health/liveness")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn api_routes_require_a_bearer_token() {
    let app = TestApp::new();
    let (status, body) = app
        .send(
            Request::builder()
                .uri("/v1/entries")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn wrong_secret_is_rejected() {
    let app = TestApp::new();
    let (status, _) = app
        .send(
            Request::builder()
                .uri("/v1/entries")
                .header(header::AUTHORIZATION, "Bearer admin:wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ── Upload flow ──────────────────────────────────────────────────────

#[tokio::test]
async fn multipart_upload_creates_an_entry() {
    let app = TestApp::new();
    let (status, body) = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/v1/entries")
                .header(header::AUTHORIZATION, app.seller_token())
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(upload_body(draft_json(), Some("kit.zip"))))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["title"], "HTTP Kit");
    assert_eq!(body["version_number"], "1.0.0");
    // Stubs pass scan and pin, so the entry comes back approved.
    assert_eq!(body["status"], "approved");
    assert_eq!(body["seller_id"], app.seller_id.to_string());
    assert!(body.get("webhook_secret").is_none(), "secret must not leak");

    // The entry is readable afterwards.
    let id = body["id"].as_str().unwrap();
    let (status, fetched) = app
        .send(
            Request::builder()
                .uri(format!("/v1/entries/{id}"))
                .header(header::AUTHORIZATION, app.seller_token())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"].as_str().unwrap(), id);
}

#[tokio::test]
async fn upload_without_archive_part_is_rejected() {
    let app = TestApp::new();
    let (status, body) = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/v1/entries")
                .header(header::AUTHORIZATION, app.seller_token())
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(upload_body(draft_json(), None)))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("archive"));
}

#[tokio::test]
async fn admin_without_seller_identity_cannot_create() {
    let app = TestApp::new();
    let (status, _) = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/v1/entries")
                .header(header::AUTHORIZATION, app.admin_token())
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(upload_body(draft_json(), Some("kit.zip"))))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ── Retry, review, ownership ─────────────────────────────────────────

#[tokio::test]
async fn retry_on_an_approved_entry_is_a_conflict() {
    let app = TestApp::new();
    let entry = app
        .harness
        .pipeline
        .create_entry(
            app.seller_id,
            common::draft("Kit"),
            common::archive_file("kit.zip", 4096),
            vec![],
        )
        .await
        .unwrap();

    let (status, body) = app
        .send(
            Request::builder()
                .method("POST")
                .uri(format!("/v1/entries/{}/retry", entry.id))
                .header(header::AUTHORIZATION, app.seller_token())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
}

#[tokio::test]
async fn review_requires_the_admin_role() {
    let app = TestApp::new();
    let entry = app
        .harness
        .pipeline
        .create_entry(
            app.seller_id,
            common::draft("Kit"),
            common::archive_file("kit.zip", 4096),
            vec![],
        )
        .await
        .unwrap();

    let review = serde_json::json!({"approve": false}).to_string();
    let (status, _) = app
        .send(
            Request::builder()
                .method("POST")
                .uri(format!("/v1/entries/{}/review", entry.id))
                .header(header::AUTHORIZATION, app.seller_token())
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(review.clone()))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(
            Request::builder()
                .method("POST")
                .uri(format!("/v1/entries/{}/review", entry.id))
                .header(header::AUTHORIZATION, app.admin_token())
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(review))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "rejected");
}

#[tokio::test]
async fn foreign_sellers_see_404_for_unapproved_entries() {
    let app = TestApp::new();
    // An entry owned by someone else that failed its scan (not public).
    app.harness
        .scanner
        .set_behavior(vend_ingest::testing::ScanBehavior::Reject("bad".to_string()));
    let entry = app
        .harness
        .pipeline
        .create_entry(
            Uuid::new_v4(),
            common::draft("Foreign"),
            common::archive_file("kit.zip", 4096),
            vec![],
        )
        .await
        .unwrap();

    let (status, _) = app
        .send(
            Request::builder()
                .uri(format!("/v1/entries/{}", entry.id))
                .header(header::AUTHORIZATION, app.seller_token())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Download ─────────────────────────────────────────────────────────

#[tokio::test]
async fn download_returns_a_signed_url() {
    let app = TestApp::new();
    let entry = app
        .harness
        .pipeline
        .create_entry(
            app.seller_id,
            common::draft("Kit"),
            common::archive_file("kit.zip", 4096),
            vec![],
        )
        .await
        .unwrap();

    let (status, body) = app
        .send(
            Request::builder()
                .uri(format!("/v1/entries/{}/download", entry.id))
                .header(header::AUTHORIZATION, app.seller_token())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["url"].as_str().unwrap().contains("kit.zip"));
    assert_eq!(body["expires_in_secs"], 300);
}

// ── Webhook ──────────────────────────────────────────────────────────

#[tokio::test]
async fn webhook_syncs_the_linked_entry_with_the_right_secret() {
    let app = TestApp::new();
    app.harness
        .pipeline
        .create_entry(
            app.seller_id,
            common::linked_draft("Linked", "acme", "starter"),
            common::archive_file("kit.zip", 4096),
            vec![],
        )
        .await
        .unwrap();

    let payload = serde_json::json!({
        "repository": {"name": "starter", "owner": {"login": "acme"}}
    })
    .to_string();

    // Wrong secret → 401.
    let (status, _) = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/v1/webhooks/source")
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-webhook-token", "wrong")
                .body(Body::from(payload.clone()))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Correct per-entry secret → sync runs.
    let (status, body) = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/v1/webhooks/source")
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-webhook-token", "hook-secret")
                .body(Body::from(payload))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED, "{body}");
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn webhook_for_an_unlinked_repository_is_404() {
    let app = TestApp::new();
    let payload = serde_json::json!({
        "repository": {"name": "ghost", "owner": {"login": "nobody"}}
    })
    .to_string();

    let (status, _) = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/v1/webhooks/source")
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-webhook-token", "anything")
                .body(Body::from(payload))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
