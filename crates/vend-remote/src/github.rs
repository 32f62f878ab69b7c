//! # GitHub Source-Host Client
//!
//! HTTP implementation of [`SourceHost`] against the GitHub REST API.
//!
//! ## Endpoints
//!
//! | Method | Path                                   | Operation          |
//! |--------|----------------------------------------|--------------------|
//! | GET    | `/repos/{owner}/{repo}/releases/latest`| Latest release     |
//! | GET    | `/repos/{owner}/{repo}/commits`        | Latest commit      |
//! | GET    | `/repos/{owner}/{repo}/zipball/{ref}`  | Archive download   |
//!
//! A 404 from `releases/latest` means the repository has no releases —
//! that is a normal answer (`Ok(None)`), not an error. The API requires a
//! `User-Agent` header on every request; the bearer token is optional and
//! only needed for private repositories.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use vend_ingest::{RemoteError, SourceCommit, SourceHost, SourceRelease};

use crate::config::{ConfigError, RemoteConfig};
use crate::retry::retry_send;

/// HTTP client for the GitHub REST API.
#[derive(Debug, Clone)]
pub struct HttpSourceHost {
    client: reqwest::Client,
    base_url: url::Url,
}

#[derive(Debug, Deserialize)]
struct ReleaseResponse {
    tag_name: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    target_commitish: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: String,
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    message: String,
}

impl HttpSourceHost {
    /// Create a client from configuration.
    pub fn new(config: &RemoteConfig) -> Result<Self, ConfigError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("vend-pipeline"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );
        if let Some(token) = &config.github_token {
            let bearer = format!("Bearer {token}");
            headers.insert(
                reqwest::header::AUTHORIZATION,
                reqwest::header::HeaderValue::from_str(&bearer).map_err(|_| {
                    ConfigError::InvalidUrl(
                        "VEND_GITHUB_TOKEN".to_string(),
                        "token contains invalid header characters".to_string(),
                    )
                })?,
            );
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| {
                ConfigError::InvalidUrl("VEND_GITHUB_API_URL".to_string(), e.to_string())
            })?;
        Ok(Self {
            client,
            base_url: config.github_api_url.clone(),
        })
    }

    fn repo_url(&self, owner: &str, repo: &str, tail: &str) -> String {
        format!("{}repos/{owner}/{repo}/{tail}", self.base_url.as_str())
    }

    async fn get_checked(
        &self,
        url: &str,
        endpoint: &str,
    ) -> Result<reqwest::Response, RemoteError> {
        let resp = retry_send(|| self.client.get(url).send())
            .await
            .map_err(|e| RemoteError::Transport {
                endpoint: endpoint.to_string(),
                detail: e.to_string(),
            })?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(RemoteError::Service {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body: body.chars().take(300).collect(),
        })
    }
}

#[async_trait]
impl SourceHost for HttpSourceHost {
    async fn latest_release(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Option<SourceRelease>, RemoteError> {
        let url = self.repo_url(owner, repo, "releases/latest");
        let endpoint = format!("GET /repos/{owner}/{repo}/releases/latest");

        let resp = retry_send(|| self.client.get(&url).send())
            .await
            .map_err(|e| RemoteError::Transport {
                endpoint: endpoint.clone(),
                detail: e.to_string(),
            })?;

        // No releases published — a normal answer for commit-only repos.
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Service {
                endpoint,
                status: status.as_u16(),
                body: body.chars().take(300).collect(),
            });
        }

        let release: ReleaseResponse =
            resp.json().await.map_err(|e| RemoteError::Transport {
                endpoint: endpoint.clone(),
                detail: e.to_string(),
            })?;
        Ok(Some(SourceRelease {
            tag_name: release.tag_name,
            name: release.name,
            body: release.body,
            target_commit: release.target_commitish,
        }))
    }

    async fn latest_commit(&self, owner: &str, repo: &str) -> Result<SourceCommit, RemoteError> {
        let url = format!("{}?per_page=1", self.repo_url(owner, repo, "commits"));
        let endpoint = format!("GET /repos/{owner}/{repo}/commits");

        let resp = self.get_checked(&url, &endpoint).await?;
        let commits: Vec<CommitResponse> =
            resp.json().await.map_err(|e| RemoteError::Transport {
                endpoint: endpoint.clone(),
                detail: e.to_string(),
            })?;

        let head = commits.into_iter().next().ok_or(RemoteError::MissingField {
            endpoint,
            field: "commits[0]",
        })?;
        Ok(SourceCommit {
            sha: head.sha,
            message: head
                .commit
                .message
                .lines()
                .next()
                .unwrap_or_default()
                .to_string(),
        })
    }

    async fn download_archive(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
    ) -> Result<Vec<u8>, RemoteError> {
        let url = self.repo_url(owner, repo, &format!("zipball/{git_ref}"));
        let endpoint = format!("GET /repos/{owner}/{repo}/zipball/{git_ref}");

        // The API answers with a redirect to a codeload URL; reqwest
        // follows it by default.
        let resp = self.get_checked(&url, &endpoint).await?;
        let bytes = resp.bytes().await.map_err(|e| RemoteError::Transport {
            endpoint: endpoint.clone(),
            detail: e.to_string(),
        })?;
        tracing::debug!(repo = %format!("{owner}/{repo}"), git_ref = %git_ref, bytes = bytes.len(), "downloaded zipball");
        Ok(bytes.to_vec())
    }
}
