//! # Bucket Object Storage Client
//!
//! HTTP implementation of [`ObjectStore`] against the bucket storage REST
//! API. Writes are upserts: re-storing at an existing path replaces the
//! prior content without erroring, which makes republish and retry safe to
//! repeat.
//!
//! ## Endpoints
//!
//! | Method | Path                                  | Operation        |
//! |--------|---------------------------------------|------------------|
//! | POST   | `/object/{bucket}/{path}`             | Upload (upsert)  |
//! | GET    | `/object/{bucket}/{path}`             | Download         |
//! | POST   | `/object/sign/{bucket}/{path}`        | Create signed URL|
//! | GET    | `/object/public/{bucket}/{path}`      | Public URL form  |

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use vend_core::ContentDigest;
use vend_ingest::{Bucket, ObjectStore, RemoteError, StoredObject};

use crate::config::{ConfigError, RemoteConfig};
use crate::retry::retry_send;

/// HTTP client for the bucket storage API.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: reqwest::Client,
    base_url: url::Url,
}

#[derive(Debug, Serialize)]
struct SignRequest {
    #[serde(rename = "expiresIn")]
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

impl HttpObjectStore {
    /// Create a client from configuration.
    pub fn new(config: &RemoteConfig) -> Result<Self, ConfigError> {
        let mut headers = reqwest::header::HeaderMap::new();
        let bearer = format!("Bearer {}", config.storage_key);
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&bearer).map_err(|_| {
                ConfigError::InvalidUrl(
                    "VEND_STORAGE_KEY".to_string(),
                    "key contains invalid header characters".to_string(),
                )
            })?,
        );
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| {
                ConfigError::InvalidUrl("VEND_STORAGE_URL".to_string(), e.to_string())
            })?;
        Ok(Self {
            client,
            base_url: config.storage_url.clone(),
        })
    }

    fn object_url(&self, bucket: Bucket, path: &str) -> String {
        format!(
            "{}object/{}/{}",
            self.base_url.as_str(),
            bucket.as_str(),
            path
        )
    }

    fn map_transport(endpoint: &str, err: reqwest::Error) -> RemoteError {
        RemoteError::Transport {
            endpoint: endpoint.to_string(),
            detail: err.to_string(),
        }
    }

    async fn check_status(
        endpoint: &str,
        resp: reqwest::Response,
    ) -> Result<reqwest::Response, RemoteError> {
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
impl ObjectStore for HttpObjectStore {
    async fn put(
        &self,
        bucket: Bucket,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, RemoteError> {
        let url = self.object_url(bucket, path);
        let endpoint = format!("POST /object/{}/{path}", bucket.as_str());

        // The digest is computed here, at store time, so the catalog gets a
        // verifiable reference for the stored bytes.
        let digest = ContentDigest::of(&bytes);
        let byte_len = bytes.len() as u64;

        let content_type = content_type.to_string();
        let resp = retry_send(|| {
            self.client
                .post(&url)
                .header(reqwest::header::CONTENT_TYPE, content_type.clone())
                .header("x-upsert", "true")
                .body(bytes.clone())
                .send()
        })
        .await
        .map_err(|e| Self::map_transport(&endpoint, e))?;
        Self::check_status(&endpoint, resp).await?;

        tracing::debug!(bucket = %bucket, path = %path, bytes = byte_len, "stored object");
        Ok(StoredObject {
            path: path.to_string(),
            url: self.public_url(bucket, path),
            digest,
            byte_len,
        })
    }

    async fn get(&self, bucket: Bucket, path: &str) -> Result<Vec<u8>, RemoteError> {
        let url = self.object_url(bucket, path);
        let endpoint = format!("GET /object/{}/{path}", bucket.as_str());

        let resp = retry_send(|| self.client.get(&url).send())
            .await
            .map_err(|e| Self::map_transport(&endpoint, e))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(RemoteError::ObjectMissing {
                bucket: bucket.to_string(),
                path: path.to_string(),
            });
        }
        let resp = Self::check_status(&endpoint, resp).await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Self::map_transport(&endpoint, e))?;
        Ok(bytes.to_vec())
    }

    fn public_url(&self, bucket: Bucket, path: &str) -> String {
        format!(
            "{}object/public/{}/{}",
            self.base_url.as_str(),
            bucket.as_str(),
            path
        )
    }

    async fn signed_url(
        &self,
        bucket: Bucket,
        path: &str,
        ttl_secs: u64,
    ) -> Result<String, RemoteError> {
        let url = format!(
            "{}object/sign/{}/{}",
            self.base_url.as_str(),
            bucket.as_str(),
            path
        );
        let endpoint = format!("POST /object/sign/{}/{path}", bucket.as_str());

        let resp = self
            .client
            .post(&url)
            .json(&SignRequest {
                expires_in: ttl_secs,
            })
            .send()
            .await
            .map_err(|e| Self::map_transport(&endpoint, e))?;
        let resp = Self::check_status(&endpoint, resp).await?;

        let sign: SignResponse = resp
            .json()
            .await
            .map_err(|e| Self::map_transport(&endpoint, e))?;
        // The API returns a bucket-relative token path.
        Ok(format!(
            "{}{}",
            self.base_url.as_str(),
            sign.signed_url.trim_start_matches('/')
        ))
    }
}
