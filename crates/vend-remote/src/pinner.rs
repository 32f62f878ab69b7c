//! # Content Pinning Client
//!
//! HTTP implementation of [`ContentPinner`] against an IPFS-compatible
//! pinning gateway. The archive bytes are uploaded as multipart form data;
//! the gateway answers with a JSON object whose content identifier field
//! varies by provider (`requestid`, `cid`, or `Hash`), so extraction
//! checks each in turn and a response with none of them is a hard failure.

use std::time::Duration;

use async_trait::async_trait;

use vend_ingest::{ContentPinner, PinReceipt, RemoteError};

use crate::config::{ConfigError, RemoteConfig};

/// HTTP client for the pinning gateway.
#[derive(Debug, Clone)]
pub struct HttpContentPinner {
    client: reqwest::Client,
    add_url: String,
}

impl HttpContentPinner {
    /// Create a client from configuration.
    pub fn new(config: &RemoteConfig) -> Result<Self, ConfigError> {
        let mut headers = reqwest::header::HeaderMap::new();
        let bearer = format!("Bearer {}", config.pinner_token);
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&bearer).map_err(|_| {
                ConfigError::InvalidUrl(
                    "VEND_PINNER_TOKEN".to_string(),
                    "token contains invalid header characters".to_string(),
                )
            })?,
        );
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| ConfigError::InvalidUrl("VEND_PINNER_URL".to_string(), e.to_string()))?;
        let add_url = format!("{}api/v0/add", config.pinner_url.as_str());
        Ok(Self { client, add_url })
    }
}

/// Pull the content identifier out of a gateway response, whichever field
/// name the provider uses.
fn extract_identifier(value: &serde_json::Value) -> Option<String> {
    for key in ["requestid", "cid", "Hash", "hash"] {
        if let Some(id) = value.get(key).and_then(|v| v.as_str()) {
            if !id.is_empty() {
                return Some(id.to_string());
            }
        }
    }
    None
}

#[async_trait]
impl ContentPinner for HttpContentPinner {
    async fn pin(&self, file_name: &str, bytes: Vec<u8>) -> Result<PinReceipt, RemoteError> {
        let endpoint = "POST /api/v0/add";

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/octet-stream")
            .map_err(|e| RemoteError::Transport {
                endpoint: endpoint.to_string(),
                detail: e.to_string(),
            })?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .client
            .post(&self.add_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| RemoteError::Transport {
                endpoint: endpoint.to_string(),
                detail: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Service {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body: body.chars().take(300).collect(),
            });
        }

        let value: serde_json::Value =
            resp.json().await.map_err(|e| RemoteError::Transport {
                endpoint: endpoint.to_string(),
                detail: e.to_string(),
            })?;

        match extract_identifier(&value) {
            Some(cid) => {
                tracing::debug!(file = %file_name, cid = %cid, "content pinned");
                Ok(PinReceipt { cid })
            }
            None => Err(RemoteError::MissingField {
                endpoint: endpoint.to_string(),
                field: "requestid|cid|hash",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_url_is_formed_from_base() {
        let config = RemoteConfig::local_mock(9400, "token").unwrap();
        let pinner = HttpContentPinner::new(&config).unwrap();
        assert_eq!(pinner.add_url, "http://127.0.0.1:9402/api/v0/add");
    }

    #[test]
    fn extract_identifier_prefers_requestid() {
        let value = serde_json::json!({"requestid": "req-1", "cid": "bafy-2"});
        assert_eq!(extract_identifier(&value).as_deref(), Some("req-1"));
    }

    #[test]
    fn extract_identifier_falls_back_to_cid_and_hash() {
        let value = serde_json::json!({"cid": "bafy-2"});
        assert_eq!(extract_identifier(&value).as_deref(), Some("bafy-2"));

        let value = serde_json::json!({"Hash": "QmAbc"});
        assert_eq!(extract_identifier(&value).as_deref(), Some("QmAbc"));
    }

    #[test]
    fn extract_identifier_rejects_empty_and_missing() {
        assert!(extract_identifier(&serde_json::json!({"cid": ""})).is_none());
        assert!(extract_identifier(&serde_json::json!({"name": "kit.zip"})).is_none());
    }
}
