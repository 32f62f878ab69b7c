//! # Security Scanner Client
//!
//! HTTP implementation of [`SecurityScanner`] against the remote scan
//! function. The function receives the entry id and the storage path of
//! the archive, downloads it server-side, and answers with a pass/fail
//! verdict. A scan that completes with a rejection is a *verdict*, not an
//! error — both surface as [`ScanReport`]; only transport and service
//! failures become [`RemoteError`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vend_ingest::{RemoteError, ScanReport, SecurityScanner};

use crate::config::{ConfigError, RemoteConfig};

/// HTTP client for the security scan function.
#[derive(Debug, Clone)]
pub struct HttpSecurityScanner {
    client: reqwest::Client,
    scan_url: String,
}

#[derive(Debug, Serialize)]
struct ScanRequest<'a> {
    entry_id: Uuid,
    storage_path: &'a str,
}

#[derive(Debug, Deserialize)]
struct ScanResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

impl HttpSecurityScanner {
    /// Create a client from configuration.
    pub fn new(config: &RemoteConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                ConfigError::InvalidUrl("VEND_SCANNER_URL".to_string(), e.to_string())
            })?;
        let scan_url = format!("{}scan", config.scanner_url.as_str());
        Ok(Self { client, scan_url })
    }
}

#[async_trait]
impl SecurityScanner for HttpSecurityScanner {
    async fn scan(&self, entry_id: Uuid, storage_path: &str) -> Result<ScanReport, RemoteError> {
        let endpoint = "POST /scan";
        let resp = self
            .client
            .post(&self.scan_url)
            .json(&ScanRequest {
                entry_id,
                storage_path,
            })
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

        let verdict: ScanResponse = resp.json().await.map_err(|e| RemoteError::Transport {
            endpoint: endpoint.to_string(),
            detail: e.to_string(),
        })?;

        Ok(ScanReport {
            passed: verdict.success,
            detail: verdict.error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_url_appends_scan_segment() {
        let config = RemoteConfig::local_mock(9300, "token").unwrap();
        let scanner = HttpSecurityScanner::new(&config).unwrap();
        assert_eq!(scanner.scan_url, "http://127.0.0.1:9301/scan");
    }

    #[test]
    fn scan_response_parses_failure_shape() {
        let json = r#"{"success": false, "error": "embedded binary rejected"}"#;
        let parsed: ScanResponse = serde_json::from_str(json).unwrap();
        assert!(!parsed.success);
        assert_eq!(parsed.error.as_deref(), Some("embedded binary rejected"));
    }

    #[test]
    fn scan_response_tolerates_missing_error() {
        let json = r#"{"success": true}"#;
        let parsed: ScanResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.success);
        assert!(parsed.error.is_none());
    }

    #[test]
    fn scan_request_serializes_entry_and_path() {
        let id = Uuid::new_v4();
        let req = ScanRequest {
            entry_id: id,
            storage_path: "mvps/foo/kit.zip",
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["storage_path"], "mvps/foo/kit.zip");
        assert_eq!(json["entry_id"], id.to_string());
    }
}
