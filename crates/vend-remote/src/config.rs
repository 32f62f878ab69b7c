//! Remote service configuration.
//!
//! Base URLs and credentials for each collaborator service. Loaded from
//! environment variables; override via explicit construction for
//! staging/testing.

use url::Url;

/// Configuration for the remote collaborator clients.
///
/// Custom `Debug` implementation redacts every credential field to prevent
/// leakage in log output.
#[derive(Clone)]
pub struct RemoteConfig {
    /// Base URL of the bucket storage API.
    pub storage_url: Url,
    /// Service key for the storage API.
    pub storage_key: String,
    /// Base URL of the security scan function.
    pub scanner_url: Url,
    /// Base URL of the content pinning gateway.
    pub pinner_url: Url,
    /// Bearer token for the pinning gateway.
    pub pinner_token: String,
    /// Base URL of the source-host REST API.
    /// Default: <https://api.github.com>
    pub github_api_url: Url,
    /// Bearer token for source-host calls (app installation token).
    /// Absent means unauthenticated calls against public repositories.
    pub github_token: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("storage_url", &self.storage_url)
            .field("storage_key", &"[REDACTED]")
            .field("scanner_url", &self.scanner_url)
            .field("pinner_url", &self.pinner_url)
            .field("pinner_token", &"[REDACTED]")
            .field("github_api_url", &self.github_api_url)
            .field(
                "github_token",
                &self.github_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl RemoteConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `VEND_STORAGE_URL` (required)
    /// - `VEND_STORAGE_KEY` (required)
    /// - `VEND_SCANNER_URL` (required)
    /// - `VEND_PINNER_URL` (default: `https://rpc.filebase.io`)
    /// - `VEND_PINNER_TOKEN` (required)
    /// - `VEND_GITHUB_API_URL` (default: `https://api.github.com`)
    /// - `VEND_GITHUB_TOKEN` (optional)
    /// - `VEND_REMOTE_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            storage_url: required_url("VEND_STORAGE_URL")?,
            storage_key: required_var("VEND_STORAGE_KEY")?,
            scanner_url: required_url("VEND_SCANNER_URL")?,
            pinner_url: env_url("VEND_PINNER_URL", "https://rpc.filebase.io")?,
            pinner_token: required_var("VEND_PINNER_TOKEN")?,
            github_api_url: env_url("VEND_GITHUB_API_URL", "https://api.github.com")?,
            github_token: std::env::var("VEND_GITHUB_TOKEN").ok(),
            timeout_secs: std::env::var("VEND_REMOTE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        })
    }

    /// Create a configuration pointing to local mock servers (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if the localhost URL cannot be
    /// parsed (should not occur for valid port numbers, but avoids
    /// `expect()`).
    pub fn local_mock(base_port: u16, token: &str) -> Result<Self, ConfigError> {
        let make_url = |port: u16| -> Result<Url, ConfigError> {
            Url::parse(&format!("http://127.0.0.1:{port}"))
                .map_err(|e| ConfigError::InvalidUrl("localhost".to_string(), e.to_string()))
        };
        Ok(Self {
            storage_url: make_url(base_port)?,
            storage_key: token.to_string(),
            scanner_url: make_url(base_port + 1)?,
            pinner_url: make_url(base_port + 2)?,
            pinner_token: token.to_string(),
            github_api_url: make_url(base_port + 3)?,
            github_token: Some(token.to_string()),
            timeout_secs: 5,
        })
    }
}

fn required_var(var: &'static str) -> Result<String, ConfigError> {
    std::env::var(var).map_err(|_| ConfigError::MissingVar(var))
}

fn required_url(var: &'static str) -> Result<Url, ConfigError> {
    let raw = required_var(var)?;
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    MissingVar(&'static str),
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_mock_builds_valid_config() {
        let cfg = RemoteConfig::local_mock(9100, "test-token").unwrap();
        assert_eq!(cfg.storage_key, "test-token");
        assert_eq!(cfg.timeout_secs, 5);
        assert_eq!(cfg.storage_url.as_str(), "http://127.0.0.1:9100/");
        assert_eq!(cfg.scanner_url.as_str(), "http://127.0.0.1:9101/");
        assert_eq!(cfg.pinner_url.as_str(), "http://127.0.0.1:9102/");
    }

    #[test]
    fn env_url_uses_default_when_var_absent() {
        let url = env_url("VEND_NONEXISTENT_VAR_12345", "https://example.com").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn env_url_rejects_invalid_url() {
        std::env::set_var("VEND_TEST_BAD_URL", "not a url");
        let result = env_url("VEND_TEST_BAD_URL", "https://example.com");
        std::env::remove_var("VEND_TEST_BAD_URL");
        assert!(result.is_err());
    }

    #[test]
    fn debug_redacts_credentials() {
        let cfg = RemoteConfig::local_mock(9100, "super-secret").unwrap();
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
