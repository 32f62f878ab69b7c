//! # vend-remote — HTTP Collaborator Clients
//!
//! Production implementations of the pipeline collaborator traits over the
//! real services:
//!
//! | Client                  | Service                                  |
//! |-------------------------|------------------------------------------|
//! | [`HttpObjectStore`]     | Bucket storage REST API                  |
//! | [`HttpSecurityScanner`] | Security scan function                   |
//! | [`HttpContentPinner`]   | Content pinning gateway (IPFS-backed)    |
//! | [`HttpSourceHost`]      | GitHub REST API                          |
//!
//! ## Architecture
//!
//! Each client wraps a `reqwest::Client` with the service-specific base
//! URL, authentication, and request/response mapping. All clients are
//! `Send + Sync` and designed to be shared via `Arc` across async tasks.
//!
//! ## Error Handling
//!
//! HTTP failures map to [`vend_ingest::RemoteError`] with diagnostic
//! context: the endpoint description, HTTP status, and a response body
//! excerpt. Credentials never appear in error text or `Debug` output.
//!
//! ## Timeout & Retry
//!
//! Every client uses a per-request timeout from [`RemoteConfig`]. Reads
//! against the object store and the source host retry transient transport
//! errors with exponential backoff (see [`retry`]); the scanner and pinner
//! are invoked once per pipeline attempt — the pipeline's own retry entry
//! point covers them.

pub mod config;
pub mod github;
pub mod object_store;
pub mod pinner;
mod retry;
pub mod scanner;

pub use config::{ConfigError, RemoteConfig};
pub use github::HttpSourceHost;
pub use object_store::HttpObjectStore;
pub use pinner::HttpContentPinner;
pub use scanner::HttpSecurityScanner;
