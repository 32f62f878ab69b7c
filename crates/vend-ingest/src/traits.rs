//! # Collaborator Interfaces
//!
//! Object-safe async traits for the four external systems the pipeline
//! drives. Implementations must be `Send + Sync` so they can be shared
//! behind `Arc` across request handlers.
//!
//! The HTTP implementations live in `vend-remote`; instrumented in-memory
//! doubles live in [`crate::testing`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vend_core::{ContentDigest, UploadMetadata};

use crate::error::RemoteError;

/// An uploaded file as received from the client, bytes included.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Original file name, including extension.
    pub file_name: String,
    /// Declared MIME content type.
    pub content_type: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// The declared metadata used for pre-persistence validation.
    pub fn metadata(&self) -> UploadMetadata {
        UploadMetadata {
            file_name: self.file_name.clone(),
            byte_len: self.bytes.len() as u64,
            content_type: self.content_type.clone(),
        }
    }
}

// ─── Object store ────────────────────────────────────────────────────

/// The two logical buckets of the object store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    /// Private bucket holding template source archives.
    Archives,
    /// Public bucket holding preview images.
    Previews,
}

impl Bucket {
    /// The bucket name on the storage service.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Archives => "private-archives",
            Self::Previews => "public-previews",
        }
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored blob reference returned by the storage writer.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// The path the blob was stored at.
    pub path: String,
    /// Public or bucket-relative URL of the blob.
    pub url: String,
    /// SHA-256 of the stored bytes, computed at store time.
    pub digest: ContentDigest,
    /// Stored size in bytes.
    pub byte_len: u64,
}

/// Blob storage with upsert semantics.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store bytes at `path`, replacing any prior content at the same path
    /// without erroring.
    async fn put(
        &self,
        bucket: Bucket,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, RemoteError>;

    /// Download the blob at `path`.
    async fn get(&self, bucket: Bucket, path: &str) -> Result<Vec<u8>, RemoteError>;

    /// Public URL for a blob in a public bucket.
    fn public_url(&self, bucket: Bucket, path: &str) -> String;

    /// Time-limited signed URL for a blob in a private bucket.
    async fn signed_url(
        &self,
        bucket: Bucket,
        path: &str,
        ttl_secs: u64,
    ) -> Result<String, RemoteError>;
}

// ─── Security scanner ────────────────────────────────────────────────

/// Verdict from the remote security scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// Whether the archive passed the scan.
    pub passed: bool,
    /// Scanner-provided detail, forwarded into `last_processing_error`
    /// when the scan fails.
    pub detail: Option<String>,
}

/// Remote security scan over a stored archive.
#[async_trait]
pub trait SecurityScanner: Send + Sync {
    /// Scan the archive stored at `storage_path` on behalf of `entry_id`.
    async fn scan(&self, entry_id: Uuid, storage_path: &str) -> Result<ScanReport, RemoteError>;
}

// ─── Content pinner ──────────────────────────────────────────────────

/// Receipt from the pinning service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinReceipt {
    /// The content identifier assigned by the pinning service.
    pub cid: String,
}

/// Remote pin-to-content-store step.
#[async_trait]
pub trait ContentPinner: Send + Sync {
    /// Upload bytes to the pinning service and return the content
    /// identifier it assigns.
    async fn pin(&self, file_name: &str, bytes: Vec<u8>) -> Result<PinReceipt, RemoteError>;
}

// ─── Source-control host ─────────────────────────────────────────────

/// A published release on the source host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRelease {
    /// The release tag (e.g. `v1.4.0`).
    pub tag_name: String,
    /// Release title, if set.
    pub name: Option<String>,
    /// Release notes body, if set.
    pub body: Option<String>,
    /// The commit the release was cut from, when the host reports it.
    pub target_commit: Option<String>,
}

/// A commit on the default branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceCommit {
    /// Full commit SHA.
    pub sha: String,
    /// First line of the commit message.
    pub message: String,
}

/// Read-only client for the linked source repository.
#[async_trait]
pub trait SourceHost: Send + Sync {
    /// The latest published release, or `None` if the repository has none.
    async fn latest_release(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Option<SourceRelease>, RemoteError>;

    /// The most recent commit on the default branch.
    async fn latest_commit(&self, owner: &str, repo: &str) -> Result<SourceCommit, RemoteError>;

    /// Download the repository zipball at `git_ref`.
    async fn download_archive(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
    ) -> Result<Vec<u8>, RemoteError>;
}
