//! # Test Doubles for the Pipeline Collaborators
//!
//! Instrumented in-memory implementations of the collaborator traits, used
//! by this crate's tests and by the workspace integration suite. Each
//! double records call counts and supports failure injection so tests can
//! drive every branch of the orchestrator without a network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use vend_core::ContentDigest;

use crate::error::RemoteError;
use crate::traits::{
    Bucket, ContentPinner, ObjectStore, PinReceipt, ScanReport, SecurityScanner, SourceCommit,
    SourceHost, SourceRelease, StoredObject,
};

// ─── Object store ────────────────────────────────────────────────────

/// In-memory object store with upsert semantics and failure injection.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<(Bucket, String), Vec<u8>>>,
    /// When set, every put fails with this message.
    pub fail_puts: RwLock<Option<String>>,
    /// When set, every get fails with this message.
    pub fail_gets: RwLock<Option<String>>,
    /// Number of put calls, successful or not.
    pub puts: AtomicU64,
    /// Number of get calls, successful or not.
    pub gets: AtomicU64,
}

impl MemoryObjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored bytes at `path`, if any.
    pub fn stored(&self, bucket: Bucket, path: &str) -> Option<Vec<u8>> {
        self.objects.read().get(&(bucket, path.to_string())).cloned()
    }

    /// Paths currently stored in a bucket.
    pub fn paths(&self, bucket: Bucket) -> Vec<String> {
        let mut paths: Vec<String> = self
            .objects
            .read()
            .keys()
            .filter(|(b, _)| *b == bucket)
            .map(|(_, p)| p.clone())
            .collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        bucket: Bucket,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<StoredObject, RemoteError> {
        self.puts.fetch_add(1, Ordering::Relaxed);
        if let Some(message) = self.fail_puts.read().clone() {
            return Err(RemoteError::Service {
                endpoint: format!("PUT {bucket}/{path}"),
                status: 500,
                body: message,
            });
        }
        let digest = ContentDigest::of(&bytes);
        let byte_len = bytes.len() as u64;
        self.objects
            .write()
            .insert((bucket, path.to_string()), bytes);
        Ok(StoredObject {
            path: path.to_string(),
            url: self.public_url(bucket, path),
            digest,
            byte_len,
        })
    }

    async fn get(&self, bucket: Bucket, path: &str) -> Result<Vec<u8>, RemoteError> {
        self.gets.fetch_add(1, Ordering::Relaxed);
        if let Some(message) = self.fail_gets.read().clone() {
            return Err(RemoteError::Service {
                endpoint: format!("GET {bucket}/{path}"),
                status: 500,
                body: message,
            });
        }
        self.objects
            .read()
            .get(&(bucket, path.to_string()))
            .cloned()
            .ok_or_else(|| RemoteError::ObjectMissing {
                bucket: bucket.to_string(),
                path: path.to_string(),
            })
    }

    fn public_url(&self, bucket: Bucket, path: &str) -> String {
        format!("memory://{bucket}/{path}")
    }

    async fn signed_url(
        &self,
        bucket: Bucket,
        path: &str,
        ttl_secs: u64,
    ) -> Result<String, RemoteError> {
        if self
            .objects
            .read()
            .contains_key(&(bucket, path.to_string()))
        {
            Ok(format!("memory://{bucket}/{path}?expires_in={ttl_secs}"))
        } else {
            Err(RemoteError::ObjectMissing {
                bucket: bucket.to_string(),
                path: path.to_string(),
            })
        }
    }
}

// ─── Security scanner ────────────────────────────────────────────────

/// Configured behavior of the stub scanner.
#[derive(Debug, Clone)]
pub enum ScanBehavior {
    /// Scan passes.
    Pass,
    /// Scan completes and rejects the archive.
    Reject(String),
    /// Scan call itself fails (service unavailable).
    Error(String),
}

/// Stub security scanner with scripted verdicts.
#[derive(Debug)]
pub struct StubScanner {
    /// Behavior applied to each scan call.
    pub behavior: RwLock<ScanBehavior>,
    /// Number of scan calls.
    pub scans: AtomicU64,
}

impl StubScanner {
    /// A scanner that passes everything.
    pub fn passing() -> Self {
        Self {
            behavior: RwLock::new(ScanBehavior::Pass),
            scans: AtomicU64::new(0),
        }
    }

    /// A scanner that rejects everything with the given reason.
    pub fn rejecting(reason: &str) -> Self {
        Self {
            behavior: RwLock::new(ScanBehavior::Reject(reason.to_string())),
            scans: AtomicU64::new(0),
        }
    }

    /// Switch behavior mid-test.
    pub fn set_behavior(&self, behavior: ScanBehavior) {
        *self.behavior.write() = behavior;
    }
}

#[async_trait]
impl SecurityScanner for StubScanner {
    async fn scan(&self, _entry_id: Uuid, storage_path: &str) -> Result<ScanReport, RemoteError> {
        self.scans.fetch_add(1, Ordering::Relaxed);
        match self.behavior.read().clone() {
            ScanBehavior::Pass => Ok(ScanReport {
                passed: true,
                detail: None,
            }),
            ScanBehavior::Reject(reason) => Ok(ScanReport {
                passed: false,
                detail: Some(reason),
            }),
            ScanBehavior::Error(message) => Err(RemoteError::Service {
                endpoint: format!("POST /scan ({storage_path})"),
                status: 503,
                body: message,
            }),
        }
    }
}

// ─── Content pinner ──────────────────────────────────────────────────

/// Stub pinning service that derives deterministic identifiers from the
/// pinned bytes.
#[derive(Debug, Default)]
pub struct StubPinner {
    /// When set, every pin fails with this message.
    pub fail_with: RwLock<Option<String>>,
    /// Number of pin calls.
    pub pins: AtomicU64,
}

impl StubPinner {
    /// A pinner that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// A pinner that fails every call with the given message.
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: RwLock::new(Some(message.to_string())),
            pins: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl ContentPinner for StubPinner {
    async fn pin(&self, file_name: &str, bytes: Vec<u8>) -> Result<PinReceipt, RemoteError> {
        self.pins.fetch_add(1, Ordering::Relaxed);
        if let Some(message) = self.fail_with.read().clone() {
            return Err(RemoteError::Service {
                endpoint: format!("POST /api/v0/add ({file_name})"),
                status: 502,
                body: message,
            });
        }
        // Deterministic identifier so tests can assert exact values.
        let digest = ContentDigest::of(&bytes).to_hex();
        Ok(PinReceipt {
            cid: format!("pin-{}", &digest[..16]),
        })
    }
}

// ─── Source host ─────────────────────────────────────────────────────

/// Stub source-control host with scripted releases, commits, and archives.
#[derive(Debug, Default)]
pub struct StubSourceHost {
    /// Latest release, if any.
    pub release: RwLock<Option<SourceRelease>>,
    /// Latest commit on the default branch.
    pub commit: RwLock<Option<SourceCommit>>,
    /// Zipball bytes served for any ref.
    pub archive_bytes: RwLock<Vec<u8>>,
    /// Number of zipball downloads.
    pub downloads: AtomicU64,
}

impl StubSourceHost {
    /// A host with no releases and a single commit.
    pub fn with_commit(sha: &str, message: &str) -> Self {
        Self {
            release: RwLock::new(None),
            commit: RwLock::new(Some(SourceCommit {
                sha: sha.to_string(),
                message: message.to_string(),
            })),
            archive_bytes: RwLock::new(b"zipball-bytes".repeat(128)),
            downloads: AtomicU64::new(0),
        }
    }

    /// A host with a latest release.
    pub fn with_release(tag: &str, commit_sha: &str) -> Self {
        Self {
            release: RwLock::new(Some(SourceRelease {
                tag_name: tag.to_string(),
                name: Some(format!("Release {tag}")),
                body: None,
                target_commit: Some(commit_sha.to_string()),
            })),
            commit: RwLock::new(Some(SourceCommit {
                sha: commit_sha.to_string(),
                message: "release commit".to_string(),
            })),
            archive_bytes: RwLock::new(b"zipball-bytes".repeat(128)),
            downloads: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl SourceHost for StubSourceHost {
    async fn latest_release(
        &self,
        _owner: &str,
        _repo: &str,
    ) -> Result<Option<SourceRelease>, RemoteError> {
        Ok(self.release.read().clone())
    }

    async fn latest_commit(&self, owner: &str, repo: &str) -> Result<SourceCommit, RemoteError> {
        self.commit
            .read()
            .clone()
            .ok_or_else(|| RemoteError::Service {
                endpoint: format!("GET /repos/{owner}/{repo}/commits"),
                status: 404,
                body: "empty repository".to_string(),
            })
    }

    async fn download_archive(
        &self,
        _owner: &str,
        _repo: &str,
        _git_ref: &str,
    ) -> Result<Vec<u8>, RemoteError> {
        self.downloads.fetch_add(1, Ordering::Relaxed);
        Ok(self.archive_bytes.read().clone())
    }
}
