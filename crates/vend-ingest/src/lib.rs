//! # vend-ingest — Ingestion & Publication Pipeline
//!
//! Drives an uploaded template archive from intake to public visibility:
//!
//! ```text
//! validate ──▶ store blobs ──▶ write catalog record ──▶ scan ──▶ pin ──▶ approved
//!                                                        │        │
//!                                                        ▼        ▼
//!                                                  scan_failed  ipfs_pin_failed
//!                                                        └── retry ──┘
//! ```
//!
//! Each phase is a leaf dependency of the next; there is no fan-out. The
//! "queue" is a sequential await chain run inline in the triggering
//! request — there is no background job system, so every remote step runs
//! under an explicit timeout and a timeout is recorded as that step's
//! failure rather than leaving the entry stuck in review.
//!
//! ## Collaborators
//!
//! The pipeline talks to four external systems through object-safe async
//! traits: the blob store ([`ObjectStore`]), the security scanner
//! ([`SecurityScanner`]), the content pinning service ([`ContentPinner`]),
//! and the source-control host ([`SourceHost`]). The `vend-remote` crate
//! provides the HTTP implementations; [`testing`] provides instrumented
//! in-memory doubles for the workspace test suites.
//!
//! ## Failure Policy
//!
//! Validation and storage failures surface as `Err` to the caller before
//! any catalog record is touched. Scan and pin failures are absorbed into
//! entry state (`scan_failed` / `ipfs_pin_failed`) and are retryable; they
//! never propagate past the orchestration boundary.

pub mod error;
pub mod pipeline;
pub mod testing;
pub mod traits;

pub use error::{PipelineError, RemoteError};
pub use pipeline::{PublishPipeline, SyncOutcome};
pub use traits::{
    Bucket, ContentPinner, ObjectStore, PinReceipt, ScanReport, SecurityScanner, SourceCommit,
    SourceHost, SourceRelease, StoredObject, UploadedFile,
};
