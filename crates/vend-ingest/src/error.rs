//! # Pipeline Error Types
//!
//! Two layers of failure:
//!
//! - [`RemoteError`] — a single remote call went wrong (transport, non-2xx,
//!   timeout, malformed response). Produced by collaborator implementations
//!   and by the per-step timeout wrapper.
//! - [`PipelineError`] — an operation-level failure surfaced to the caller.
//!   Scan and pin failures deliberately do NOT appear here: they are
//!   recorded on the entry as retryable states, not returned as errors.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use vend_catalog::{CatalogStoreError, EntryError, PathError};
use vend_core::UploadError;

/// A failed remote call to one of the pipeline's collaborators.
#[derive(Error, Debug, Clone)]
pub enum RemoteError {
    /// The request never produced an HTTP response.
    #[error("transport error calling {endpoint}: {detail}")]
    Transport {
        /// Endpoint description (method + path, no credentials).
        endpoint: String,
        /// Underlying transport failure text.
        detail: String,
    },

    /// The service answered with a non-success status.
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Service {
        /// Endpoint description.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Response body excerpt.
        body: String,
    },

    /// The step did not complete within the configured deadline.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        /// Human-readable step name.
        operation: String,
        /// The deadline that elapsed.
        timeout: Duration,
    },

    /// The response parsed but lacked a required field.
    #[error("response from {endpoint} is missing {field}")]
    MissingField {
        /// Endpoint description.
        endpoint: String,
        /// The field that was expected.
        field: &'static str,
    },

    /// The requested object does not exist in the bucket.
    #[error("object {path} not found in bucket {bucket}")]
    ObjectMissing {
        /// Bucket name.
        bucket: String,
        /// Object path.
        path: String,
    },
}

/// Operation-level pipeline failures returned to the caller.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The upload was rejected before any persistence.
    #[error(transparent)]
    Validation(#[from] UploadError),

    /// A catalog entry mutation was rejected (bad transition, stale
    /// version, archived entry).
    #[error(transparent)]
    Entry(#[from] EntryError),

    /// No entry with the given id.
    #[error("entry {0} not found")]
    NotFound(Uuid),

    /// The entry has no source repository linkage.
    #[error("entry {0} is not linked to a source repository")]
    NotLinked(Uuid),

    /// The canonical storage path cannot be derived from entry state.
    #[error("storage path cannot be derived: {0}")]
    PathUnresolvable(#[from] PathError),

    /// The blob store failed; the operation was aborted with the catalog
    /// record untouched.
    #[error("object storage failure: {0}")]
    Storage(RemoteError),

    /// The source-control host failed during a sync.
    #[error("source host failure: {0}")]
    SourceHost(RemoteError),

    /// A concurrent writer updated the entry first; re-read and retry.
    #[error("entry {0} was modified concurrently; retry")]
    Conflict(Uuid),

    /// Catalog backend failure.
    #[error("catalog failure: {0}")]
    Catalog(String),
}

impl From<CatalogStoreError> for PipelineError {
    fn from(err: CatalogStoreError) -> Self {
        match err {
            CatalogStoreError::NotFound(id) => Self::NotFound(id),
            CatalogStoreError::Conflict { id, .. } => Self::Conflict(id),
            CatalogStoreError::Duplicate(id) => {
                Self::Catalog(format!("entry {id} already exists"))
            }
            CatalogStoreError::Backend(detail) => Self::Catalog(detail),
        }
    }
}
