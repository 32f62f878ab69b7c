//! # Publication Pipeline
//!
//! [`PublishPipeline`] owns the four-phase flow (validate → store → record →
//! process) and its three entry points beyond upload: retry, source-host
//! sync, and the correction path.
//!
//! ## Sequencing
//!
//! Within one invocation the steps are strictly sequential — the scan
//! resolves before the pin starts, the store resolves before the record is
//! written. Processing runs inline in the triggering request ("queueing"
//! is an await chain, not a job system).
//!
//! ## Failure Absorption
//!
//! `run_processing` returns step outcomes; `queue_processing` absorbs
//! anything unexpected into the retryable `ipfs_pin_failed` state with the
//! message recorded on the entry. The triggering call site never observes
//! a processing error — it re-reads the entry and renders its status.
//!
//! ## Concurrency
//!
//! Entry mutations go through a read → apply → compare-and-swap loop; a
//! stale revision re-reads and re-applies a bounded number of times before
//! surfacing a conflict to the caller.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use vend_catalog::{
    archive_storage_path, preview_dir, CatalogEntry, CatalogStore, CatalogStoreError, EntryError,
    EntryPatch, EntryStatus, NewEntry, VersionSubmission,
};
use vend_core::{validate_archive, validate_image, Version, VersionBump};

use crate::error::{PipelineError, RemoteError};
use crate::traits::{
    Bucket, ContentPinner, ObjectStore, SecurityScanner, SourceHost, StoredObject, UploadedFile,
};

/// Default per-step deadline for remote calls.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(30);

/// How many times a compare-and-swap update re-reads before giving up.
const MAX_CAS_ATTEMPTS: u32 = 3;

/// Outcome of a retry or sync request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Whether the entry actually changed.
    pub updated: bool,
    /// Human-readable summary suitable for direct display.
    pub message: String,
}

/// The publication pipeline service.
pub struct PublishPipeline {
    catalog: Arc<dyn CatalogStore>,
    objects: Arc<dyn ObjectStore>,
    scanner: Arc<dyn SecurityScanner>,
    pinner: Arc<dyn ContentPinner>,
    source: Arc<dyn SourceHost>,
    step_timeout: Duration,
}

impl PublishPipeline {
    /// Assemble a pipeline over the given collaborators.
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        objects: Arc<dyn ObjectStore>,
        scanner: Arc<dyn SecurityScanner>,
        pinner: Arc<dyn ContentPinner>,
        source: Arc<dyn SourceHost>,
    ) -> Self {
        Self {
            catalog,
            objects,
            scanner,
            pinner,
            source,
            step_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    /// Override the per-step deadline.
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    // ── Upload (create) ──────────────────────────────────────────────

    /// Create a new catalog entry from an upload and run it through
    /// processing.
    ///
    /// Validation and blob storage both complete before the record is
    /// inserted, so a failed store never leaves a partial record behind.
    pub async fn create_entry(
        &self,
        seller_id: Uuid,
        draft: NewEntry,
        archive: UploadedFile,
        images: Vec<UploadedFile>,
    ) -> Result<CatalogEntry, PipelineError> {
        validate_archive(&archive.metadata())?;
        for image in &images {
            validate_image(&image.metadata())?;
        }

        let now = Utc::now();
        let mut entry = CatalogEntry::new(seller_id, draft, now);
        entry.original_file_name = Some(archive.file_name.clone());

        let storage_path = archive_storage_path(&entry)?;
        let stored = self.store_archive(&storage_path, archive).await?;
        entry.attach_initial_archive(
            stored.digest.to_hex(),
            file_name_of(&storage_path),
            stored.byte_len,
            now,
        );
        entry.preview_image_urls = self.store_previews(&entry, images).await?;

        let entry = self.catalog.insert(entry).await?;
        tracing::info!(
            entry_id = %entry.id,
            slug = %entry.slug,
            path = %storage_path,
            "catalog entry created, starting processing"
        );

        self.queue_processing(entry.id, &storage_path).await;
        Ok(self.catalog.get(entry.id).await?)
    }

    // ── Republish (new version) ──────────────────────────────────────

    /// Publish a new version of an existing entry.
    ///
    /// Prepends a history snapshot of the superseded version, installs the
    /// new content, and re-enters review whatever the prior status was.
    /// An explicit version must strictly exceed the current one; absent a
    /// version, the patch component is bumped.
    pub async fn publish_version(
        &self,
        entry_id: Uuid,
        submission: VersionSubmission,
        archive: UploadedFile,
        images: Option<Vec<UploadedFile>>,
    ) -> Result<CatalogEntry, PipelineError> {
        validate_archive(&archive.metadata())?;
        if let Some(images) = &images {
            for image in images {
                validate_image(&image.metadata())?;
            }
        }

        let entry = self.catalog.get(entry_id).await?;
        if entry.status.is_terminal() {
            return Err(EntryError::EntryArchived(entry_id).into());
        }

        let next = match submission.version_number {
            Some(version) => {
                if version <= entry.version_number {
                    return Err(EntryError::VersionNotIncreasing {
                        current: entry.version_number,
                        proposed: version,
                    }
                    .into());
                }
                version
            }
            None => entry.version_number.bumped(VersionBump::Patch),
        };

        // Derive the destination through the one path authority, on a
        // prospective copy reflecting the post-supersede state. A manual
        // republish detaches the entry from any previous source-host sync.
        let mut prospective = entry.clone();
        prospective.version_number = next;
        prospective.original_file_name = Some(archive.file_name.clone());
        prospective.previous_content_hash = prospective
            .content_hash
            .take()
            .or(prospective.previous_content_hash.take());
        prospective.last_synced_commit_sha = None;
        let storage_path = archive_storage_path(&prospective)?;

        let archive_name = archive.file_name.clone();
        let stored = self.store_archive(&storage_path, archive).await?;
        let preview_urls = match images {
            Some(images) => Some(self.store_previews(&entry, images).await?),
            None => None,
        };

        let changelog = submission.changelog.clone();
        let metadata = submission.metadata.clone();
        let updated = self
            .transition(entry_id, move |entry, now| {
                entry.supersede(
                    next,
                    stored.digest.to_hex(),
                    archive_name.clone(),
                    stored.byte_len,
                    changelog.clone(),
                    now,
                )?;
                entry.apply_patch(metadata.clone(), now)?;
                if let Some(urls) = &preview_urls {
                    entry.preview_image_urls = urls.clone();
                }
                Ok(())
            })
            .await?;

        tracing::info!(
            entry_id = %entry_id,
            version = %updated.version_number,
            path = %storage_path,
            "new version published, starting processing"
        );

        self.queue_processing(entry_id, &storage_path).await;
        Ok(self.catalog.get(entry_id).await?)
    }

    // ── Correction (patch) ───────────────────────────────────────────

    /// Patch mutable metadata and optionally replace the archive in place.
    ///
    /// The correction path: a replaced archive moves the content pointers
    /// at the re-derived canonical path, but pushes no history snapshot
    /// and leaves the status alone.
    pub async fn update_entry(
        &self,
        entry_id: Uuid,
        patch: EntryPatch,
        archive: Option<UploadedFile>,
        images: Option<Vec<UploadedFile>>,
    ) -> Result<CatalogEntry, PipelineError> {
        if let Some(archive) = &archive {
            validate_archive(&archive.metadata())?;
        }
        if let Some(images) = &images {
            for image in images {
                validate_image(&image.metadata())?;
            }
        }

        let entry = self.catalog.get(entry_id).await?;
        if entry.status.is_terminal() {
            return Err(EntryError::EntryArchived(entry_id).into());
        }

        let replacement = match archive {
            Some(archive) => {
                // Derive against the post-replacement state: once the old
                // reference moves into `previous_content_hash`, a 1.0.0
                // entry no longer qualifies for the flat initial path.
                let mut prospective = entry.clone();
                prospective.original_file_name = Some(archive.file_name.clone());
                prospective.previous_content_hash = prospective
                    .content_hash
                    .take()
                    .or(prospective.previous_content_hash.take());
                let storage_path = archive_storage_path(&prospective)?;
                let archive_name = archive.file_name.clone();
                let stored = self.store_archive(&storage_path, archive).await?;
                Some((stored, archive_name))
            }
            None => None,
        };
        let preview_urls = match images {
            Some(images) => Some(self.store_previews(&entry, images).await?),
            None => None,
        };

        self.transition(entry_id, move |entry, now| {
            entry.apply_patch(patch.clone(), now)?;
            if let Some((stored, name)) = &replacement {
                entry.replace_archive(
                    stored.digest.to_hex(),
                    name.clone(),
                    stored.byte_len,
                    now,
                )?;
            }
            if let Some(urls) = &preview_urls {
                entry.preview_image_urls = urls.clone();
            }
            Ok(())
        })
        .await
    }

    // ── Processing (scan → pin) ──────────────────────────────────────

    /// Run the scan → pin sequence for an entry, absorbing every failure
    /// into entry state.
    ///
    /// Fire-and-forget from the caller's perspective; implemented as a
    /// sequential await chain in the same request.
    pub async fn queue_processing(&self, entry_id: Uuid, storage_path: &str) {
        if let Err(err) = self.run_processing(entry_id, storage_path).await {
            // Unexpected failure past the per-step handling: degrade to the
            // retryable pin-failed state with the message recorded.
            tracing::error!(
                entry_id = %entry_id,
                error = %err,
                "processing failed outside a handled step"
            );
            self.record_failure(entry_id, Step::Pin, err.to_string()).await;
        }
    }

    async fn run_processing(
        &self,
        entry_id: Uuid,
        storage_path: &str,
    ) -> Result<(), PipelineError> {
        // Step 1: security scan. Failure or timeout halts the pipeline in
        // `scan_failed`.
        let scan = self
            .with_timeout(
                "security scan",
                self.scanner.scan(entry_id, storage_path),
            )
            .await;
        match scan {
            Ok(report) if report.passed => {}
            Ok(report) => {
                let reason = report
                    .detail
                    .unwrap_or_else(|| "archive failed the security scan".to_string());
                tracing::warn!(entry_id = %entry_id, reason = %reason, "security scan rejected archive");
                self.record_failure(entry_id, Step::Scan, reason).await;
                return Ok(());
            }
            Err(err) => {
                tracing::warn!(entry_id = %entry_id, error = %err, "security scan unavailable");
                self.record_failure(entry_id, Step::Scan, err.to_string()).await;
                return Ok(());
            }
        }

        // Step 2: pin to the content store. Download from the bucket,
        // upload to the pinning service, and install the returned
        // identifier. Any failure halts in `ipfs_pin_failed`.
        let bytes = match self
            .with_timeout(
                "archive download",
                self.objects.get(Bucket::Archives, storage_path),
            )
            .await
        {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(entry_id = %entry_id, error = %err, "archive download for pin failed");
                self.record_failure(entry_id, Step::Pin, err.to_string()).await;
                return Ok(());
            }
        };

        let file_name = file_name_of(storage_path);
        let receipt = match self
            .with_timeout("content pin", self.pinner.pin(&file_name, bytes))
            .await
        {
            Ok(receipt) => receipt,
            Err(err) => {
                tracing::warn!(entry_id = %entry_id, error = %err, "content pin failed");
                self.record_failure(entry_id, Step::Pin, err.to_string()).await;
                return Ok(());
            }
        };

        let cid = receipt.cid;
        self.transition(entry_id, move |entry, now| entry.approve(cid.clone(), now))
            .await?;
        tracing::info!(entry_id = %entry_id, "entry approved and published");
        Ok(())
    }

    // ── Retry ────────────────────────────────────────────────────────

    /// Retry processing from a failure state.
    ///
    /// Re-derives the canonical storage path from current entry state —
    /// the entry may have been edited since the failed attempt — clears
    /// the recorded error, re-enters review, and re-runs processing.
    pub async fn retry_processing(&self, entry_id: Uuid) -> Result<SyncOutcome, PipelineError> {
        let entry = self.catalog.get(entry_id).await?;
        if !entry.status.is_retryable_failure() {
            return Err(EntryError::InvalidTransition {
                from: entry.status,
                to: EntryStatus::PendingReview,
            }
            .into());
        }

        let storage_path = archive_storage_path(&entry)?;
        self.transition(entry_id, |entry, now| entry.reenter_review(now))
            .await?;

        tracing::info!(entry_id = %entry_id, path = %storage_path, "retrying processing");
        self.queue_processing(entry_id, &storage_path).await;

        Ok(SyncOutcome {
            updated: true,
            message: "processing restarted".to_string(),
        })
    }

    // ── Source-host sync ─────────────────────────────────────────────

    /// Republish from the linked source repository.
    ///
    /// Fetches the latest release (or, absent any release, the latest
    /// commit), no-ops when the sync point is already recorded, and
    /// otherwise runs the full republish flow with the zipball stored as
    /// `source.zip` under the synced path.
    pub async fn sync_from_source(&self, entry_id: Uuid) -> Result<SyncOutcome, PipelineError> {
        let entry = self.catalog.get(entry_id).await?;
        let (owner, repo) = match (&entry.repo_owner, &entry.repo_name) {
            (Some(owner), Some(repo)) => (owner.clone(), repo.clone()),
            _ => return Err(PipelineError::NotLinked(entry_id)),
        };
        if entry.status.is_terminal() {
            return Err(EntryError::EntryArchived(entry_id).into());
        }

        let point = self.resolve_sync_point(&owner, &repo).await?;
        if entry.last_synced_commit_sha.as_deref() == Some(point.sha.as_str()) {
            return Ok(SyncOutcome {
                updated: false,
                message: format!("already synced at {}", short_sha(&point.sha)),
            });
        }

        let bytes = self
            .with_timeout(
                "zipball download",
                self.source.download_archive(&owner, &repo, &point.git_ref),
            )
            .await
            .map_err(PipelineError::SourceHost)?;

        let next = point
            .version
            .filter(|v| *v > entry.version_number)
            .unwrap_or_else(|| entry.version_number.bumped(VersionBump::Patch));

        let mut prospective = entry.clone();
        prospective.last_synced_commit_sha = Some(point.sha.clone());
        let storage_path = archive_storage_path(&prospective)?;

        let stored = self.store_archive(&storage_path, UploadedFile {
            file_name: "source.zip".to_string(),
            content_type: "application/zip".to_string(),
            bytes,
        })
        .await?;

        let sha = point.sha.clone();
        let changelog = point.changelog.clone();
        self.transition(entry_id, move |entry, now| {
            entry.supersede(
                next,
                stored.digest.to_hex(),
                "source.zip".to_string(),
                stored.byte_len,
                changelog.clone(),
                now,
            )?;
            entry.last_synced_commit_sha = Some(sha.clone());
            Ok(())
        })
        .await?;

        tracing::info!(
            entry_id = %entry_id,
            sha = %short_sha(&point.sha),
            version = %next,
            "synced from source repository, starting processing"
        );
        self.queue_processing(entry_id, &storage_path).await;

        Ok(SyncOutcome {
            updated: true,
            message: format!("synced version {next} at {}", short_sha(&point.sha)),
        })
    }

    // ── Owner delete & admin review ──────────────────────────────────

    /// Owner delete: transition the entry to the terminal archived state.
    pub async fn archive_entry(&self, entry_id: Uuid) -> Result<CatalogEntry, PipelineError> {
        self.transition(entry_id, |entry, now| entry.archive(now)).await
    }

    /// Manual review decision by an admin.
    pub async fn admin_review(
        &self,
        entry_id: Uuid,
        approve: bool,
    ) -> Result<CatalogEntry, PipelineError> {
        self.transition(entry_id, move |entry, now| entry.admin_review(approve, now))
            .await
    }

    /// Signed download URL for the entry's active archive, derived through
    /// the same path rule as upload, retry, and sync.
    pub async fn signed_download_url(
        &self,
        entry_id: Uuid,
        ttl_secs: u64,
    ) -> Result<String, PipelineError> {
        let entry = self.catalog.get(entry_id).await?;
        let storage_path = archive_storage_path(&entry)?;
        self.objects
            .signed_url(Bucket::Archives, &storage_path, ttl_secs)
            .await
            .map_err(PipelineError::Storage)
    }

    // ── Internals ────────────────────────────────────────────────────

    async fn store_archive(
        &self,
        storage_path: &str,
        archive: UploadedFile,
    ) -> Result<StoredObject, PipelineError> {
        let content_type = archive.content_type.clone();
        self.with_timeout(
            "archive store",
            self.objects
                .put(Bucket::Archives, storage_path, archive.bytes, &content_type),
        )
        .await
        .map_err(PipelineError::Storage)
    }

    async fn store_previews(
        &self,
        entry: &CatalogEntry,
        images: Vec<UploadedFile>,
    ) -> Result<Vec<String>, PipelineError> {
        let dir = preview_dir(&entry.slug);
        let mut urls = Vec::with_capacity(images.len());
        for image in images {
            let path = format!("{dir}/{}", image.file_name);
            let content_type = image.content_type.clone();
            let stored = self
                .with_timeout(
                    "preview store",
                    self.objects
                        .put(Bucket::Previews, &path, image.bytes, &content_type),
                )
                .await
                .map_err(PipelineError::Storage)?;
            urls.push(stored.url);
        }
        Ok(urls)
    }

    async fn resolve_sync_point(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<SyncPoint, PipelineError> {
        let release = self
            .with_timeout("latest release", self.source.latest_release(owner, repo))
            .await
            .map_err(PipelineError::SourceHost)?;

        match release {
            Some(release) => {
                let sha = release
                    .target_commit
                    .clone()
                    .unwrap_or_else(|| release.tag_name.clone());
                Ok(SyncPoint {
                    sha,
                    git_ref: release.tag_name.clone(),
                    version: version_from_tag(&release.tag_name),
                    changelog: release.name.or(release.body),
                })
            }
            None => {
                let commit = self
                    .with_timeout("latest commit", self.source.latest_commit(owner, repo))
                    .await
                    .map_err(PipelineError::SourceHost)?;
                Ok(SyncPoint {
                    git_ref: commit.sha.clone(),
                    sha: commit.sha,
                    version: None,
                    changelog: Some(commit.message),
                })
            }
        }
    }

    /// Record a step failure on the entry. Best-effort: a conflict or a
    /// concurrent archive must not panic the pipeline, so store errors are
    /// logged rather than propagated.
    async fn record_failure(&self, entry_id: Uuid, step: Step, reason: String) {
        let result = self
            .transition(entry_id, move |entry, now| match step {
                Step::Scan => entry.mark_scan_failed(reason.clone(), now),
                Step::Pin => entry.mark_pin_failed(reason.clone(), now),
            })
            .await;
        if let Err(err) = result {
            tracing::error!(
                entry_id = %entry_id,
                error = %err,
                "failed to record processing failure on entry"
            );
        }
    }

    /// Read → apply → compare-and-swap, retrying stale revisions.
    async fn transition<F>(&self, entry_id: Uuid, apply: F) -> Result<CatalogEntry, PipelineError>
    where
        F: Fn(&mut CatalogEntry, DateTime<Utc>) -> Result<(), EntryError>,
    {
        let mut attempt = 0;
        loop {
            let mut entry = self.catalog.get(entry_id).await?;
            apply(&mut entry, Utc::now())?;
            match self.catalog.update(&entry).await {
                Ok(stored) => return Ok(stored),
                Err(CatalogStoreError::Conflict { .. }) if attempt + 1 < MAX_CAS_ATTEMPTS => {
                    attempt += 1;
                    tracing::debug!(
                        entry_id = %entry_id,
                        attempt,
                        "stale revision during update, re-reading"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn with_timeout<T>(
        &self,
        operation: &str,
        fut: impl std::future::Future<Output = Result<T, RemoteError>>,
    ) -> Result<T, RemoteError> {
        match tokio::time::timeout(self.step_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout {
                operation: operation.to_string(),
                timeout: self.step_timeout,
            }),
        }
    }
}

/// Resolved upstream state for a sync.
#[derive(Debug, Clone)]
struct SyncPoint {
    /// Identifier recorded as `last_synced_commit_sha` and used in the
    /// storage path.
    sha: String,
    /// Ref passed to the zipball download.
    git_ref: String,
    /// Version parsed from the release tag, if any.
    version: Option<Version>,
    /// Changelog recorded on the superseded version's snapshot.
    changelog: Option<String>,
}

#[derive(Clone, Copy)]
enum Step {
    Scan,
    Pin,
}

/// Parse a version from a release tag, tolerating a leading `v`.
fn version_from_tag(tag: &str) -> Option<Version> {
    tag.trim_start_matches(['v', 'V']).parse().ok()
}

/// Last path segment of a storage path.
fn file_name_of(storage_path: &str) -> String {
    storage_path
        .rsplit('/')
        .next()
        .unwrap_or(storage_path)
        .to_string()
}

fn short_sha(sha: &str) -> &str {
    // Tags can stand in for the sha; `get` avoids slicing a multi-byte
    // character in one.
    sha.get(..8).unwrap_or(sha)
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_from_tag_tolerates_prefix() {
        assert_eq!(version_from_tag("v1.4.0"), Some(Version::new(1, 4, 0)));
        assert_eq!(version_from_tag("2.0.1"), Some(Version::new(2, 0, 1)));
        assert_eq!(version_from_tag("release-3"), None);
    }

    #[test]
    fn file_name_of_takes_last_segment() {
        assert_eq!(file_name_of("mvps/foo/versions/1.0.1/kit.zip"), "kit.zip");
        assert_eq!(file_name_of("kit.zip"), "kit.zip");
    }

    #[test]
    fn short_sha_truncates() {
        assert_eq!(short_sha("0123456789abcdef"), "01234567");
        assert_eq!(short_sha("abc"), "abc");
    }
}
