//! # Catalog Entry Records
//!
//! [`CatalogEntry`] is the relational record for one sellable template.
//! All status changes and version bookkeeping flow through methods here so
//! the invariants hold at every call site:
//!
//! - `version_number` strictly increases on every republish.
//! - `version_history` is append-only, newest-superseded-first, and one
//!   entry long per prior publication.
//! - `status` only moves along the transition table in [`EntryStatus`].
//! - Entries are never deleted; an owner delete is a transition to
//!   `archived`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use uuid::Uuid;

use vend_core::{Slug, Version};

use crate::metadata::{AccessTier, EntryPatch, LicensingTerms, NewEntry};
use crate::status::EntryStatus;

/// Immutable snapshot of a superseded version.
///
/// Created exactly once per version transition and never mutated after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionHistoryEntry {
    /// The superseded version.
    pub version_number: Version,
    /// The content reference that was live immediately before the overwrite.
    pub content_hash: Option<String>,
    /// Changelog supplied with the release that superseded this version.
    pub changelog: Option<String>,
    /// When the superseded version was uploaded.
    pub uploaded_at: DateTime<Utc>,
    /// Archive size of the superseded version.
    pub file_size: Option<u64>,
}

/// Errors from catalog entry mutations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    /// The attempted status transition is not in the table.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: EntryStatus,
        /// Attempted target status.
        to: EntryStatus,
    },

    /// A republish proposed a version that does not exceed the current one.
    #[error("version {proposed} does not exceed current version {current}")]
    VersionNotIncreasing {
        /// Version currently on the entry.
        current: Version,
        /// Version the caller proposed.
        proposed: Version,
    },

    /// The operation is not available on an archived entry.
    #[error("entry {0} is archived")]
    EntryArchived(Uuid),
}

/// The catalog record for one sellable template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Opaque identity.
    pub id: Uuid,
    /// The seller that owns this entry. Only the owner (or an admin)
    /// mutates the entry through the pipeline operations.
    pub seller_id: Uuid,
    /// Human slug used in storage paths; derived once at creation.
    pub slug: Slug,

    // -- Presentation metadata --
    pub title: String,
    pub tagline: Option<String>,
    pub description: Option<String>,
    pub features: Vec<String>,
    pub tech_stack: BTreeSet<String>,
    pub category: Option<String>,
    pub preview_image_urls: Vec<String>,
    pub licensing: LicensingTerms,
    pub access_tier: AccessTier,
    pub price_usd: Option<u32>,

    // -- Versioning --
    /// Current version. Strictly increases on every republish.
    pub version_number: Version,
    /// Superseded versions, newest first.
    pub version_history: Vec<VersionHistoryEntry>,

    // -- Content pointers --
    /// Reference to the currently published archive: the storage-time
    /// SHA-256 until the pin step replaces it with the pinned identifier.
    pub content_hash: Option<String>,
    /// The reference that was live before the last overwrite.
    pub previous_content_hash: Option<String>,
    pub original_file_name: Option<String>,
    pub file_size: Option<u64>,

    // -- Publication status --
    pub status: EntryStatus,
    /// Human-readable failure detail from the last pipeline attempt;
    /// cleared on retry and on success.
    pub last_processing_error: Option<String>,

    // -- Source repository linkage (optional) --
    pub repo_owner: Option<String>,
    pub repo_name: Option<String>,
    pub webhook_secret: Option<String>,
    pub last_synced_commit_sha: Option<String>,

    // -- Read-only counters (maintained outside the pipeline) --
    pub download_count: u64,
    pub average_rating: Option<f32>,

    // -- Timestamps --
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,

    /// Optimistic-concurrency counter. The store rejects updates carrying
    /// a stale revision with a conflict.
    pub revision: i64,
}

impl CatalogEntry {
    /// Create a new entry in `pending_review` from a draft.
    ///
    /// The slug is derived from the title and the creation instant, which
    /// makes it unique without a store lookup.
    pub fn new(seller_id: Uuid, draft: NewEntry, at: DateTime<Utc>) -> CatalogEntry {
        CatalogEntry {
            id: Uuid::new_v4(),
            seller_id,
            slug: Slug::generate(&draft.title, at),
            title: draft.title,
            tagline: draft.tagline,
            description: draft.description,
            features: draft.features,
            tech_stack: draft.tech_stack,
            category: draft.category,
            preview_image_urls: Vec::new(),
            licensing: draft.licensing,
            access_tier: draft.access_tier,
            price_usd: draft.price_usd,
            version_number: draft.version_number.unwrap_or(Version::V1),
            version_history: Vec::new(),
            content_hash: None,
            previous_content_hash: None,
            original_file_name: None,
            file_size: None,
            status: EntryStatus::PendingReview,
            last_processing_error: None,
            repo_owner: draft.repo_owner,
            repo_name: draft.repo_name,
            webhook_secret: draft.webhook_secret,
            last_synced_commit_sha: None,
            download_count: 0,
            average_rating: None,
            created_at: at,
            updated_at: at,
            published_at: None,
            revision: 0,
        }
    }

    /// Install the first archive after the initial store.
    ///
    /// Only meaningful on a freshly created entry; does not touch history.
    pub fn attach_initial_archive(
        &mut self,
        content_hash: String,
        file_name: String,
        file_size: u64,
        at: DateTime<Utc>,
    ) {
        self.content_hash = Some(content_hash);
        self.original_file_name = Some(file_name);
        self.file_size = Some(file_size);
        self.updated_at = at;
    }

    /// Build the history snapshot of the about-to-be-superseded version.
    ///
    /// `uploaded_at` records when the superseded version itself arrived,
    /// which is the entry's last update instant.
    pub fn snapshot(&self, changelog: Option<String>) -> VersionHistoryEntry {
        VersionHistoryEntry {
            version_number: self.version_number,
            content_hash: self.content_hash.clone(),
            changelog,
            uploaded_at: self.updated_at,
            file_size: self.file_size,
        }
    }

    /// Supersede the current version with a new release.
    ///
    /// Prepends the snapshot of the current version (newest-superseded
    /// first), moves the live content reference into
    /// `previous_content_hash`, installs the new version and content
    /// fields, and re-enters review. The proposed version must strictly
    /// exceed the current one.
    ///
    /// The source-sync marker is cleared so path derivation follows the
    /// newly stored archive; a sync re-sets it after superseding.
    pub fn supersede(
        &mut self,
        version: Version,
        content_hash: String,
        file_name: String,
        file_size: u64,
        changelog: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), EntryError> {
        self.require_transition(EntryStatus::PendingReview)?;
        if version <= self.version_number {
            return Err(EntryError::VersionNotIncreasing {
                current: self.version_number,
                proposed: version,
            });
        }

        let snapshot = self.snapshot(changelog);
        self.version_history.insert(0, snapshot);

        self.previous_content_hash = self.content_hash.take();
        self.content_hash = Some(content_hash);
        self.original_file_name = Some(file_name);
        self.file_size = Some(file_size);
        self.version_number = version;
        self.last_synced_commit_sha = None;
        self.status = EntryStatus::PendingReview;
        self.last_processing_error = None;
        self.updated_at = at;
        Ok(())
    }

    /// Replace the archive without a version bump.
    ///
    /// This is the correction path: content pointers move exactly as in a
    /// release, but no history snapshot is pushed and the status is left
    /// alone. Not available on archived entries.
    pub fn replace_archive(
        &mut self,
        content_hash: String,
        file_name: String,
        file_size: u64,
        at: DateTime<Utc>,
    ) -> Result<(), EntryError> {
        if self.status.is_terminal() {
            return Err(EntryError::EntryArchived(self.id));
        }
        self.previous_content_hash = self.content_hash.take();
        self.content_hash = Some(content_hash);
        self.original_file_name = Some(file_name);
        self.file_size = Some(file_size);
        self.updated_at = at;
        Ok(())
    }

    /// Apply a metadata patch. `None` fields are left unchanged.
    pub fn apply_patch(&mut self, patch: EntryPatch, at: DateTime<Utc>) -> Result<(), EntryError> {
        if self.status.is_terminal() {
            return Err(EntryError::EntryArchived(self.id));
        }
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(tagline) = patch.tagline {
            self.tagline = Some(tagline);
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(features) = patch.features {
            self.features = features;
        }
        if let Some(tech_stack) = patch.tech_stack {
            self.tech_stack = tech_stack;
        }
        if let Some(category) = patch.category {
            self.category = Some(category);
        }
        if let Some(licensing) = patch.licensing {
            self.licensing = licensing;
        }
        if let Some(access_tier) = patch.access_tier {
            self.access_tier = access_tier;
        }
        if let Some(price_usd) = patch.price_usd {
            self.price_usd = Some(price_usd);
        }
        if let Some(repo_owner) = patch.repo_owner {
            self.repo_owner = Some(repo_owner);
        }
        if let Some(repo_name) = patch.repo_name {
            self.repo_name = Some(repo_name);
        }
        if let Some(webhook_secret) = patch.webhook_secret {
            self.webhook_secret = Some(webhook_secret);
        }
        self.updated_at = at;
        Ok(())
    }

    /// Record a failed security scan.
    pub fn mark_scan_failed(&mut self, reason: String, at: DateTime<Utc>) -> Result<(), EntryError> {
        self.require_transition(EntryStatus::ScanFailed)?;
        self.status = EntryStatus::ScanFailed;
        self.last_processing_error = Some(reason);
        self.updated_at = at;
        Ok(())
    }

    /// Record a failed pin step, or any unexpected pipeline failure.
    pub fn mark_pin_failed(&mut self, reason: String, at: DateTime<Utc>) -> Result<(), EntryError> {
        self.require_transition(EntryStatus::PinFailed)?;
        self.status = EntryStatus::PinFailed;
        self.last_processing_error = Some(reason);
        self.updated_at = at;
        Ok(())
    }

    /// Record a successful pin: the pinned identifier becomes the live
    /// content reference and the entry goes public.
    pub fn approve(&mut self, pinned_identifier: String, at: DateTime<Utc>) -> Result<(), EntryError> {
        self.require_transition(EntryStatus::Approved)?;
        self.content_hash = Some(pinned_identifier);
        self.status = EntryStatus::Approved;
        self.last_processing_error = None;
        self.published_at = Some(at);
        self.updated_at = at;
        Ok(())
    }

    /// Re-enter review for a retry. Only legal from the failure states.
    pub fn reenter_review(&mut self, at: DateTime<Utc>) -> Result<(), EntryError> {
        if !self.status.is_retryable_failure() {
            return Err(EntryError::InvalidTransition {
                from: self.status,
                to: EntryStatus::PendingReview,
            });
        }
        self.status = EntryStatus::PendingReview;
        self.last_processing_error = None;
        self.updated_at = at;
        Ok(())
    }

    /// Manual review decision by an admin.
    pub fn admin_review(&mut self, approve: bool, at: DateTime<Utc>) -> Result<(), EntryError> {
        let target = if approve {
            EntryStatus::Approved
        } else {
            EntryStatus::Rejected
        };
        // Manual approval is only meaningful on a pending entry; rejection
        // also applies to an already-approved one.
        if approve && self.status != EntryStatus::PendingReview {
            return Err(EntryError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }
        self.require_transition(target)?;
        self.status = target;
        if approve {
            self.published_at = Some(at);
        }
        self.updated_at = at;
        Ok(())
    }

    /// Owner delete: transition to the terminal `archived` status.
    pub fn archive(&mut self, at: DateTime<Utc>) -> Result<(), EntryError> {
        self.require_transition(EntryStatus::Archived)?;
        self.status = EntryStatus::Archived;
        self.updated_at = at;
        Ok(())
    }

    /// Whether the entry is linked to a source repository.
    pub fn is_repo_linked(&self) -> bool {
        self.repo_owner.is_some() && self.repo_name.is_some()
    }

    fn require_transition(&self, to: EntryStatus) -> Result<(), EntryError> {
        if self.status.can_transition(to) {
            Ok(())
        } else {
            Err(EntryError::InvalidTransition {
                from: self.status,
                to,
            })
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
