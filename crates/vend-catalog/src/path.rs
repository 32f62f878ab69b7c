//! # Storage Path Derivation
//!
//! The object-store key for an entry's active archive is never persisted —
//! it is re-derived from entry state wherever it is needed (upload, retry,
//! sync, download signing), so the entry's fields are the single source of
//! truth and the derivation must stay byte-for-byte stable.
//!
//! ## Layout
//!
//! ```text
//! mvps/{slug}/{file_name}                                first publish (1.0.0, no prior hash)
//! mvps/{slug}/versions/{version}/{file_name}             subsequent versions
//! mvps/{slug}/versions/github-{sha}/source.zip           source-host synced archives
//! mvps/{slug}/previews/{file_name}                       preview images (public bucket)
//! ```
//!
//! Selection priority: source-host sync marker, then initial-version form,
//! then the versioned form.

use thiserror::Error;
use uuid::Uuid;

use vend_core::Slug;

use crate::entry::CatalogEntry;

/// Root prefix for all entry content in both buckets.
pub const ARCHIVE_ROOT: &str = "mvps";

/// Errors from path derivation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The entry has no recorded archive file name, so a non-synced path
    /// cannot be formed.
    #[error("entry {0} has no recorded archive file name")]
    MissingFileName(Uuid),
}

/// Derive the object-store path of the entry's active archive.
///
/// Priority order:
/// 1. entries with a `last_synced_commit_sha` use the source-host form;
/// 2. an unsuperseded `1.0.0` entry uses the initial form;
/// 3. everything else uses the versioned form.
pub fn archive_storage_path(entry: &CatalogEntry) -> Result<String, PathError> {
    if let Some(sha) = &entry.last_synced_commit_sha {
        return Ok(format!(
            "{ARCHIVE_ROOT}/{}/versions/github-{sha}/source.zip",
            entry.slug
        ));
    }

    let file_name = entry
        .original_file_name
        .as_deref()
        .ok_or(PathError::MissingFileName(entry.id))?;

    if entry.version_number.is_initial() && entry.previous_content_hash.is_none() {
        Ok(format!("{ARCHIVE_ROOT}/{}/{file_name}", entry.slug))
    } else {
        Ok(format!(
            "{ARCHIVE_ROOT}/{}/versions/{}/{file_name}",
            entry.slug, entry.version_number
        ))
    }
}

/// Directory for an entry's preview images in the public bucket.
pub fn preview_dir(slug: &Slug) -> String {
    format!("{ARCHIVE_ROOT}/{slug}/previews")
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{AccessTier, LicensingTerms, NewEntry};
    use chrono::TimeZone;

    fn entry() -> CatalogEntry {
        let draft = NewEntry {
            title: "Foo".to_string(),
            tagline: None,
            description: None,
            features: vec![],
            tech_stack: Default::default(),
            category: None,
            licensing: LicensingTerms::SingleUse,
            access_tier: AccessTier::Free,
            price_usd: None,
            version_number: None,
            repo_owner: None,
            repo_name: None,
            webhook_secret: None,
        };
        let at = chrono::Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let mut e = CatalogEntry::new(uuid::Uuid::new_v4(), draft, at);
        e.slug = "foo-abc123".parse().unwrap();
        e.original_file_name = Some("starter.zip".to_string());
        e
    }

    #[test]
    fn initial_version_uses_flat_path() {
        let e = entry();
        assert_eq!(
            archive_storage_path(&e).unwrap(),
            "mvps/foo-abc123/starter.zip"
        );
    }

    #[test]
    fn superseded_entry_uses_versioned_path() {
        let mut e = entry();
        e.version_number = "1.2.0".parse().unwrap();
        e.previous_content_hash = Some("old".to_string());
        assert_eq!(
            archive_storage_path(&e).unwrap(),
            "mvps/foo-abc123/versions/1.2.0/starter.zip"
        );
    }

    #[test]
    fn republished_initial_version_uses_versioned_path() {
        // A 1.0.0 entry that has a previous hash was overwritten in place;
        // it no longer qualifies for the flat form.
        let mut e = entry();
        e.previous_content_hash = Some("old".to_string());
        assert_eq!(
            archive_storage_path(&e).unwrap(),
            "mvps/foo-abc123/versions/1.0.0/starter.zip"
        );
    }

    #[test]
    fn sync_marker_takes_priority() {
        let mut e = entry();
        e.version_number = "2.0.0".parse().unwrap();
        e.previous_content_hash = Some("old".to_string());
        e.last_synced_commit_sha = Some("0123abcd".to_string());
        assert_eq!(
            archive_storage_path(&e).unwrap(),
            "mvps/foo-abc123/versions/github-0123abcd/source.zip"
        );
    }

    #[test]
    fn sync_marker_ignores_missing_file_name() {
        let mut e = entry();
        e.original_file_name = None;
        e.last_synced_commit_sha = Some("0123abcd".to_string());
        assert!(archive_storage_path(&e).is_ok());
    }

    #[test]
    fn missing_file_name_is_an_error() {
        let mut e = entry();
        e.original_file_name = None;
        assert_eq!(
            archive_storage_path(&e).unwrap_err(),
            PathError::MissingFileName(e.id)
        );
    }

    #[test]
    fn derivation_is_stable() {
        let e = entry();
        let first = archive_storage_path(&e).unwrap();
        for _ in 0..10 {
            assert_eq!(archive_storage_path(&e).unwrap(), first);
        }
    }

    #[test]
    fn preview_dir_layout() {
        let slug: Slug = "foo-abc123".parse().unwrap();
        assert_eq!(preview_dir(&slug), "mvps/foo-abc123/previews");
    }
}
