//! Source-host sync flows: release-driven and commit-driven republish,
//! idempotent re-sync, version resolution from tags, and the interaction
//! between synced and manually uploaded archives.

mod common;

use std::sync::atomic::Ordering;

use common::{archive_file, draft, linked_draft, Harness};
use uuid::Uuid;
use vend_catalog::{
    archive_storage_path, CatalogStore, EntryPatch, EntryStatus, VersionSubmission,
};
use vend_ingest::testing::{StubPinner, StubScanner, StubSourceHost};
use vend_ingest::{Bucket, PipelineError};

#[tokio::test]
async fn sync_requires_repository_linkage() {
    let h = Harness::new();
    let entry = h
        .pipeline
        .create_entry(
            Uuid::new_v4(),
            draft("Unlinked"),
            archive_file("kit.zip", 4096),
            vec![],
        )
        .await
        .unwrap();

    let err = h.pipeline.sync_from_source(entry.id).await.unwrap_err();
    assert!(matches!(err, PipelineError::NotLinked(id) if id == entry.id));
}

#[tokio::test]
async fn release_sync_installs_tag_version_and_synced_path() {
    let h = Harness::with(
        StubScanner::passing(),
        StubPinner::new(),
        StubSourceHost::with_release("v1.4.0", "deadbeefcafe0123"),
    );
    let entry = h
        .pipeline
        .create_entry(
            Uuid::new_v4(),
            linked_draft("Linked", "acme", "starter"),
            archive_file("kit.zip", 4096),
            vec![],
        )
        .await
        .unwrap();

    let outcome = h.pipeline.sync_from_source(entry.id).await.unwrap();
    assert!(outcome.updated);
    assert!(outcome.message.contains("1.4.0"));

    let after = h.catalog.get(entry.id).await.unwrap();
    assert_eq!(after.version_number.to_string(), "1.4.0");
    assert_eq!(
        after.last_synced_commit_sha.as_deref(),
        Some("deadbeefcafe0123")
    );
    assert_eq!(after.original_file_name.as_deref(), Some("source.zip"));
    assert_eq!(after.version_history.len(), 1);
    assert_eq!(after.status, EntryStatus::Approved);

    // The active archive lives under the synced path, and the derivation
    // re-produces it from entry state.
    let derived = archive_storage_path(&after).unwrap();
    assert!(derived.contains("/versions/github-deadbeefcafe0123/source.zip"));
    assert!(h.objects.stored(Bucket::Archives, &derived).is_some());
}

#[tokio::test]
async fn second_sync_with_no_upstream_change_is_a_noop() {
    let h = Harness::with(
        StubScanner::passing(),
        StubPinner::new(),
        StubSourceHost::with_release("v1.4.0", "deadbeefcafe0123"),
    );
    let entry = h
        .pipeline
        .create_entry(
            Uuid::new_v4(),
            linked_draft("Linked", "acme", "starter"),
            archive_file("kit.zip", 4096),
            vec![],
        )
        .await
        .unwrap();

    h.pipeline.sync_from_source(entry.id).await.unwrap();
    let first = h.catalog.get(entry.id).await.unwrap();
    let downloads_after_first = h.source.downloads.load(Ordering::Relaxed);

    let outcome = h.pipeline.sync_from_source(entry.id).await.unwrap();
    assert!(!outcome.updated);
    assert!(outcome.message.contains("already synced"));

    let second = h.catalog.get(entry.id).await.unwrap();
    assert_eq!(second.version_number, first.version_number);
    assert_eq!(second.content_hash, first.content_hash);
    assert_eq!(second.version_history.len(), first.version_history.len());
    assert_eq!(
        h.source.downloads.load(Ordering::Relaxed),
        downloads_after_first,
        "no zipball download on a no-op sync"
    );
}

#[tokio::test]
async fn commit_sync_bumps_patch_when_no_release_exists() {
    let h = Harness::with(
        StubScanner::passing(),
        StubPinner::new(),
        StubSourceHost::with_commit("0123abcd4567ef89", "Add billing module"),
    );
    let entry = h
        .pipeline
        .create_entry(
            Uuid::new_v4(),
            linked_draft("Linked", "acme", "starter"),
            archive_file("kit.zip", 4096),
            vec![],
        )
        .await
        .unwrap();

    h.pipeline.sync_from_source(entry.id).await.unwrap();

    let after = h.catalog.get(entry.id).await.unwrap();
    assert_eq!(after.version_number.to_string(), "1.0.1");
    assert_eq!(
        after.last_synced_commit_sha.as_deref(),
        Some("0123abcd4567ef89")
    );
    // The commit message becomes the superseded snapshot's changelog.
    assert_eq!(
        after.version_history[0].changelog.as_deref(),
        Some("Add billing module")
    );
}

#[tokio::test]
async fn stale_release_tag_falls_back_to_patch_bump() {
    // Upstream still tags v1.0.0 while the catalog is already at 2.0.0;
    // the tag cannot go backwards, so the sync bumps the patch.
    let h = Harness::with(
        StubScanner::passing(),
        StubPinner::new(),
        StubSourceHost::with_release("v1.0.0", "feedface01234567"),
    );
    let entry = h
        .pipeline
        .create_entry(
            Uuid::new_v4(),
            linked_draft("Linked", "acme", "starter"),
            archive_file("kit.zip", 4096),
            vec![],
        )
        .await
        .unwrap();
    h.pipeline
        .publish_version(
            entry.id,
            VersionSubmission {
                version_number: Some("2.0.0".parse().unwrap()),
                changelog: None,
                metadata: EntryPatch::default(),
            },
            archive_file("kit.zip", 4096),
            None,
        )
        .await
        .unwrap();

    h.pipeline.sync_from_source(entry.id).await.unwrap();
    let after = h.catalog.get(entry.id).await.unwrap();
    assert_eq!(after.version_number.to_string(), "2.0.1");
}

#[tokio::test]
async fn manual_republish_detaches_the_sync_marker() {
    let h = Harness::with(
        StubScanner::passing(),
        StubPinner::new(),
        StubSourceHost::with_release("v1.4.0", "deadbeefcafe0123"),
    );
    let entry = h
        .pipeline
        .create_entry(
            Uuid::new_v4(),
            linked_draft("Linked", "acme", "starter"),
            archive_file("kit.zip", 4096),
            vec![],
        )
        .await
        .unwrap();
    h.pipeline.sync_from_source(entry.id).await.unwrap();

    let after = h
        .pipeline
        .publish_version(
            entry.id,
            VersionSubmission {
                version_number: Some("2.0.0".parse().unwrap()),
                changelog: Some("manual release".to_string()),
                metadata: EntryPatch::default(),
            },
            archive_file("kit-2.zip", 4096),
            None,
        )
        .await
        .unwrap();

    assert!(after.last_synced_commit_sha.is_none());
    let derived = archive_storage_path(&after).unwrap();
    assert!(
        derived.contains("/versions/2.0.0/kit-2.zip"),
        "manual archives must not resolve to the synced path: {derived}"
    );
    assert!(h.objects.stored(Bucket::Archives, &derived).is_some());
}

#[tokio::test]
async fn sync_runs_the_processing_pipeline() {
    let h = Harness::with(
        StubScanner::rejecting("synced archive failed scan"),
        StubPinner::new(),
        StubSourceHost::with_release("v1.1.0", "0011223344556677"),
    );
    let entry = h
        .pipeline
        .create_entry(
            Uuid::new_v4(),
            linked_draft("Linked", "acme", "starter"),
            archive_file("kit.zip", 4096),
            vec![],
        )
        .await
        .unwrap();
    assert_eq!(entry.status, EntryStatus::ScanFailed);

    // Clear the failure by syncing with a passing scanner.
    h.scanner
        .set_behavior(vend_ingest::testing::ScanBehavior::Pass);
    h.pipeline.sync_from_source(entry.id).await.unwrap();

    let after = h.catalog.get(entry.id).await.unwrap();
    assert_eq!(after.status, EntryStatus::Approved);
    assert!(after.content_hash.as_deref().unwrap().starts_with("pin-"));
}
