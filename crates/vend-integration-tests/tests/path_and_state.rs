//! Path determinism across the pipeline operations, the exhaustive status
//! transition matrix, and optimistic-concurrency conflict behavior.

mod common;

use common::{archive_file, draft, Harness};
use uuid::Uuid;
use vend_catalog::{archive_storage_path, CatalogStore, EntryStatus, MemoryCatalogStore};

// ── Path determinism ─────────────────────────────────────────────────

#[tokio::test]
async fn derived_path_matches_stored_blob_after_every_operation() {
    let h = Harness::new();
    let entry = h
        .pipeline
        .create_entry(
            Uuid::new_v4(),
            draft("Kit"),
            archive_file("kit.zip", 4096),
            vec![],
        )
        .await
        .unwrap();

    // After create: flat initial path.
    let after_create = h.catalog.get(entry.id).await.unwrap();
    let path = archive_storage_path(&after_create).unwrap();
    assert!(path.ends_with("/kit.zip"));
    assert!(!path.contains("/versions/"));
    assert!(h.objects.stored(vend_ingest::Bucket::Archives, &path).is_some());

    // After a republish: versioned path, blob present at the derivation.
    h.pipeline
        .publish_version(
            entry.id,
            Default::default(),
            archive_file("kit.zip", 4096),
            None,
        )
        .await
        .unwrap();
    let after_publish = h.catalog.get(entry.id).await.unwrap();
    let path = archive_storage_path(&after_publish).unwrap();
    assert!(path.contains("/versions/1.0.1/kit.zip"));
    assert!(h.objects.stored(vend_ingest::Bucket::Archives, &path).is_some());

    // The signed download URL uses the same derivation.
    let url = h.pipeline.signed_download_url(entry.id, 300).await.unwrap();
    assert!(url.contains("/versions/1.0.1/kit.zip"), "{url}");
}

#[tokio::test]
async fn signed_download_url_fails_cleanly_for_unknown_entry() {
    let h = Harness::new();
    assert!(h
        .pipeline
        .signed_download_url(Uuid::new_v4(), 300)
        .await
        .is_err());
}

// ── Status transition matrix ─────────────────────────────────────────

const ALL_STATUSES: [EntryStatus; 6] = [
    EntryStatus::PendingReview,
    EntryStatus::ScanFailed,
    EntryStatus::Approved,
    EntryStatus::Rejected,
    EntryStatus::Archived,
    EntryStatus::PinFailed,
];

#[test]
fn status_transition_matrix_exhaustive() {
    // Expected valid transitions:
    // PendingReview → PendingReview, ScanFailed, PinFailed, Approved, Rejected, Archived
    // ScanFailed    → PendingReview, Archived
    // PinFailed     → PendingReview, Archived
    // Approved      → PendingReview, Rejected, Archived
    // Rejected      → PendingReview, Archived
    // Archived      → (none)
    use EntryStatus::*;
    let expected_valid: Vec<(EntryStatus, EntryStatus)> = vec![
        (PendingReview, PendingReview),
        (PendingReview, ScanFailed),
        (PendingReview, PinFailed),
        (PendingReview, Approved),
        (PendingReview, Rejected),
        (PendingReview, Archived),
        (ScanFailed, PendingReview),
        (ScanFailed, Archived),
        (PinFailed, PendingReview),
        (PinFailed, Archived),
        (Approved, PendingReview),
        (Approved, Rejected),
        (Approved, Archived),
        (Rejected, PendingReview),
        (Rejected, Archived),
    ];

    for from in ALL_STATUSES {
        for to in ALL_STATUSES {
            let actual = from.can_transition(to);
            let expected = expected_valid.contains(&(from, to));
            assert_eq!(
                actual, expected,
                "transition {from} -> {to}: expected valid={expected}, got valid={actual}"
            );
        }
    }
}

#[test]
fn automatic_terminals_from_pending_are_exactly_three() {
    // From pending_review, the pipeline alone (no admin action) can reach
    // scan_failed, ipfs_pin_failed, or approved.
    let automatic = [
        EntryStatus::ScanFailed,
        EntryStatus::PinFailed,
        EntryStatus::Approved,
    ];
    for status in automatic {
        assert!(EntryStatus::PendingReview.can_transition(status));
    }
    // And both failure states route back through pending_review on retry.
    assert!(EntryStatus::ScanFailed.can_transition(EntryStatus::PendingReview));
    assert!(EntryStatus::PinFailed.can_transition(EntryStatus::PendingReview));
}

// ── Optimistic concurrency ───────────────────────────────────────────

#[tokio::test]
async fn stale_writer_gets_a_conflict() {
    let h = Harness::new();
    let entry = h
        .pipeline
        .create_entry(
            Uuid::new_v4(),
            draft("Kit"),
            archive_file("kit.zip", 4096),
            vec![],
        )
        .await
        .unwrap();

    let store: &MemoryCatalogStore = &h.catalog;
    let mut first = store.get(entry.id).await.unwrap();
    let mut second = store.get(entry.id).await.unwrap();

    first.title = "First writer".to_string();
    store.update(&first).await.unwrap();

    second.title = "Second writer".to_string();
    let err = store.update(&second).await.unwrap_err();
    assert!(matches!(
        err,
        vend_catalog::CatalogStoreError::Conflict { .. }
    ));

    let stored = store.get(entry.id).await.unwrap();
    assert_eq!(stored.title, "First writer");
}

#[tokio::test]
async fn pipeline_transitions_survive_interleaved_writers() {
    // The pipeline's read-apply-CAS loop re-reads on conflict, so a
    // metadata write landing between a failure and its retry does not lose
    // either update.
    let h = Harness::with(
        vend_ingest::testing::StubScanner::rejecting("first pass fails"),
        vend_ingest::testing::StubPinner::new(),
        vend_ingest::testing::StubSourceHost::with_commit("aa", "x"),
    );
    let entry = h
        .pipeline
        .create_entry(
            Uuid::new_v4(),
            draft("Kit"),
            archive_file("kit.zip", 4096),
            vec![],
        )
        .await
        .unwrap();
    assert_eq!(entry.status, EntryStatus::ScanFailed);

    // A concurrent metadata edit bumps the revision.
    let mut edited = h.catalog.get(entry.id).await.unwrap();
    edited.tagline = Some("Edited concurrently".to_string());
    h.catalog.update(&edited).await.unwrap();

    // Retry still succeeds and keeps the concurrent edit.
    h.scanner
        .set_behavior(vend_ingest::testing::ScanBehavior::Pass);
    h.pipeline.retry_processing(entry.id).await.unwrap();

    let after = h.catalog.get(entry.id).await.unwrap();
    assert_eq!(after.status, EntryStatus::Approved);
    assert_eq!(after.tagline.as_deref(), Some("Edited concurrently"));
}
