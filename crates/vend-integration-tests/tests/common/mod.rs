//! Shared harness for the pipeline integration tests: an in-memory catalog
//! plus instrumented doubles for every remote collaborator.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;

use vend_catalog::{AccessTier, CatalogStore, LicensingTerms, MemoryCatalogStore, NewEntry};
use vend_ingest::testing::{MemoryObjectStore, StubPinner, StubScanner, StubSourceHost};
use vend_ingest::{PublishPipeline, UploadedFile};

pub struct Harness {
    pub catalog: Arc<MemoryCatalogStore>,
    pub objects: Arc<MemoryObjectStore>,
    pub scanner: Arc<StubScanner>,
    pub pinner: Arc<StubPinner>,
    pub source: Arc<StubSourceHost>,
    pub pipeline: PublishPipeline,
}

impl Harness {
    /// Harness with a passing scanner, an accepting pinner, and a source
    /// host that serves a single commit.
    pub fn new() -> Self {
        Self::with(
            StubScanner::passing(),
            StubPinner::new(),
            StubSourceHost::with_commit("c0ffee00c0ffee00", "initial import"),
        )
    }

    pub fn with(scanner: StubScanner, pinner: StubPinner, source: StubSourceHost) -> Self {
        let catalog = Arc::new(MemoryCatalogStore::new());
        let objects = Arc::new(MemoryObjectStore::new());
        let scanner = Arc::new(scanner);
        let pinner = Arc::new(pinner);
        let source = Arc::new(source);
        let pipeline = PublishPipeline::new(
            catalog.clone() as Arc<dyn CatalogStore>,
            objects.clone(),
            scanner.clone(),
            pinner.clone(),
            source.clone(),
        );
        Self {
            catalog,
            objects,
            scanner,
            pinner,
            source,
            pipeline,
        }
    }
}

pub fn draft(title: &str) -> NewEntry {
    NewEntry {
        title: title.to_string(),
        tagline: Some("Ship your MVP this weekend".to_string()),
        description: None,
        features: vec!["auth".to_string(), "billing".to_string()],
        tech_stack: BTreeSet::from(["rust".to_string(), "postgres".to_string()]),
        category: Some("saas".to_string()),
        licensing: LicensingTerms::SingleUse,
        access_tier: AccessTier::Paid,
        price_usd: Some(79),
        version_number: None,
        repo_owner: None,
        repo_name: None,
        webhook_secret: None,
    }
}

pub fn linked_draft(title: &str, owner: &str, repo: &str) -> NewEntry {
    let mut d = draft(title);
    d.repo_owner = Some(owner.to_string());
    d.repo_name = Some(repo.to_string());
    d.webhook_secret = Some("hook-secret".to_string());
    d
}

pub fn archive_file(name: &str, byte_len: usize) -> UploadedFile {
    UploadedFile {
        file_name: name.to_string(),
        content_type: "application/zip".to_string(),
        bytes: vec![7u8; byte_len],
    }
}

pub fn image_file(name: &str) -> UploadedFile {
    UploadedFile {
        file_name: name.to_string(),
        content_type: "image/png".to_string(),
        bytes: vec![1u8; 512],
    }
}
