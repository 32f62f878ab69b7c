//! # Catalog Store Interface
//!
//! Async store trait for catalog entries with revision-based optimistic
//! concurrency: every update carries the revision it was read at, and the
//! store rejects stale writers with a conflict instead of silently applying
//! last-writer-wins. The in-memory implementation backs tests and
//! database-less deployments.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;
use uuid::Uuid;

use crate::entry::CatalogEntry;

/// Errors from catalog store operations.
#[derive(Error, Debug)]
pub enum CatalogStoreError {
    /// No entry with the given id.
    #[error("entry {0} not found")]
    NotFound(Uuid),

    /// The update carried a stale revision; the caller should re-read and
    /// re-apply.
    #[error("stale revision {stale} for entry {id} (current {current})")]
    Conflict {
        /// The entry being updated.
        id: Uuid,
        /// The revision the writer read.
        stale: i64,
        /// The revision currently stored.
        current: i64,
    },

    /// An entry with this id already exists.
    #[error("entry {0} already exists")]
    Duplicate(Uuid),

    /// Backend failure (connection, serialization, ...).
    #[error("catalog backend error: {0}")]
    Backend(String),
}

/// Async interface to the relational catalog.
///
/// `update` is a compare-and-swap on the entry's `revision` field: the
/// stored row must still carry the revision the caller read, and the write
/// installs `revision + 1`. Implementations return the row as stored so
/// the caller continues with the bumped revision.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert a new entry. Fails on duplicate id.
    async fn insert(&self, entry: CatalogEntry) -> Result<CatalogEntry, CatalogStoreError>;

    /// Fetch an entry by id.
    async fn get(&self, id: Uuid) -> Result<CatalogEntry, CatalogStoreError>;

    /// Compare-and-swap update keyed on `entry.revision`.
    async fn update(&self, entry: &CatalogEntry) -> Result<CatalogEntry, CatalogStoreError>;

    /// List entries, newest first.
    async fn list(&self) -> Result<Vec<CatalogEntry>, CatalogStoreError>;

    /// Find the entry linked to a source repository, if any.
    async fn find_by_repo(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<CatalogEntry>, CatalogStoreError>;
}

/// In-memory catalog store.
///
/// The lock is `parking_lot`, not `tokio::sync`, because it is never held
/// across an `.await` point.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalogStore {
    entries: Arc<RwLock<HashMap<Uuid, CatalogEntry>>>,
}

impl MemoryCatalogStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn insert(&self, entry: CatalogEntry) -> Result<CatalogEntry, CatalogStoreError> {
        let mut guard = self.entries.write();
        if guard.contains_key(&entry.id) {
            return Err(CatalogStoreError::Duplicate(entry.id));
        }
        guard.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn get(&self, id: Uuid) -> Result<CatalogEntry, CatalogStoreError> {
        self.entries
            .read()
            .get(&id)
            .cloned()
            .ok_or(CatalogStoreError::NotFound(id))
    }

    async fn update(&self, entry: &CatalogEntry) -> Result<CatalogEntry, CatalogStoreError> {
        let mut guard = self.entries.write();
        let stored = guard
            .get_mut(&entry.id)
            .ok_or(CatalogStoreError::NotFound(entry.id))?;
        if stored.revision != entry.revision {
            return Err(CatalogStoreError::Conflict {
                id: entry.id,
                stale: entry.revision,
                current: stored.revision,
            });
        }
        let mut next = entry.clone();
        next.revision += 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn list(&self) -> Result<Vec<CatalogEntry>, CatalogStoreError> {
        let mut entries: Vec<CatalogEntry> = self.entries.read().values().cloned().collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    async fn find_by_repo(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<CatalogEntry>, CatalogStoreError> {
        Ok(self
            .entries
            .read()
            .values()
            .find(|e| {
                e.repo_owner.as_deref() == Some(owner) && e.repo_name.as_deref() == Some(name)
            })
            .cloned())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
