//! # vend-catalog — Catalog Records and the Publication State Machine
//!
//! The catalog is the single relational source of truth for sellable
//! template entries. This crate owns:
//!
//! - [`CatalogEntry`] — the record itself, with content pointers, version
//!   history, source-repository linkage, and presentation metadata.
//! - [`EntryStatus`] — the closed publication status enum. Every status
//!   write flows through validated transition methods on the entry; no
//!   consumer compares raw strings.
//! - [`archive_storage_path`] — the one authority for where an entry's
//!   active archive lives in the object store. Upload, retry, sync, and
//!   download signing all re-derive the path from entry state here.
//! - [`CatalogStore`] — the async store interface with revision-based
//!   optimistic concurrency, plus an in-memory implementation.
//!
//! ## Design Decision
//!
//! The status machine is an enum with a validated transition table rather
//! than typestates. Six states with admin overrides and a terminal archive
//! state would need six zero-sized types and conversions at every store
//! boundary; the enum keeps the table in one place and the store rows
//! directly deserializable, while `can_transition` still rejects every
//! illegal move at runtime.

pub mod entry;
pub mod metadata;
pub mod path;
pub mod status;
pub mod store;

pub use entry::{CatalogEntry, EntryError, VersionHistoryEntry};
pub use metadata::{AccessTier, EntryPatch, LicensingTerms, NewEntry, VersionSubmission};
pub use path::{archive_storage_path, preview_dir, PathError, ARCHIVE_ROOT};
pub use status::EntryStatus;
pub use store::{CatalogStore, CatalogStoreError, MemoryCatalogStore};
