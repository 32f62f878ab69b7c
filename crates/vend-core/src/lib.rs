//! # vend-core — Foundational Types for the Vend Pipeline
//!
//! This crate is the bedrock of the Vend marketplace ingestion pipeline. It
//! defines the primitives every other crate in the workspace builds on, and
//! depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `Version`, `Slug`,
//!    `ContentDigest` — all newtypes with validated constructors. No bare
//!    strings for identifiers that carry structure.
//!
//! 2. **Validation before I/O.** `validate_archive()` and `validate_image()`
//!    run purely over declared upload metadata (name, size, content type) so
//!    structurally invalid inputs are rejected before any network or store
//!    round trip.
//!
//! 3. **Closed error enums.** Every rejection carries a human-readable
//!    message suitable for direct display; callers never see a raw panic.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `vend-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug`, `Clone`, and implement
//!   `Serialize`/`Deserialize` where they cross a boundary.

pub mod digest;
pub mod slug;
pub mod upload;
pub mod version;

// Re-export primary types for ergonomic imports.
pub use digest::ContentDigest;
pub use slug::Slug;
pub use upload::{validate_archive, validate_image, UploadError, UploadMetadata};
pub use version::{Version, VersionBump, VersionError};
