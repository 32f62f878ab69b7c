//! # Upload Metadata Validation
//!
//! Pre-persistence checks for uploaded archives and preview images. All
//! checks run purely over declared metadata (name, byte length, content
//! type) — no content sniffing, no I/O — so a structurally invalid upload
//! is rejected before the pipeline touches any durable store.
//!
//! ## Limits
//!
//! | Input   | Size                    | Types                        |
//! |---------|-------------------------|------------------------------|
//! | Archive | 1 KiB – 100 MiB         | zip / gzip / tar / rar       |
//! | Image   | up to 10 MiB            | png / jpeg / webp / gif / svg|
//!
//! File names are limited to 255 characters and must not contain characters
//! that are unsafe inside storage paths.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum accepted archive size in bytes (inclusive).
pub const MIN_ARCHIVE_BYTES: u64 = 1024;

/// Maximum accepted archive size in bytes (inclusive).
pub const MAX_ARCHIVE_BYTES: u64 = 100 * 1024 * 1024;

/// Maximum accepted preview image size in bytes (inclusive).
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Maximum file name length in characters.
pub const MAX_NAME_CHARS: usize = 255;

/// Characters that must not appear in an uploaded file name.
pub const FORBIDDEN_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Declared archive content types accepted for upload.
const ARCHIVE_CONTENT_TYPES: &[&str] = &[
    "application/zip",
    "application/x-zip-compressed",
    "application/gzip",
    "application/x-gzip",
    "application/x-tar",
    "application/x-rar-compressed",
    "application/vnd.rar",
    "application/octet-stream",
];

/// Archive file name extensions accepted for upload.
const ARCHIVE_EXTENSIONS: &[&str] = &[".zip", ".tar.gz", ".rar", ".tgz"];

/// Declared image content types accepted for preview uploads.
const IMAGE_CONTENT_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/webp",
    "image/gif",
    "image/svg+xml",
];

/// Declared metadata of an uploaded file, as supplied by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadMetadata {
    /// Original file name, including extension.
    pub file_name: String,
    /// Declared size in bytes.
    pub byte_len: u64,
    /// Declared MIME content type.
    pub content_type: String,
}

/// Rejection reasons for an upload. Every variant renders a message
/// suitable for direct display to the uploader.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    /// Declared content type is not in the allow-list.
    #[error("unsupported content type {content_type:?} for {kind}")]
    UnsupportedType {
        /// The declared MIME type.
        content_type: String,
        /// "archive" or "image".
        kind: &'static str,
    },

    /// Archive name does not end with an accepted extension.
    #[error("file name {0:?} must end with one of .zip, .tar.gz, .rar, .tgz")]
    BadExtension(String),

    /// File is smaller than the minimum archive size.
    #[error("file is {actual} bytes, below the {minimum}-byte minimum")]
    TooSmall {
        /// Declared size.
        actual: u64,
        /// Inclusive lower bound.
        minimum: u64,
    },

    /// File exceeds the maximum size for its kind.
    #[error("file is {actual} bytes, above the {maximum}-byte maximum")]
    TooLarge {
        /// Declared size.
        actual: u64,
        /// Inclusive upper bound.
        maximum: u64,
    },

    /// File name contains a forbidden character.
    #[error("file name {name:?} contains forbidden character {character:?}")]
    ForbiddenCharacter {
        /// The offending name.
        name: String,
        /// The first forbidden character found.
        character: char,
    },

    /// File name is longer than 255 characters.
    #[error("file name is {0} characters, above the 255-character maximum")]
    NameTooLong(usize),

    /// File name is empty.
    #[error("file name must not be empty")]
    EmptyName,
}

/// Validate a template archive upload.
///
/// Checks, in order: content type allow-list, extension, name safety, then
/// size bounds (1 KiB – 100 MiB inclusive). The first failing check is
/// returned.
pub fn validate_archive(meta: &UploadMetadata) -> Result<(), UploadError> {
    if !ARCHIVE_CONTENT_TYPES.contains(&meta.content_type.as_str()) {
        return Err(UploadError::UnsupportedType {
            content_type: meta.content_type.clone(),
            kind: "archive",
        });
    }
    let lower = meta.file_name.to_lowercase();
    if !ARCHIVE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return Err(UploadError::BadExtension(meta.file_name.clone()));
    }
    // Name safety runs before the size bounds so a hostile name is always
    // reported as a name error, whatever the declared size.
    validate_name(&meta.file_name)?;
    if meta.byte_len < MIN_ARCHIVE_BYTES {
        return Err(UploadError::TooSmall {
            actual: meta.byte_len,
            minimum: MIN_ARCHIVE_BYTES,
        });
    }
    if meta.byte_len > MAX_ARCHIVE_BYTES {
        return Err(UploadError::TooLarge {
            actual: meta.byte_len,
            maximum: MAX_ARCHIVE_BYTES,
        });
    }
    Ok(())
}

/// Validate a preview image upload.
///
/// Images have no minimum size; the ceiling is 10 MiB. Name rules match
/// the archive rules.
pub fn validate_image(meta: &UploadMetadata) -> Result<(), UploadError> {
    if !IMAGE_CONTENT_TYPES.contains(&meta.content_type.as_str()) {
        return Err(UploadError::UnsupportedType {
            content_type: meta.content_type.clone(),
            kind: "image",
        });
    }
    validate_name(&meta.file_name)?;
    if meta.byte_len > MAX_IMAGE_BYTES {
        return Err(UploadError::TooLarge {
            actual: meta.byte_len,
            maximum: MAX_IMAGE_BYTES,
        });
    }
    Ok(())
}

/// Shared file name safety checks.
fn validate_name(name: &str) -> Result<(), UploadError> {
    if name.is_empty() {
        return Err(UploadError::EmptyName);
    }
    let chars = name.chars().count();
    if chars > MAX_NAME_CHARS {
        return Err(UploadError::NameTooLong(chars));
    }
    if let Some(character) = name.chars().find(|c| FORBIDDEN_NAME_CHARS.contains(c)) {
        return Err(UploadError::ForbiddenCharacter {
            name: name.to_string(),
            character,
        });
    }
    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────
