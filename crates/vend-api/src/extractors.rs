//! # Request Extraction & Validation
//!
//! The [`Validate`] trait for JSON request DTOs, plus the multipart form
//! reader for upload endpoints.
//!
//! ## Upload form layout
//!
//! | Part           | Content                         | Cardinality |
//! |----------------|---------------------------------|-------------|
//! | `metadata`     | JSON document                   | 0..1        |
//! | `archive`      | template archive file           | 0..1        |
//! | `image`        | preview image file              | 0..n        |
//! | `clear_images` | `"true"` to clear all previews  | 0..1        |
//!
//! Image semantics are tri-state: no `image` parts and no `clear_images`
//! flag leaves existing previews untouched; `clear_images` with no files
//! clears them; one or more `image` parts replaces them.

use axum::extract::multipart::Multipart;
use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde::de::DeserializeOwned;

use vend_ingest::UploadedFile;

use crate::error::AppError;

/// Trait for request types that can validate their business rules beyond
/// what serde deserialization checks.
pub trait Validate {
    /// Validate business rules. Returns an error message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to
/// [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and validate it using the [`Validate`] trait.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Parsed upload form.
#[derive(Debug, Default)]
pub struct UploadForm {
    /// The `metadata` part, parsed later into the operation's DTO.
    pub metadata: Option<serde_json::Value>,
    /// The `archive` part.
    pub archive: Option<UploadedFile>,
    /// Preview images: `None` = untouched, `Some([])` = cleared,
    /// `Some(files)` = replaced.
    pub images: Option<Vec<UploadedFile>>,
}

impl UploadForm {
    /// Parse the metadata part into a DTO, or the type's default when the
    /// part is absent.
    pub fn metadata_or_default<T: DeserializeOwned + Default>(&self) -> Result<T, AppError> {
        match &self.metadata {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| AppError::BadRequest(format!("invalid metadata: {e}"))),
            None => Ok(T::default()),
        }
    }

    /// Parse the metadata part into a DTO, failing when absent.
    pub fn required_metadata<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        let value = self
            .metadata
            .as_ref()
            .ok_or_else(|| AppError::BadRequest("missing metadata part".to_string()))?;
        serde_json::from_value(value.clone())
            .map_err(|e| AppError::BadRequest(format!("invalid metadata: {e}")))
    }

    /// The archive part, failing when absent.
    pub fn required_archive(self) -> Result<(UploadedFile, Option<Vec<UploadedFile>>), AppError> {
        let archive = self
            .archive
            .ok_or_else(|| AppError::BadRequest("missing archive part".to_string()))?;
        Ok((archive, self.images))
    }
}

/// Read a multipart upload form.
///
/// Unknown part names are skipped with a warning so form evolution does
/// not break older clients.
pub async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();
    let mut clear_images = false;
    let mut images: Vec<UploadedFile> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "metadata" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("unreadable metadata part: {e}")))?;
                let value = serde_json::from_str(&text)
                    .map_err(|e| AppError::BadRequest(format!("metadata is not JSON: {e}")))?;
                form.metadata = Some(value);
            }
            "archive" => {
                form.archive = Some(read_file_part(field, "archive").await?);
            }
            "image" => {
                images.push(read_file_part(field, "image").await?);
            }
            "clear_images" => {
                let text = field.text().await.unwrap_or_default();
                clear_images = text.trim().eq_ignore_ascii_case("true");
            }
            other => {
                tracing::warn!(part = %other, "skipping unknown multipart field");
            }
        }
    }

    // Tri-state image semantics: files win over the clear flag; the flag
    // alone produces an explicit empty replacement.
    form.images = if !images.is_empty() {
        Some(images)
    } else if clear_images {
        Some(Vec::new())
    } else {
        None
    };

    Ok(form)
}

async fn read_file_part(
    field: axum::extract::multipart::Field<'_>,
    part: &'static str,
) -> Result<UploadedFile, AppError> {
    let file_name = field
        .file_name()
        .map(|s| s.to_string())
        .ok_or_else(|| AppError::BadRequest(format!("{part} part has no file name")))?;
    let content_type = field
        .content_type()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(format!("unreadable {part} part: {e}")))?;
    Ok(UploadedFile {
        file_name,
        content_type,
        bytes: bytes.to_vec(),
    })
}
