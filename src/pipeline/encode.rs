//! Image encoding: extracted image file → base64 payload wrapped in `ImageData`.
//!
//! Vision APIs accept images as base64 data embedded in the JSON request
//! body. The extracted bytes are sent as-is, never re-encoded, so the model
//! sees exactly what the author pasted into the document.

use crate::error::DescriptionError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use std::path::Path;
use tracing::debug;

/// MIME type for an extracted image, from its file extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        _ => "image/png",
    }
}

/// Read an image file and encode it for the vision model.
///
/// # Errors
/// [`DescriptionError::ReadFailed`] when the file is missing, unreadable or
/// empty.
pub async fn load_image(path: &Path) -> Result<ImageData, DescriptionError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| DescriptionError::ReadFailed {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
    if bytes.is_empty() {
        return Err(DescriptionError::ReadFailed {
            path: path.to_path_buf(),
            detail: "file is empty".to_string(),
        });
    }

    let b64 = STANDARD.encode(&bytes);
    debug!("Encoded {} → {} bytes base64", path.display(), b64.len());

    Ok(ImageData::new(b64, mime_for_path(path)))
}
