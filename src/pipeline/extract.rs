//! Asset extraction: embedded images → files in a scoped temp directory.
//!
//! Extraction is eager: every image relationship of the document is written
//! out before the first model call, so the walker only ever does map
//! lookups. Blobs are written byte-for-byte; the format is only sniffed to
//! pick the file extension and the MIME type sent to the model.

use crate::error::Docx2MdError;
use crate::pipeline::package::{DocxPackage, Relationship};
use image::ImageFormat;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One extracted image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    /// 1-based position in the extraction pass.
    pub index: usize,
    pub relationship_id: String,
    /// `<scope>/temp_image_<index>.<extension>`.
    pub path: PathBuf,
    pub extension: &'static str,
    pub mime_type: &'static str,
    pub size: usize,
}

/// Relationship id → extracted image, for one document.
#[derive(Debug, Clone, Default)]
pub struct RelationshipMap {
    assets: HashMap<String, ImageAsset>,
}

impl RelationshipMap {
    pub fn get(&self, relationship_id: &str) -> Option<&ImageAsset> {
        self.assets.get(relationship_id)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Assets in extraction order.
    pub fn assets(&self) -> Vec<&ImageAsset> {
        let mut assets: Vec<&ImageAsset> = self.assets.values().collect();
        assets.sort_by_key(|a| a.index);
        assets
    }
}

/// File extension and MIME type for a blob, from its magic bytes.
///
/// Unknown or undecodable data falls back to PNG.
pub fn sniff_format(blob: &[u8]) -> (&'static str, &'static str) {
    match image::guess_format(blob) {
        Ok(ImageFormat::Png) => ("png", "image/png"),
        Ok(ImageFormat::Jpeg) => ("jpeg", "image/jpeg"),
        Ok(ImageFormat::Gif) => ("gif", "image/gif"),
        Ok(ImageFormat::Bmp) => ("bmp", "image/bmp"),
        Ok(ImageFormat::Tiff) => ("tiff", "image/tiff"),
        Ok(ImageFormat::WebP) => ("webp", "image/webp"),
        Ok(ImageFormat::Ico) => ("ico", "image/x-icon"),
        _ => ("png", "image/png"),
    }
}

/// Write every embedded image of the document into `scope_dir`.
///
/// `base_dir` is the directory of the main document part; relationship
/// targets resolve against it. The counter restarts at 1 on every call.
///
/// # Errors
/// A missing media part, a duplicate relationship id or a failed write is
/// fatal for the document.
pub fn extract_images(
    package: &mut DocxPackage,
    relationships: &[Relationship],
    base_dir: &str,
    scope_dir: &Path,
) -> Result<RelationshipMap, Docx2MdError> {
    let mut map = RelationshipMap::default();
    let mut counter = 0usize;

    for rel in relationships.iter().filter(|r| r.is_image()) {
        if rel.external {
            warn!(
                "Image relationship '{}' links an external target ({}); not embedded, skipped",
                rel.id, rel.target
            );
            continue;
        }
        if map.assets.contains_key(&rel.id) {
            return Err(Docx2MdError::corrupt(
                package.path(),
                format!("duplicate relationship id '{}'", rel.id),
            ));
        }

        let part = rel.part_name(base_dir);
        let blob = package.read_required(&part)?;

        counter += 1;
        let (extension, mime_type) = sniff_format(&blob);
        let path = scope_dir.join(format!("temp_image_{counter}.{extension}"));
        std::fs::write(&path, &blob).map_err(|e| Docx2MdError::AssetWriteFailed {
            path: path.clone(),
            source: e,
        })?;
        debug!(
            "Extracted {} ({}) → {} ({} bytes)",
            rel.id,
            part,
            path.display(),
            blob.len()
        );

        map.assets.insert(
            rel.id.clone(),
            ImageAsset {
                index: counter,
                relationship_id: rel.id.clone(),
                path,
                extension,
                mime_type,
                size: blob.len(),
            },
        );
    }

    Ok(map)
}
