//! Progress-callback trait for per-document and per-image conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the batch walks each document. The library itself only emits
//! `tracing` records; the `docx2md` binary turns these callbacks into the
//! human-readable status lines.
//!
//! # Example
//!
//! ```rust
//! use edgequake_docx2md::{ConversionProgressCallback, ConversionConfig};
//! use std::path::Path;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     images: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_image_complete(&self, _doc: &Path, image_num: usize, total: usize, len: usize) {
//!         self.images.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("image {image_num}/{total} described ({len} chars)");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { images: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::{BatchReport, DocumentStats};
use std::path::Path;
use std::sync::Arc;

/// Called by the conversion pipeline as it processes documents and images.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Processing is sequential, but the trait is
/// `Send + Sync` so the config (and the callback inside it) can cross
/// `spawn_blocking` boundaries.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once after input discovery.
    ///
    /// # Arguments
    /// * `total_documents`: number of `.docx` files found (including ones
    ///   that will be skipped)
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called when a document is skipped because its output already exists.
    fn on_document_skipped(&self, input: &Path, output: &Path) {
        let _ = (input, output);
    }

    /// Called before a document is opened.
    ///
    /// # Arguments
    /// * `doc_num`: 1-indexed position in the batch
    fn on_document_start(&self, input: &Path, doc_num: usize, total_documents: usize) {
        let _ = (input, doc_num, total_documents);
    }

    /// Called just before an image is sent to the vision model.
    fn on_image_start(&self, input: &Path, image_num: usize, total_images: usize) {
        let _ = (input, image_num, total_images);
    }

    /// Called when an image was described.
    ///
    /// # Arguments
    /// * `description_len`: byte length of the final description
    fn on_image_complete(
        &self,
        input: &Path,
        image_num: usize,
        total_images: usize,
        description_len: usize,
    ) {
        let _ = (input, image_num, total_images, description_len);
    }

    /// Called when an image description degraded to a sentinel.
    fn on_image_error(&self, input: &Path, image_num: usize, total_images: usize, error: &str) {
        let _ = (input, image_num, total_images, error);
    }

    /// Called after a document's Markdown was written.
    fn on_document_complete(&self, input: &Path, output: &Path, stats: &DocumentStats) {
        let _ = (input, output, stats);
    }

    /// Called when a document failed fatally.
    fn on_document_error(&self, input: &Path, error: &str) {
        let _ = (input, error);
    }

    /// Called once after every document was attempted.
    fn on_batch_complete(&self, report: &BatchReport) {
        let _ = report;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
