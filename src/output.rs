//! Result types returned by the conversion entry points.
//!
//! Everything here is `Serialize` so the CLI can dump a run as JSON
//! (`docx2md --json`) for scripting and post-run audits.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Structural summary of a document, available without calling any model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Source file.
    pub path: PathBuf,
    /// Body blocks after classification (empty paragraphs included).
    pub blocks: usize,
    /// Headings of level 1–3.
    pub headings: usize,
    /// Non-empty plain paragraphs.
    pub paragraphs: usize,
    /// Paragraphs that reference an embedded image.
    pub image_refs: usize,
    /// Image relationships declared by the package.
    pub image_relationships: usize,
}

/// Per-document counters collected while walking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStats {
    /// Markdown entries emitted (headings + paragraphs + callouts).
    pub entries: usize,
    pub headings: usize,
    pub paragraphs: usize,
    /// Image callouts emitted.
    pub images: usize,
    /// Images described successfully.
    pub images_described: usize,
    /// Images replaced by a failure sentinel.
    pub images_failed: usize,
    /// Wall-clock time for the whole document, in milliseconds.
    pub duration_ms: u64,
}

/// Complete output of a single-document conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// The assembled Markdown document.
    pub markdown: String,
    pub metadata: DocumentMetadata,
    pub stats: DocumentStats,
}

/// What happened to one input of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentOutcome {
    /// Markdown written.
    Converted { stats: DocumentStats },
    /// Output already existed; nothing was done.
    Skipped,
    /// A fatal error stopped this document.
    Failed { error: String },
}

/// Per-input entry of a [`BatchReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReport {
    pub input: PathBuf,
    pub output: PathBuf,
    #[serde(flatten)]
    pub outcome: DocumentOutcome,
}

/// Summary of a whole batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// `.docx` files found in the input directory.
    pub discovered: usize,
    /// Documents converted in this run.
    pub processed: usize,
    /// Documents skipped because their output already existed.
    pub skipped: usize,
    /// Documents that failed.
    pub failed: usize,
    /// Per-document outcomes, in processing order.
    pub documents: Vec<DocumentReport>,
    pub total_duration_ms: u64,
}

impl BatchReport {
    /// True when at least one document failed.
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub(crate) fn record(&mut self, report: DocumentReport) {
        match report.outcome {
            DocumentOutcome::Converted { .. } => self.processed += 1,
            DocumentOutcome::Skipped => self.skipped += 1,
            DocumentOutcome::Failed { .. } => self.failed += 1,
        }
        self.documents.push(report);
    }
}
