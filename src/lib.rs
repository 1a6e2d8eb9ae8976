//! # edgequake-docx2md
//!
//! Convert Word (`.docx`) documents to Markdown, replacing every embedded
//! screenshot with a description written by a vision language model.
//!
//! ## Why this crate?
//!
//! Software manuals are mostly screenshots. Plain text converters drop them,
//! which leaves the Markdown useless for search, RAG indexing or screen
//! readers. This crate walks the document in order and asks a vision model
//! to read each image with the surrounding manual text as context, then
//! makes sure the answer ends up in the target language.
//!
//! ## Pipeline Overview
//!
//! ```text
//! .docx
//!  │
//!  ├─ 1. Input     discover files, check ZIP magic
//!  ├─ 2. Package   relationships, styles, body blocks (spawn_blocking)
//!  ├─ 3. Extract   embedded images → temp_image_<n>.<ext>
//!  ├─ 4. Walk      headings / paragraphs / image callouts, in order
//!  ├─ 5. Describe  one VLM call per image with preceding text as context
//!  ├─ 6. Language  detect, translate en → target when needed
//!  └─ 7. Output    <stem>.md, skipped on the next run
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_docx2md::{convert_directory, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Local Ollama with llava-phi3 by default
//!     let config = ConversionConfig::builder()
//!         .input_dir("input")
//!         .output_dir("output")
//!         .build()?;
//!     let report = convert_directory(&config).await?;
//!     eprintln!(
//!         "{} converted, {} skipped, {} failed",
//!         report.processed, report.skipped, report.failed
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Output Format
//!
//! Blocks are separated by a blank line. Headings of level 1–3 become
//! `#`–`###`, plain paragraphs are copied verbatim, and each image becomes
//!
//! ```text
//! > **[Descrição da Imagem]**: <description>
//! ```
//!
//! Images that cannot be read or described get a fixed sentinel
//! ([`READ_FAILURE_SENTINEL`], [`ANALYSIS_FAILURE_SENTINEL`]) so they can be
//! found with `grep` after a run.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docx2md` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-docx2md = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder};
pub use convert::{
    convert, convert_directory, convert_directory_sync, convert_to_file, inspect,
    resolve_vision_model,
};
pub use error::{
    DescriptionError, DetectionError, Docx2MdError, ModelError, TranslationError,
    ANALYSIS_FAILURE_SENTINEL, READ_FAILURE_SENTINEL,
};
pub use output::{
    BatchReport, ConversionOutput, DocumentMetadata, DocumentOutcome, DocumentReport,
    DocumentStats,
};
pub use pipeline::describe::{Description, ImageDescriber, ImageEnricher, LlmVisionModel, VisionModel};
pub use pipeline::extract::{extract_images, ImageAsset, RelationshipMap};
pub use pipeline::language::{
    normalize_language, GoogleTranslator, LanguageDetector, Translator, WhatlangDetector,
};
pub use pipeline::package::{Block, DocxDocument, DocxPackage};
pub use pipeline::walk::{walk_document, WalkOutput};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
