//! Error types for the edgequake-docx2md library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Docx2MdError`] is **fatal**: the document (or the whole batch) cannot
//!   proceed (bad input file, corrupt package, asset write failure, provider
//!   not configured). Returned as `Err(Docx2MdError)` from the `convert*`
//!   functions.
//!
//! * [`DescriptionError`] is **non-fatal**: a single image could not be
//!   described. The walker renders it as a fixed sentinel string in the
//!   Markdown and carries on with the next block.
//!
//! The seam errors ([`ModelError`], [`TranslationError`], [`DetectionError`])
//! are what the pluggable model, translator and detector return; the
//! enrichment client folds them into a [`DescriptionError`] or swallows them
//! (translation/detection degrade to the untranslated text).

use std::path::PathBuf;
use thiserror::Error;

/// Sentinel written in place of a description when the image file could not be read.
pub const READ_FAILURE_SENTINEL: &str = "[ERRO AO LER ARQUIVO DE IMAGEM]";

/// Sentinel written in place of a description when the model call failed.
pub const ANALYSIS_FAILURE_SENTINEL: &str = "[ERRO NA ANÁLISE DA IMAGEM]";

/// All fatal errors returned by the edgequake-docx2md library.
#[derive(Debug, Error)]
pub enum Docx2MdError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("DOCX file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a zip container.
    #[error("File is not a valid DOCX: '{path}'\nFirst bytes: {magic:?}")]
    NotADocx { path: PathBuf, magic: [u8; 4] },

    // ── Package errors ────────────────────────────────────────────────────
    /// The zip container or one of its XML parts cannot be parsed.
    #[error("DOCX '{path}' is corrupt: {detail}")]
    CorruptDocx { path: PathBuf, detail: String },

    /// A required part is absent from the package.
    #[error("DOCX '{path}' has no '{part}' part")]
    MissingPart { path: PathBuf, part: String },

    /// An extracted image could not be written to the temp directory.
    #[error("Failed to write image asset '{path}': {source}")]
    AssetWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider could not be initialised.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create, list or reset one of the working directories.
    #[error("Directory operation failed on '{path}': {source}")]
    DirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Docx2MdError {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, detail: impl ToString) -> Self {
        Self::CorruptDocx {
            path: path.into(),
            detail: detail.to_string(),
        }
    }
}

/// A non-fatal failure to describe a single image.
///
/// Rendered into the Markdown via [`DescriptionError::sentinel`] so that a
/// reviewer can grep the output for failed images.
#[derive(Debug, Clone, Error, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DescriptionError {
    /// The extracted image file could not be read back.
    #[error("could not read image '{path}': {detail}")]
    ReadFailed { path: PathBuf, detail: String },

    /// The vision model call failed.
    #[error("image analysis failed ({kind}): {detail}")]
    AnalysisFailed { kind: String, detail: String },

    /// The vision model call exceeded the configured timeout.
    #[error("image analysis timed out after {secs}s")]
    Timeout { secs: u64 },
}

impl DescriptionError {
    /// The fixed placeholder written to the Markdown for this failure.
    pub fn sentinel(&self) -> &'static str {
        match self {
            DescriptionError::ReadFailed { .. } => READ_FAILURE_SENTINEL,
            DescriptionError::AnalysisFailed { .. } | DescriptionError::Timeout { .. } => {
                ANALYSIS_FAILURE_SENTINEL
            }
        }
    }
}

/// Error returned by a [`crate::pipeline::describe::VisionModel`].
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// The provider rejected or failed the request.
    #[error("{0}")]
    Provider(String),

    /// The provider answered with an empty completion.
    #[error("model returned an empty response")]
    EmptyResponse,
}

impl ModelError {
    /// Short machine-readable kind, logged next to the message.
    pub fn kind(&self) -> &'static str {
        match self {
            ModelError::Provider(_) => "ProviderError",
            ModelError::EmptyResponse => "EmptyResponse",
        }
    }
}

/// Error returned by a [`crate::pipeline::language::Translator`].
#[derive(Debug, Clone, Error)]
pub enum TranslationError {
    #[error("translation request failed: {0}")]
    Request(String),

    #[error("translation service returned HTTP {0}")]
    Status(u16),

    #[error("unexpected translation response: {0}")]
    Malformed(String),

    #[error("translation service returned no text")]
    EmptyResponse,
}

/// Error returned by a [`crate::pipeline::language::LanguageDetector`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DetectionError {
    /// Text too short or too mixed to identify a language.
    #[error("no language could be detected reliably")]
    Ambiguous,

    /// The detector itself failed.
    #[error("language detection failed: {0}")]
    Failed(String),
}
