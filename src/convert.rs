//! Conversion entry points: single document and whole directory.
//!
//! ## Why one document at a time?
//!
//! Every image costs one vision-model call, and the default backend is a
//! local model that serves one request at a time anyway. Processing strictly
//! in order keeps memory flat, keeps the logs readable, and makes the batch
//! resumable: a document either has its finished `.md` or it does not.

use crate::config::ConversionConfig;
use crate::error::Docx2MdError;
use crate::output::{
    BatchReport, ConversionOutput, DocumentMetadata, DocumentOutcome, DocumentReport,
    DocumentStats,
};
use crate::pipeline::describe::{ImageDescriber, ImageEnricher, LlmVisionModel, VisionModel};
use crate::pipeline::extract::{extract_images, RelationshipMap};
use crate::pipeline::input::{discover_documents, validate_docx};
use crate::pipeline::package::{parse_document, Block, DocxDocument, DocxPackage};
use crate::pipeline::walk::walk_document;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, error, info, warn};

/// Convert a single `.docx` file to Markdown in memory.
///
/// Extracted images live in a scratch directory under `config.temp_dir`
/// that is removed before this returns.
///
/// # Errors
/// Returns `Err(Docx2MdError)` only for fatal errors: unreadable or corrupt
/// input, failed asset writes, or an unusable model provider. Individual
/// images that cannot be described are rendered as sentinels instead.
pub async fn convert(
    input: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Docx2MdError> {
    let describer = build_describer(config)?;
    convert_document(input.as_ref(), config, &describer).await
}

/// Convert a `.docx` file and write the Markdown to `output_path`.
///
/// Uses atomic write (temp file + rename) so an interrupted run never leaves
/// a partial file that a later batch would mistake for finished output.
pub async fn convert_to_file(
    input: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<DocumentStats, Docx2MdError> {
    let describer = build_describer(config)?;
    convert_document_to_file(input.as_ref(), output_path.as_ref(), config, &describer).await
}

/// Structural summary of a `.docx` without converting it.
///
/// Does not require a model provider.
pub async fn inspect(input: impl AsRef<Path>) -> Result<DocumentMetadata, Docx2MdError> {
    let path = input.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || {
        validate_docx(&path)?;
        let mut package = DocxPackage::open(&path)?;
        let document = parse_document(&mut package)?;
        Ok(metadata_for(&path, &document))
    })
    .await
    .map_err(|e| Docx2MdError::Internal(format!("Inspect task panicked: {}", e)))?
}

/// Convert every `.docx` in `config.input_dir` into `config.output_dir`.
///
/// Inputs whose `<stem>.md` already exists are skipped without being opened,
/// so re-running a batch only converts what is missing. `config.temp_dir` is
/// wiped at the start and deleted at the end.
///
/// # Errors
/// Setup failures (directories, model provider) are always fatal. A failing
/// document is recorded in the report and the batch continues, unless
/// `config.fail_fast` is set.
pub async fn convert_directory(config: &ConversionConfig) -> Result<BatchReport, Docx2MdError> {
    let start = Instant::now();

    create_dir(&config.input_dir).await?;
    create_dir(&config.output_dir).await?;
    reset_temp_dir(&config.temp_dir).await?;

    let result = run_batch(config, start).await;

    match tokio::fs::remove_dir_all(&config.temp_dir).await {
        Ok(()) => debug!("Removed temp directory {}", config.temp_dir.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            "Could not remove temp directory {}: {}",
            config.temp_dir.display(),
            e
        ),
    }

    result
}

/// Synchronous wrapper around [`convert_directory`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_directory_sync(config: &ConversionConfig) -> Result<BatchReport, Docx2MdError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Docx2MdError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert_directory(config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run_batch(config: &ConversionConfig, start: Instant) -> Result<BatchReport, Docx2MdError> {
    let describer = build_describer(config)?;
    let inputs = discover_documents(&config.input_dir)?;
    let total = inputs.len();
    let progress = config.progress_callback.as_deref();

    let mut report = BatchReport {
        discovered: total,
        ..Default::default()
    };
    if let Some(cb) = progress {
        cb.on_batch_start(total);
    }
    if inputs.is_empty() {
        info!("No .docx documents found in {}", config.input_dir.display());
    }

    for (i, input) in inputs.iter().enumerate() {
        let output = config.output_path_for(input);

        if output.exists() {
            info!("Skipping {}: {} already exists", input.display(), output.display());
            if let Some(cb) = progress {
                cb.on_document_skipped(input, &output);
            }
            report.record(DocumentReport {
                input: input.clone(),
                output,
                outcome: DocumentOutcome::Skipped,
            });
            continue;
        }

        info!("Processing {} ({}/{})", input.display(), i + 1, total);
        if let Some(cb) = progress {
            cb.on_document_start(input, i + 1, total);
        }

        let outcome = match convert_document_to_file(input, &output, config, &describer).await {
            Ok(stats) => {
                if let Some(cb) = progress {
                    cb.on_document_complete(input, &output, &stats);
                }
                DocumentOutcome::Converted { stats }
            }
            Err(e) => {
                error!("Failed to convert {}: {}", input.display(), e);
                if let Some(cb) = progress {
                    cb.on_document_error(input, &e.to_string());
                }
                if config.fail_fast {
                    return Err(e);
                }
                DocumentOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };
        report.record(DocumentReport {
            input: input.clone(),
            output,
            outcome,
        });
    }

    report.total_duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Batch complete: {} converted, {} skipped, {} failed in {}ms",
        report.processed, report.skipped, report.failed, report.total_duration_ms
    );
    if let Some(cb) = progress {
        cb.on_batch_complete(&report);
    }
    Ok(report)
}

async fn convert_document(
    input: &Path,
    config: &ConversionConfig,
    enricher: &dyn ImageEnricher,
) -> Result<ConversionOutput, Docx2MdError> {
    let start = Instant::now();
    info!("Starting conversion: {}", input.display());

    create_dir(&config.temp_dir).await?;
    let scope = document_scope(input, &config.temp_dir)?;

    let (document, images) = prepare_document(input, scope.path()).await?;
    let metadata = metadata_for(input, &document);
    info!(
        "{}: {} blocks, {} image(s) extracted",
        input.display(),
        metadata.blocks,
        images.len()
    );

    let walked = walk_document(
        &document.blocks,
        &images,
        enricher,
        config.progress_callback.as_deref(),
        input,
    )
    .await;
    drop(scope);

    let mut stats = walked.stats;
    stats.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Conversion complete: {} ({} entries, {}/{} images described, {}ms)",
        input.display(),
        stats.entries,
        stats.images_described,
        stats.images,
        stats.duration_ms
    );

    Ok(ConversionOutput {
        markdown: walked.markdown,
        metadata,
        stats,
    })
}

async fn convert_document_to_file(
    input: &Path,
    path: &Path,
    config: &ConversionConfig,
    enricher: &dyn ImageEnricher,
) -> Result<DocumentStats, Docx2MdError> {
    let output = convert_document(input, config, enricher).await?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Docx2MdError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    // Atomic write: write to temp, then rename
    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, &output.markdown)
        .await
        .map_err(|e| Docx2MdError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Docx2MdError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    info!("Saved {}", path.display());
    Ok(output.stats)
}

/// Open, parse and extract one document off the async worker threads.
async fn prepare_document(
    input: &Path,
    scope: &Path,
) -> Result<(DocxDocument, RelationshipMap), Docx2MdError> {
    let path = input.to_path_buf();
    let scope = scope.to_path_buf();

    tokio::task::spawn_blocking(move || {
        validate_docx(&path)?;
        let mut package = DocxPackage::open(&path)?;
        let document = parse_document(&mut package)?;
        let images = extract_images(
            &mut package,
            &document.relationships,
            document.base_dir(),
            &scope,
        )?;
        Ok((document, images))
    })
    .await
    .map_err(|e| Docx2MdError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Per-document scratch directory, removed when the guard drops.
fn document_scope(input: &Path, temp_root: &Path) -> Result<TempDir, Docx2MdError> {
    let stem = input
        .file_stem()
        .map(|s| format!("{}-", s.to_string_lossy()))
        .unwrap_or_default();
    tempfile::Builder::new()
        .prefix(&stem)
        .tempdir_in(temp_root)
        .map_err(|e| Docx2MdError::DirectoryFailed {
            path: temp_root.to_path_buf(),
            source: e,
        })
}

fn metadata_for(path: &Path, document: &DocxDocument) -> DocumentMetadata {
    let mut meta = DocumentMetadata {
        path: path.to_path_buf(),
        blocks: document.blocks.len(),
        image_relationships: document
            .relationships
            .iter()
            .filter(|r| r.is_image())
            .count(),
        ..Default::default()
    };
    for block in &document.blocks {
        match block {
            Block::Heading { .. } => meta.headings += 1,
            Block::Paragraph { text } if !text.is_empty() => meta.paragraphs += 1,
            Block::Paragraph { .. } => {}
            Block::ImageRef { .. } => meta.image_refs += 1,
        }
    }
    meta
}

async fn create_dir(path: &Path) -> Result<(), Docx2MdError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| Docx2MdError::DirectoryFailed {
            path: path.to_path_buf(),
            source: e,
        })
}

async fn reset_temp_dir(path: &Path) -> Result<(), Docx2MdError> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => debug!("Cleared stale temp directory {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(Docx2MdError::DirectoryFailed {
                path: path.to_path_buf(),
                source: e,
            })
        }
    }
    create_dir(path).await
}

fn build_describer(config: &ConversionConfig) -> Result<ImageDescriber, Docx2MdError> {
    let model = resolve_vision_model(config)?;
    ImageDescriber::from_config(model, config)
}

/// Resolve the vision model, from most-specific to least-specific.
///
/// 1. **Pre-built model** (`config.vision_model`): used as-is. Tests and
///    callers with their own inference stack plug in here.
/// 2. **Pre-built provider** (`config.provider`): wrapped in
///    [`LlmVisionModel`] with the configured sampling options.
/// 3. **Named provider + model** (`config.provider_name`, `config.model`):
///    built through [`ProviderFactory::create_llm_provider`], which reads any
///    endpoint or key variables (`OLLAMA_HOST`, `OPENAI_API_KEY`, …) from
///    the environment.
pub fn resolve_vision_model(config: &ConversionConfig) -> Result<Arc<dyn VisionModel>, Docx2MdError> {
    if let Some(ref model) = config.vision_model {
        return Ok(Arc::clone(model));
    }

    let provider = match config.provider {
        Some(ref provider) => Arc::clone(provider),
        None => create_vision_provider(&config.provider_name, &config.model)?,
    };
    Ok(Arc::new(LlmVisionModel::new(provider, config)))
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, Docx2MdError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        Docx2MdError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}\nIs the '{model}' model available? For Ollama: ollama pull {model}"),
        }
    })
}
