//! CLI binary for edgequake-docx2md.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_docx2md::{
    convert_directory, inspect, BatchReport, ConversionConfig, ConversionProgressCallback,
    DocumentOutcome, DocumentStats, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Shorten long error messages to one terminal line.
fn truncate(msg: &str, max: usize) -> String {
    if msg.chars().count() > max {
        let head: String = msg.chars().take(max - 1).collect();
        format!("{head}\u{2026}")
    } else {
        msg.to_string()
    }
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a document-level progress bar plus one log
/// line per image and per document.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start of the image currently being described.
    image_started: Mutex<Option<Instant>>,
    image_errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Scanning input directory…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            image_started: Mutex::new(None),
            image_errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} documents  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Converting");
        self.bar.reset_eta();
    }

    fn image_elapsed(&self) -> f64 {
        self.image_started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        self.activate_bar(total_documents);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Found {total_documents} document(s) to process"))
        ));
    }

    fn on_document_skipped(&self, input: &Path, output: &Path) {
        self.bar.println(format!(
            "  {} {}  {}",
            dim("↷"),
            file_name(input),
            dim(&format!("{} already exists, skipped", file_name(output))),
        ));
        self.bar.inc(1);
    }

    fn on_document_start(&self, input: &Path, doc_num: usize, total: usize) {
        self.bar.println(format!(
            "{} {} {}",
            cyan("▸"),
            bold(&file_name(input)),
            dim(&format!("({doc_num}/{total})"))
        ));
        self.bar.set_message(file_name(input));
    }

    fn on_image_start(&self, _input: &Path, image_num: usize, total: usize) {
        if let Ok(mut t) = self.image_started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(format!("image {image_num}/{total}"));
    }

    fn on_image_complete(&self, _input: &Path, image_num: usize, total: usize, len: usize) {
        let secs = self.image_elapsed();
        self.bar.println(format!(
            "    {} Image {:>3}/{:<3}  {:<12}  {}",
            green("✓"),
            image_num,
            total,
            dim(&format!("{len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
    }

    fn on_image_error(&self, _input: &Path, image_num: usize, total: usize, error: &str) {
        let secs = self.image_elapsed();
        self.image_errors.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "    {} Image {:>3}/{:<3}  {}  {}",
            red("✗"),
            image_num,
            total,
            red(&truncate(error, 80)),
            dim(&format!("{secs:.1}s")),
        ));
    }

    fn on_document_complete(&self, _input: &Path, output: &Path, stats: &DocumentStats) {
        self.bar.println(format!(
            "  {} Saved {}  {}",
            green("✔"),
            bold(&output.display().to_string()),
            dim(&format!(
                "{} entries, {}/{} images, {:.1}s",
                stats.entries,
                stats.images_described,
                stats.images,
                stats.duration_ms as f64 / 1000.0
            )),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, input: &Path, error: &str) {
        self.bar.println(format!(
            "  {} {}  {}",
            red("✘"),
            file_name(input),
            red(&truncate(error, 100)),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, _report: &BatchReport) {
        self.bar.finish_and_clear();
        let image_errors = self.image_errors.load(Ordering::SeqCst);
        if image_errors > 0 {
            eprintln!(
                "{} {} image(s) could not be described; search the output for \"[ERRO\"",
                yellow("⚠"),
                image_errors
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert every .docx in ./input into ./output (Ollama + llava-phi3)
  docx2md

  # Other folders, another local model
  docx2md --input manuals --output manuals-md --model llava:13b

  # Hosted provider, keep descriptions in English
  docx2md --provider openai --model gpt-4.1-mini --target-lang en

  # Structure of one document (no model needed)
  docx2md --inspect manuals/setup.docx

  # Machine-readable batch report
  docx2md --json > report.json

BEHAVIOUR:
  Outputs are named <stem>.md. A document whose output already exists is
  skipped, so re-running only converts new documents. Images that cannot be
  read or described are written as [ERRO AO LER ARQUIVO DE IMAGEM] or
  [ERRO NA ANÁLISE DA IMAGEM].

ENVIRONMENT VARIABLES:
  OLLAMA_HOST             Ollama endpoint (default http://localhost:11434)
  OPENAI_API_KEY          OpenAI API key (with --provider openai)
  ANTHROPIC_API_KEY       Anthropic API key (with --provider anthropic)
  GEMINI_API_KEY          Google Gemini API key (with --provider gemini)
  RUST_LOG                Overrides the log filter (e.g. edgequake_docx2md=debug)

SETUP:
  1. Install Ollama and pull the model:  ollama pull llava-phi3
  2. Put .docx files in ./input
  3. Run:                                docx2md
"#;

/// Convert Word documents to Markdown, describing images with a vision LLM.
#[derive(Parser, Debug)]
#[command(
    name = "docx2md",
    version,
    about = "Convert Word documents to Markdown, describing embedded images with a vision LLM",
    long_about = "Batch-convert .docx files to Markdown. Headings and paragraphs are kept in \
order; every embedded image is replaced by a description from a vision language model \
(Ollama by default), translated into the target language when the model answers in English.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory containing the .docx files.
    #[arg(short, long, env = "DOCX2MD_INPUT", default_value = "input")]
    input: PathBuf,

    /// Directory receiving the .md files.
    #[arg(short, long, env = "DOCX2MD_OUTPUT", default_value = "output")]
    output: PathBuf,

    /// Scratch directory for extracted images (wiped and removed per run).
    #[arg(long, env = "DOCX2MD_TEMP_DIR", default_value = "imagens_temp_processador")]
    temp_dir: PathBuf,

    /// Vision model ID.
    #[arg(long, env = "EDGEQUAKE_MODEL", default_value = "llava-phi3")]
    model: String,

    /// LLM provider: ollama, openai, anthropic, gemini, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER", default_value = "ollama")]
    provider: String,

    /// Language the descriptions should be in.
    #[arg(long, env = "DOCX2MD_TARGET_LANG", default_value = "pt")]
    target_lang: String,

    /// Language whose descriptions get translated.
    #[arg(long, env = "DOCX2MD_SOURCE_LANG", default_value = "en")]
    source_lang: String,

    /// Skip language detection and translation.
    #[arg(long, env = "DOCX2MD_NO_TRANSLATE")]
    no_translate: bool,

    /// Per-image model call timeout in seconds.
    #[arg(long, env = "DOCX2MD_API_TIMEOUT", default_value_t = 300)]
    api_timeout: u64,

    /// Translation request timeout in seconds.
    #[arg(long, env = "DOCX2MD_TRANSLATE_TIMEOUT", default_value_t = 30)]
    translate_timeout: u64,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "DOCX2MD_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max LLM output tokens per image.
    #[arg(long, env = "DOCX2MD_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// Text file with a custom instruction; must contain {context}.
    #[arg(long, env = "DOCX2MD_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// Stop at the first document that fails.
    #[arg(long, env = "DOCX2MD_FAIL_FAST")]
    fail_fast: bool,

    /// Print the batch report as JSON on stdout.
    #[arg(long, env = "DOCX2MD_JSON")]
    json: bool,

    /// Print the structure of one .docx and exit (no model needed).
    #[arg(long, value_name = "FILE")]
    inspect: Option<PathBuf>,

    /// Disable progress bar.
    #[arg(long, env = "DOCX2MD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCX2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOCX2MD_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && cli.inspect.is_none();
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect mode ─────────────────────────────────────────────────────
    if let Some(ref path) = cli.inspect {
        let meta = inspect(path).await.context("Failed to inspect DOCX")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:                {}", meta.path.display());
            println!("Blocks:              {}", meta.blocks);
            println!("Headings:            {}", meta.headings);
            println!("Paragraphs:          {}", meta.paragraphs);
            println!("Image references:    {}", meta.image_refs);
            println!("Image relationships: {}", meta.image_relationships);
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Run conversion ───────────────────────────────────────────────────
    let report = convert_directory(&config)
        .await
        .context("Conversion failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&report);
    }

    if report.has_failures() {
        anyhow::bail!("{} document(s) failed to convert", report.failed);
    }
    Ok(())
}

fn print_summary(report: &BatchReport) {
    eprintln!("{}", dim(&"─".repeat(60)));
    if report.discovered == 0 {
        eprintln!("{} No .docx documents found", yellow("⚠"));
    } else if report.processed > 0 {
        eprintln!(
            "{} {} new document(s) converted  {}",
            green("✨"),
            bold(&report.processed.to_string()),
            dim(&format!(
                "{} skipped, {} failed, {}ms",
                report.skipped, report.failed, report.total_duration_ms
            )),
        );
    } else if report.failed == 0 {
        eprintln!("{} Nothing new to convert; every output is up to date", green("✨"));
    }
    if report.failed > 0 {
        for doc in &report.documents {
            if let DocumentOutcome::Failed { ref error } = doc.outcome {
                eprintln!("  {} {}: {}", red("✘"), file_name(&doc.input), truncate(error, 100));
            }
        }
    }
}

/// Map CLI args to `ConversionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .input_dir(&cli.input)
        .output_dir(&cli.output)
        .temp_dir(&cli.temp_dir)
        .model(&cli.model)
        .provider_name(&cli.provider)
        .target_language(&cli.target_lang)
        .source_language(&cli.source_lang)
        .translate(!cli.no_translate)
        .api_timeout_secs(cli.api_timeout)
        .translate_timeout_secs(cli.translate_timeout)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .fail_fast(cli.fail_fast);

    if let Some(ref path) = cli.prompt_file {
        let template = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt template from {:?}", path))?;
        builder = builder.prompt_template(template);
    }

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
