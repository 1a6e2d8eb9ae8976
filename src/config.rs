//! Configuration types for DOCX-to-Markdown conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Every knob lives in one struct so a
//! batch run can be described, logged and reproduced from a single value.

use crate::error::Docx2MdError;
use crate::pipeline::describe::VisionModel;
use crate::pipeline::language::{LanguageDetector, Translator, DEFAULT_TRANSLATE_URL};
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Placeholder replaced by the preceding document text in a custom prompt.
pub const CONTEXT_PLACEHOLDER: &str = "{context}";

/// Configuration for a batch (or single-document) conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_docx2md::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .input_dir("manuals")
///     .output_dir("manuals-md")
///     .model("llava-phi3")
///     .target_language("pt")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Directory scanned for `*.docx` inputs. Default: `input`.
    pub input_dir: PathBuf,

    /// Directory receiving `<stem>.md` outputs. Default: `output`.
    pub output_dir: PathBuf,

    /// Scratch directory for extracted images. Wiped at the start of a batch
    /// and deleted at the end. Default: `imagens_temp_processador`.
    pub temp_dir: PathBuf,

    /// Vision model identifier. Default: `llava-phi3`.
    pub model: String,

    /// LLM provider name passed to `ProviderFactory`. Default: `ollama`.
    pub provider_name: String,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed vision model. Takes precedence over `provider`.
    pub vision_model: Option<Arc<dyn VisionModel>>,

    /// Language detector. `None` uses the built-in whatlang detector.
    pub language_detector: Option<Arc<dyn LanguageDetector>>,

    /// Translator. `None` uses the Google translate endpoint at `translate_url`.
    pub translator: Option<Arc<dyn Translator>>,

    /// Sampling temperature for the description. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the model may generate per image. Default: 1024.
    pub max_tokens: usize,

    /// Per-image model call timeout in seconds. Default: 300.
    ///
    /// Local models on CPU can take minutes per screenshot; the bound only
    /// exists so one stuck request cannot hang the whole batch.
    pub api_timeout_secs: u64,

    /// Run language detection + translation on descriptions. Default: true.
    pub translate: bool,

    /// Language whose descriptions get translated. Default: `en`.
    pub source_language: String,

    /// Language descriptions should end up in. Default: `pt`.
    pub target_language: String,

    /// HTTP timeout for one translation request in seconds. Default: 30.
    pub translate_timeout_secs: u64,

    /// Endpoint used by the default translator.
    pub translate_url: String,

    /// Custom instruction template. Must contain `{context}`.
    /// If None, uses [`crate::prompts::DEFAULT_PROMPT_TEMPLATE`].
    pub prompt_template: Option<String>,

    /// Abort the batch on the first failing document instead of recording
    /// the failure and continuing. Default: false.
    pub fail_fast: bool,

    /// Receives per-document and per-image progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
            temp_dir: PathBuf::from("imagens_temp_processador"),
            model: "llava-phi3".to_string(),
            provider_name: "ollama".to_string(),
            provider: None,
            vision_model: None,
            language_detector: None,
            translator: None,
            temperature: 0.1,
            max_tokens: 1024,
            api_timeout_secs: 300,
            translate: true,
            source_language: "en".to_string(),
            target_language: "pt".to_string(),
            translate_timeout_secs: 30,
            translate_url: DEFAULT_TRANSLATE_URL.to_string(),
            prompt_template: None,
            fail_fast: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .field("temp_dir", &self.temp_dir)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("vision_model", &self.vision_model.as_ref().map(|_| "<dyn VisionModel>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("translate", &self.translate)
            .field("source_language", &self.source_language)
            .field("target_language", &self.target_language)
            .field("fail_fast", &self.fail_fast)
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Path of the Markdown file produced for `input`: `<output_dir>/<stem>.md`.
    pub fn output_path_for(&self, input: &std::path::Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        self.output_dir.join(format!("{stem}.md"))
    }
}

/// Builder for [`ConversionConfig`].
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl fmt::Debug for ConversionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ConversionConfigBuilder {
    pub fn input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.input_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = dir.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = name.into();
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn vision_model(mut self, model: Arc<dyn VisionModel>) -> Self {
        self.config.vision_model = Some(model);
        self
    }

    pub fn language_detector(mut self, detector: Arc<dyn LanguageDetector>) -> Self {
        self.config.language_detector = Some(detector);
        self
    }

    pub fn translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.config.translator = Some(translator);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn translate(mut self, v: bool) -> Self {
        self.config.translate = v;
        self
    }

    pub fn source_language(mut self, code: impl Into<String>) -> Self {
        self.config.source_language = code.into();
        self
    }

    pub fn target_language(mut self, code: impl Into<String>) -> Self {
        self.config.target_language = code.into();
        self
    }

    pub fn translate_timeout_secs(mut self, secs: u64) -> Self {
        self.config.translate_timeout_secs = secs;
        self
    }

    pub fn translate_url(mut self, url: impl Into<String>) -> Self {
        self.config.translate_url = url.into();
        self
    }

    pub fn prompt_template(mut self, template: impl Into<String>) -> Self {
        self.config.prompt_template = Some(template.into());
        self
    }

    pub fn fail_fast(mut self, v: bool) -> Self {
        self.config.fail_fast = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Docx2MdError> {
        let c = &self.config;
        if c.source_language.trim().is_empty() || c.target_language.trim().is_empty() {
            return Err(Docx2MdError::InvalidConfig(
                "Language codes must not be empty".into(),
            ));
        }
        if c.api_timeout_secs == 0 || c.translate_timeout_secs == 0 {
            return Err(Docx2MdError::InvalidConfig(
                "Timeouts must be ≥ 1 second".into(),
            ));
        }
        if c.vision_model.is_none() && c.provider.is_none() && c.model.trim().is_empty() {
            return Err(Docx2MdError::InvalidConfig("Model must not be empty".into()));
        }
        if let Some(ref template) = c.prompt_template {
            if !template.contains(CONTEXT_PLACEHOLDER) {
                return Err(Docx2MdError::InvalidConfig(format!(
                    "Prompt template must contain the {CONTEXT_PLACEHOLDER} placeholder"
                )));
            }
        }
        Ok(self.config)
    }
}
