//! Image description: one vision-model call per extracted image.
//!
//! The describer composes the other per-image stages:
//!
//! ```text
//! read file ──▶ build prompt ──▶ model call ──▶ cleanup ──▶ language
//! (encode)      (prompts)        (timeout)      (postprocess) (detect/translate)
//! ```
//!
//! A failure at any step yields a [`DescriptionError`] that the walker turns
//! into a sentinel line; nothing here aborts the document.
//!
//! ## No retries
//!
//! Unlike hosted APIs, the default backend is a local Ollama server where a
//! failed request usually means the model is missing or the machine is out
//! of memory. Retrying would multiply a multi-minute call, so every image
//! gets exactly one attempt bounded by `api_timeout_secs`.

use crate::config::ConversionConfig;
use crate::error::{DescriptionError, Docx2MdError, ModelError};
use crate::pipeline::encode::load_image;
use crate::pipeline::language::{
    normalize_language, GoogleTranslator, LanguageDetector, Translator, WhatlangDetector,
};
use crate::pipeline::postprocess::clean_description;
use crate::prompts::build_prompt;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Outcome of describing one image.
pub type Description = Result<String, DescriptionError>;

/// A multimodal model that answers a text prompt about one image.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn complete(&self, image: ImageData, prompt: &str) -> Result<String, ModelError>;
}

/// Produces a description for an image given the preceding document text.
///
/// The walker depends on this trait rather than on [`ImageDescriber`] so the
/// document walk can be exercised without a model.
#[async_trait]
pub trait ImageEnricher: Send + Sync {
    async fn describe(&self, image_path: &Path, context: &str) -> Description;
}

/// [`VisionModel`] backed by an `edgequake-llm` provider.
///
/// ## Message Layout
///
/// A single user message carrying the instruction text and the image as a
/// base64 attachment. No system message: several small local models
/// (llava-phi3 among them) ignore system turns when an image is attached.
pub struct LlmVisionModel {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl LlmVisionModel {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ConversionConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
        }
    }
}

#[async_trait]
impl VisionModel for LlmVisionModel {
    async fn complete(&self, image: ImageData, prompt: &str) -> Result<String, ModelError> {
        let messages = vec![ChatMessage::user_with_images(prompt, vec![image])];
        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| ModelError::Provider(e.to_string()))?;

        debug!(
            "{} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );

        if response.content.trim().is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        Ok(response.content)
    }
}

/// Build `CompletionOptions` from the conversion config.
fn build_options(config: &ConversionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// The production [`ImageEnricher`].
pub struct ImageDescriber {
    model: Arc<dyn VisionModel>,
    detector: Arc<dyn LanguageDetector>,
    translator: Arc<dyn Translator>,
    prompt_template: Option<String>,
    translate: bool,
    source_language: String,
    target_language: String,
    timeout_secs: u64,
}

impl ImageDescriber {
    /// Describer with default settings: translate `en` → `pt`, 300 s timeout.
    pub fn new(
        model: Arc<dyn VisionModel>,
        detector: Arc<dyn LanguageDetector>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        let defaults = ConversionConfig::default();
        Self {
            model,
            detector,
            translator,
            prompt_template: None,
            translate: defaults.translate,
            source_language: defaults.source_language,
            target_language: defaults.target_language,
            timeout_secs: defaults.api_timeout_secs,
        }
    }

    /// Describer wired from a config: injected detector and translator win
    /// over the built-in whatlang detector and Google translator.
    pub fn from_config(
        model: Arc<dyn VisionModel>,
        config: &ConversionConfig,
    ) -> Result<Self, Docx2MdError> {
        let detector: Arc<dyn LanguageDetector> = match &config.language_detector {
            Some(d) => Arc::clone(d),
            None => Arc::new(WhatlangDetector),
        };
        let translator: Arc<dyn Translator> = match &config.translator {
            Some(t) => Arc::clone(t),
            None => Arc::new(
                GoogleTranslator::new(&config.translate_url, config.translate_timeout_secs)
                    .map_err(|e| Docx2MdError::Internal(e.to_string()))?,
            ),
        };

        Ok(Self::new(model, detector, translator)
            .with_prompt_template(config.prompt_template.clone())
            .with_translation(
                config.translate,
                &config.source_language,
                &config.target_language,
            )
            .with_timeout(config.api_timeout_secs))
    }

    pub fn with_prompt_template(mut self, template: Option<String>) -> Self {
        self.prompt_template = template;
        self
    }

    pub fn with_translation(mut self, enabled: bool, source: &str, target: &str) -> Self {
        self.translate = enabled;
        self.source_language = source.to_string();
        self.target_language = target.to_string();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    async fn call_model(&self, image: ImageData, prompt: &str) -> Result<String, DescriptionError> {
        let call = self.model.complete(image, prompt);
        match tokio::time::timeout(Duration::from_secs(self.timeout_secs), call).await {
            Err(_) => Err(DescriptionError::Timeout {
                secs: self.timeout_secs,
            }),
            Ok(Err(e)) => Err(DescriptionError::AnalysisFailed {
                kind: e.kind().to_string(),
                detail: e.to_string(),
            }),
            Ok(Ok(raw)) => Ok(raw),
        }
    }
}

#[async_trait]
impl ImageEnricher for ImageDescriber {
    async fn describe(&self, image_path: &Path, context: &str) -> Description {
        let start = Instant::now();

        let image = load_image(image_path).await.inspect_err(|e| {
            warn!("{}", e);
        })?;

        let prompt = build_prompt(
            self.prompt_template.as_deref(),
            context,
            &self.target_language,
        );
        info!("Analyzing image {}", image_path.display());

        let raw = self.call_model(image, &prompt).await.inspect_err(|e| {
            error!("Image {}: {}", image_path.display(), e);
        })?;

        let cleaned = clean_description(&raw);
        if cleaned.is_empty() {
            let e = DescriptionError::AnalysisFailed {
                kind: ModelError::EmptyResponse.kind().to_string(),
                detail: ModelError::EmptyResponse.to_string(),
            };
            error!("Image {}: {}", image_path.display(), e);
            return Err(e);
        }

        let description = if self.translate {
            normalize_language(
                &cleaned,
                self.detector.as_ref(),
                self.translator.as_ref(),
                &self.source_language,
                &self.target_language,
            )
            .await
        } else {
            cleaned
        };

        debug!(
            "Image {} described in {:?} ({} chars)",
            image_path.display(),
            start.elapsed(),
            description.chars().count()
        );
        Ok(description)
    }
}
