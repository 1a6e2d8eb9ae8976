//! Language normalisation of image descriptions.
//!
//! Small local vision models often ignore the "answer in Portuguese" part of
//! the prompt and reply in English. Every description is therefore run
//! through a detector and, when it comes back in the source language,
//! through a translator into the target language. Both collaborators sit
//! behind traits so tests (and offline deployments) can swap them out.
//!
//! Normalisation never fails: any detector or translator error leaves the
//! description as the model produced it.

use crate::error::{DetectionError, TranslationError};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, warn};
use whatlang::{Detector, Lang};

/// Free Google translate endpoint used by [`GoogleTranslator`] by default.
pub const DEFAULT_TRANSLATE_URL: &str = "https://translate.googleapis.com/translate_a/single";

/// Maximum characters sent in one translation request.
pub const MAX_TRANSLATE_CHARS: usize = 5000;

/// Identifies the language of a text as a short code (`en`, `pt`, …).
pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> Result<String, DetectionError>;
}

/// Translates text between two language codes.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        source: &str,
        target: &str,
        text: &str,
    ) -> Result<String, TranslationError>;
}

/// Languages the detector chooses between.
///
/// Descriptions come back either in the language the prompt asked for or in
/// the model's native English; restricting the candidates keeps one-line
/// answers from being scored against every Latin-script language.
pub const DETECTABLE_LANGUAGES: [Lang; 6] = [
    Lang::Eng,
    Lang::Por,
    Lang::Spa,
    Lang::Fra,
    Lang::Deu,
    Lang::Ita,
];

/// Detections below this confidence count as ambiguous.
pub const MIN_DETECTION_CONFIDENCE: f64 = 0.25;

/// Offline trigram detector backed by `whatlang`, restricted to
/// [`DETECTABLE_LANGUAGES`].
///
/// Only text with no detectable script, or a detection below
/// [`MIN_DETECTION_CONFIDENCE`], is reported as
/// [`DetectionError::Ambiguous`]. Whatlang's own `is_reliable` flag is too
/// strict for one-sentence descriptions.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhatlangDetector;

impl WhatlangDetector {
    fn code(lang: Lang) -> &'static str {
        match lang {
            Lang::Eng => "en",
            Lang::Por => "pt",
            Lang::Spa => "es",
            Lang::Fra => "fr",
            Lang::Deu => "de",
            Lang::Ita => "it",
            other => other.code(),
        }
    }
}

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Result<String, DetectionError> {
        let detector = Detector::with_allowlist(DETECTABLE_LANGUAGES.to_vec());
        let info = detector.detect(text).ok_or(DetectionError::Ambiguous)?;
        debug!(
            "Detected {:?} (confidence {:.2}, reliable: {})",
            info.lang(),
            info.confidence(),
            info.is_reliable()
        );
        if info.confidence() < MIN_DETECTION_CONFIDENCE {
            return Err(DetectionError::Ambiguous);
        }
        Ok(Self::code(info.lang()).to_string())
    }
}

/// Client for the keyless `translate_a/single` endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    client: reqwest::Client,
    url: String,
}

impl GoogleTranslator {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Result<Self, TranslationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TranslationError::Request(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn translate_chunk(
        &self,
        source: &str,
        target: &str,
        chunk: &str,
    ) -> Result<String, TranslationError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", chunk),
            ])
            .send()
            .await
            .map_err(|e| TranslationError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslationError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| TranslationError::Request(e.to_string()))?;
        parse_translation(&body)
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(
        &self,
        source: &str,
        target: &str,
        text: &str,
    ) -> Result<String, TranslationError> {
        let chunks = chunk_text(text, MAX_TRANSLATE_CHARS);
        let mut parts = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            parts.push(self.translate_chunk(source, target, &chunk.text).await?);
        }
        let joined = join_chunks(&chunks, &parts);
        if joined.trim().is_empty() {
            return Err(TranslationError::EmptyResponse);
        }
        Ok(joined)
    }
}

/// Join the translated segments of a `translate_a/single` response.
///
/// The payload is a nested array whose first element lists
/// `[translated, original, …]` segments.
pub fn parse_translation(body: &str) -> Result<String, TranslationError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| TranslationError::Malformed(e.to_string()))?;
    let segments = value
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslationError::Malformed("missing segment list".to_string()))?;

    let text: String = segments
        .iter()
        .filter_map(|seg| seg.get(0).and_then(Value::as_str))
        .collect();
    if text.is_empty() {
        return Err(TranslationError::EmptyResponse);
    }
    Ok(text)
}

/// One piece of text sent in a single translation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub text: String,
    /// True when this piece continues a line split from the previous chunk,
    /// so it is glued back without a line break.
    pub continues_line: bool,
}

/// Split `text` into pieces of at most `max_chars` characters, breaking on
/// line boundaries where possible. Lines longer than `max_chars` are cut by
/// character count and marked with [`TextChunk::continues_line`].
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<TextChunk> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    let flush = |current: &mut String, chunks: &mut Vec<TextChunk>| {
        chunks.push(TextChunk {
            text: std::mem::take(current),
            continues_line: false,
        });
    };

    for line in text.split('\n') {
        let line_len = line.chars().count();

        if line_len > max_chars {
            if !current.is_empty() {
                flush(&mut current, &mut chunks);
                current_len = 0;
            }
            let chars: Vec<char> = line.chars().collect();
            for (i, piece) in chars.chunks(max_chars).enumerate() {
                chunks.push(TextChunk {
                    text: piece.iter().collect(),
                    continues_line: i > 0,
                });
            }
            continue;
        }

        let needed = if current.is_empty() { line_len } else { current_len + 1 + line_len };
        if needed > max_chars && !current.is_empty() {
            flush(&mut current, &mut chunks);
            current_len = 0;
        }
        if !current.is_empty() {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        flush(&mut current, &mut chunks);
    }
    chunks
}

/// Reassemble translated chunks: a line break between pieces, except where
/// a piece continues a split line.
pub fn join_chunks(chunks: &[TextChunk], translated: &[String]) -> String {
    let mut out = String::new();
    for (i, (chunk, text)) in chunks.iter().zip(translated).enumerate() {
        if i > 0 && !chunk.continues_line {
            out.push('\n');
        }
        out.push_str(text);
    }
    out
}

/// Return `text` in the target language where it is safe to do so.
///
/// - detected as `source` (and `source != target`) → translated
/// - ambiguous detection → unchanged, with a warning
/// - any other language → unchanged
/// - detector or translator failure → unchanged, with an error log
///
/// The result is always trimmed.
pub async fn normalize_language(
    text: &str,
    detector: &dyn LanguageDetector,
    translator: &dyn Translator,
    source: &str,
    target: &str,
) -> String {
    let original = text.trim();
    if original.is_empty() || source.eq_ignore_ascii_case(target) {
        return original.to_string();
    }

    let detected = match detector.detect(original) {
        Ok(code) => code,
        Err(DetectionError::Ambiguous) => {
            warn!("Could not detect the description language; keeping it as is");
            return original.to_string();
        }
        Err(e) => {
            error!("Language detection failed: {}", e);
            return original.to_string();
        }
    };

    if !detected.eq_ignore_ascii_case(source) {
        debug!("Description detected as '{}'; no translation needed", detected);
        return original.to_string();
    }

    debug!("Translating description {} → {}", source, target);
    match translator.translate(source, target, original).await {
        Ok(translated) if !translated.trim().is_empty() => translated.trim().to_string(),
        Ok(_) => {
            warn!("Translation came back empty; keeping the original description");
            original.to_string()
        }
        Err(e) => {
            error!("Translation failed: {}", e);
            original.to_string()
        }
    }
}
