//! Shared helpers for integration tests: a tiny `.docx` writer and
//! scripted model/translator doubles.

#![allow(dead_code)]

use async_trait::async_trait;
use edgequake_docx2md::{
    ConversionConfig, DetectionError, LanguageDetector, ModelError, TranslationError, Translator,
    VisionModel,
};
use edgequake_llm::ImageData;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const IMAGE_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
const STYLES_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const OFFICE_DOCUMENT_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";

/// A valid 1×1 RGBA PNG.
pub const PNG_1X1: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/></w:style><w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/></w:style></w:styles>"#;

/// Body content of a test document, in order.
pub enum Part {
    Heading(u8, &'static str),
    Para(&'static str),
    Image,
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Build a `.docx` whose images are all the 1×1 PNG, numbered `rId100`,
/// `rId101`, … in body order.
pub fn docx_bytes(parts: &[Part]) -> Vec<u8> {
    let mut body = String::new();
    let mut rels = format!(
        r#"<Relationship Id="rIdStyles" Type="{STYLES_REL}" Target="styles.xml"/>"#
    );
    let mut media = Vec::new();

    for part in parts {
        match part {
            Part::Heading(level, text) => body.push_str(&format!(
                r#"<w:p><w:pPr><w:pStyle w:val="Heading{level}"/></w:pPr><w:r><w:t>{}</w:t></w:r></w:p>"#,
                xml_escape(text)
            )),
            Part::Para(text) => body.push_str(&format!(
                r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
                xml_escape(text)
            )),
            Part::Image => {
                let n = media.len() + 1;
                let rid = format!("rId{}", 99 + n);
                body.push_str(&format!(
                    r#"<w:p><w:r><w:drawing><wp:inline><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture"><pic:pic><pic:blipFill><a:blip r:embed="{rid}"/></pic:blipFill></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#
                ));
                rels.push_str(&format!(
                    r#"<Relationship Id="{rid}" Type="{IMAGE_REL}" Target="media/image{n}.png"/>"#
                ));
                media.push(format!("word/media/image{n}.png"));
            }
        }
    }

    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture"><w:body>{body}<w:sectPr/></w:body></w:document>"#
    );
    let document_rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rels}</Relationships>"#
    );
    let package_rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{OFFICE_DOCUMENT_REL}" Target="word/document.xml"/></Relationships>"#
    );

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut entry = |name: &str, data: &[u8]| {
        zip.start_file(name, SimpleFileOptions::default())
            .expect("start zip entry");
        zip.write_all(data).expect("write zip entry");
    };
    entry("_rels/.rels", package_rels.as_bytes());
    entry("word/document.xml", document.as_bytes());
    entry("word/_rels/document.xml.rels", document_rels.as_bytes());
    entry("word/styles.xml", STYLES_XML.as_bytes());
    for name in &media {
        entry(name, PNG_1X1);
    }
    zip.finish().expect("finish zip").into_inner()
}

pub fn write_docx(path: &Path, parts: &[Part]) {
    std::fs::write(path, docx_bytes(parts)).expect("write test docx");
}

/// Vision model that answers from a script and records every prompt.
pub struct ScriptedModel {
    replies: Mutex<Vec<Result<String, ModelError>>>,
    default_reply: String,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    /// Always answers `reply`.
    pub fn constant(reply: &str) -> Arc<Self> {
        Self::scripted(Vec::new(), reply)
    }

    /// Answers from `replies` in order, then `default_reply`.
    pub fn scripted(replies: Vec<Result<String, ModelError>>, default_reply: &str) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().rev().collect()),
            default_reply: default_reply.to_string(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionModel for ScriptedModel {
    async fn complete(&self, _image: ImageData, prompt: &str) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Ok(self.default_reply.clone()))
    }
}

/// Detector that reports "en" for ASCII-only text and "pt" otherwise.
pub struct AsciiDetector;

impl LanguageDetector for AsciiDetector {
    fn detect(&self, text: &str) -> Result<String, DetectionError> {
        Ok(if text.is_ascii() { "en" } else { "pt" }.to_string())
    }
}

/// Translator that tags its output so tests can see it ran.
pub struct TaggingTranslator {
    pub calls: AtomicUsize,
}

impl TaggingTranslator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Translator for TaggingTranslator {
    async fn translate(&self, source: &str, target: &str, text: &str) -> Result<String, TranslationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("[{source}→{target}] {text}"))
    }
}

/// Config rooted in `root` (input/, output/, tmp/) with the given model and
/// deterministic language collaborators.
pub fn config_for(root: &Path, model: Arc<ScriptedModel>) -> ConversionConfig {
    ConversionConfig::builder()
        .input_dir(root.join("input"))
        .output_dir(root.join("output"))
        .temp_dir(root.join("tmp"))
        .vision_model(model)
        .language_detector(Arc::new(AsciiDetector))
        .translator(TaggingTranslator::new())
        .build()
        .expect("valid config")
}
