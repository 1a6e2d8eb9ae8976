//! DOCX package reading: zip container → relationships, styles and blocks.
//!
//! A `.docx` file is a zip of OOXML parts. Three of them matter here:
//!
//! | Part | Used for |
//! |------|----------|
//! | `word/document.xml` | body paragraphs, in reading order |
//! | `word/_rels/document.xml.rels` | relationship id → media part |
//! | `word/styles.xml` | style id → style *name* (`heading 1`, …) |
//!
//! The main part is located through `_rels/.rels` (`officeDocument`
//! relationship) and falls back to `word/document.xml`.
//!
//! ## Block classification
//!
//! Only direct children of `w:body` are walked; tables, section properties
//! and paragraphs nested in text boxes are not blocks. A body paragraph that
//! contains a DrawingML `graphicData` element is an image reference carrying
//! the first `a:blip/@r:embed` id found in it; its text is dropped. Every
//! other paragraph is a heading when its style name starts with
//! `heading 1`–`heading 3` (case-insensitive) and a plain paragraph
//! otherwise. Text inside drawings, VML pictures and alternate content never
//! contributes to a paragraph's text.

use crate::error::Docx2MdError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

/// Fallback main part when `_rels/.rels` is missing or unhelpful.
pub const DEFAULT_DOCUMENT_PART: &str = "word/document.xml";

const PACKAGE_RELS_PART: &str = "_rels/.rels";
const OFFICE_DOCUMENT_REL: &str = "/officeDocument";
const STYLES_REL: &str = "/styles";

/// Elements whose descendants never contribute paragraph text.
const NON_TEXT_CONTAINERS: &[&[u8]] = &[
    b"drawing",
    b"pict",
    b"AlternateContent",
    b"txbxContent",
    b"object",
];

/// One unit of body content, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Heading of level 1–3.
    Heading { level: u8, text: String },
    /// Plain paragraph; `text` is trimmed and may be empty.
    Paragraph { text: String },
    /// Paragraph holding an embedded picture.
    ImageRef { relationship_id: String },
}

/// One entry of a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    /// Relationship type URI, e.g. `…/relationships/image`.
    pub rel_type: String,
    pub target: String,
    /// `TargetMode="External"` (linked, not embedded).
    pub external: bool,
}

impl Relationship {
    /// True for relationships pointing at image content.
    pub fn is_image(&self) -> bool {
        self.rel_type.contains("image")
    }

    /// Zip entry name of the target, resolved against `base_dir`
    /// (the directory of the part that owns the relationship).
    pub fn part_name(&self, base_dir: &str) -> String {
        let target = self.target.replace('\\', "/");
        if let Some(absolute) = target.strip_prefix('/') {
            return absolute.to_string();
        }
        let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
        for seg in target.split('/') {
            match seg {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                s => segments.push(s),
            }
        }
        segments.join("/")
    }
}

/// An opened `.docx` container, held in memory.
pub struct DocxPackage {
    path: PathBuf,
    archive: ZipArchive<Cursor<Vec<u8>>>,
}

impl DocxPackage {
    /// Read and open the package at `path`.
    pub fn open(path: &Path) -> Result<Self, Docx2MdError> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Docx2MdError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => Docx2MdError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => Docx2MdError::corrupt(path, e),
        })?;
        Self::from_bytes(path, bytes)
    }

    /// Open a package from bytes already in memory. `path` is only used in
    /// error messages.
    pub fn from_bytes(path: &Path, bytes: Vec<u8>) -> Result<Self, Docx2MdError> {
        let archive =
            ZipArchive::new(Cursor::new(bytes)).map_err(|e| Docx2MdError::corrupt(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            archive,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a part, returning `None` when the package has no such entry.
    pub fn read_part(&mut self, name: &str) -> Result<Option<Vec<u8>>, Docx2MdError> {
        let mut file = match self.archive.by_name(name) {
            Ok(f) => f,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(Docx2MdError::corrupt(&self.path, e)),
        };
        let mut buf = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut buf)
            .map_err(|e| Docx2MdError::corrupt(&self.path, e))?;
        Ok(Some(buf))
    }

    /// Read a part that must exist.
    pub fn read_required(&mut self, name: &str) -> Result<Vec<u8>, Docx2MdError> {
        self.read_part(name)?.ok_or_else(|| Docx2MdError::MissingPart {
            path: self.path.clone(),
            part: name.to_string(),
        })
    }

    fn read_xml(&mut self, name: &str) -> Result<Option<String>, Docx2MdError> {
        match self.read_part(name)? {
            Some(bytes) => {
                let text = String::from_utf8(bytes)
                    .map_err(|e| Docx2MdError::corrupt(&self.path, format!("{name}: {e}")))?;
                Ok(Some(text.trim_start_matches('\u{feff}').to_string()))
            }
            None => Ok(None),
        }
    }
}

/// The parsed body of a document.
#[derive(Debug, Clone)]
pub struct DocxDocument {
    /// Zip entry name of the main document part.
    pub main_part: String,
    /// Body blocks in reading order.
    pub blocks: Vec<Block>,
    /// Relationships of the main part, in declaration order.
    pub relationships: Vec<Relationship>,
}

impl DocxDocument {
    /// Directory of the main part; relationship targets resolve against it.
    pub fn base_dir(&self) -> &str {
        self.main_part
            .rsplit_once('/')
            .map(|(dir, _)| dir)
            .unwrap_or("")
    }
}

/// Parse the main document part, its relationships and its styles.
pub fn parse_document(package: &mut DocxPackage) -> Result<DocxDocument, Docx2MdError> {
    let path = package.path().to_path_buf();
    let main_part = locate_main_part(package)?;
    let base_dir = main_part
        .rsplit_once('/')
        .map(|(dir, _)| dir.to_string())
        .unwrap_or_default();

    let rels_part = rels_part_for(&main_part);
    let relationships = match package.read_xml(&rels_part)? {
        Some(xml) => parse_relationships(&xml)
            .map_err(|e| Docx2MdError::corrupt(&path, format!("{rels_part}: {e}")))?,
        None => Vec::new(),
    };

    let styles_part = relationships
        .iter()
        .find(|r| r.rel_type.ends_with(STYLES_REL) && !r.external)
        .map(|r| r.part_name(&base_dir))
        .unwrap_or_else(|| format!("{base_dir}/styles.xml"));
    let styles = match package.read_xml(&styles_part)? {
        Some(xml) => parse_styles(&xml)
            .map_err(|e| Docx2MdError::corrupt(&path, format!("{styles_part}: {e}")))?,
        None => HashMap::new(),
    };

    let body = package
        .read_xml(&main_part)?
        .ok_or_else(|| Docx2MdError::MissingPart {
            path: path.clone(),
            part: main_part.clone(),
        })?;
    let blocks = parse_blocks(&body, &styles)
        .map_err(|e| Docx2MdError::corrupt(&path, format!("{main_part}: {e}")))?;

    debug!(
        "Parsed {}: {} blocks, {} relationships, {} styles",
        main_part,
        blocks.len(),
        relationships.len(),
        styles.len()
    );

    Ok(DocxDocument {
        main_part,
        blocks,
        relationships,
    })
}

fn locate_main_part(package: &mut DocxPackage) -> Result<String, Docx2MdError> {
    let Some(xml) = package.read_xml(PACKAGE_RELS_PART)? else {
        return Ok(DEFAULT_DOCUMENT_PART.to_string());
    };
    let rels = parse_relationships(&xml)
        .map_err(|e| Docx2MdError::corrupt(package.path(), format!("{PACKAGE_RELS_PART}: {e}")))?;
    Ok(rels
        .iter()
        .find(|r| r.rel_type.ends_with(OFFICE_DOCUMENT_REL) && !r.external)
        .map(|r| r.part_name(""))
        .unwrap_or_else(|| DEFAULT_DOCUMENT_PART.to_string()))
}

/// `word/document.xml` → `word/_rels/document.xml.rels`.
fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

fn attr_value(e: &BytesStart<'_>, local: &[u8]) -> Result<Option<String>, quick_xml::Error> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == local {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Parse a `.rels` part.
pub fn parse_relationships(xml: &str) -> Result<Vec<Relationship>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut rels = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let id = attr_value(&e, b"Id")?.unwrap_or_default();
                let rel_type = attr_value(&e, b"Type")?.unwrap_or_default();
                let target = attr_value(&e, b"Target")?.unwrap_or_default();
                let external = attr_value(&e, b"TargetMode")?
                    .is_some_and(|m| m.eq_ignore_ascii_case("External"));
                rels.push(Relationship {
                    id,
                    rel_type,
                    target,
                    external,
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rels)
}

/// Parse `styles.xml` into a style id → style name map.
pub fn parse_styles(xml: &str) -> Result<HashMap<String, String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut styles = HashMap::new();
    let mut current: Option<String> = None;
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"style" => {
                current = attr_value(&e, b"styleId")?;
            }
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"name" => {
                if let (Some(id), Some(name)) = (current.as_ref(), attr_value(&e, b"val")?) {
                    styles.insert(id.clone(), name);
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"style" => current = None,
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(styles)
}

/// Accumulates one body paragraph while its XML is read.
#[derive(Debug, Default)]
struct ParagraphScan {
    /// Stack depth right after the `w:p` start tag.
    depth: usize,
    style_id: Option<String>,
    text: String,
    has_graphic: bool,
    embeds: Vec<String>,
}

impl ParagraphScan {
    fn in_non_text(&self, stack: &[Vec<u8>]) -> bool {
        stack[self.depth.min(stack.len())..]
            .iter()
            .any(|n| NON_TEXT_CONTAINERS.iter().any(|c| *c == n.as_slice()))
    }

    /// Handle a start or empty element found inside the paragraph.
    fn element(&mut self, e: &BytesStart<'_>, stack: &[Vec<u8>]) -> Result<(), quick_xml::Error> {
        let parent = stack.last().map(Vec::as_slice);
        match e.local_name().as_ref() {
            b"graphicData" => self.has_graphic = true,
            b"blip" => {
                if let Some(id) = attr_value(e, b"embed")? {
                    self.embeds.push(id);
                }
            }
            b"pStyle" if parent == Some(b"pPr".as_slice()) => {
                self.style_id = attr_value(e, b"val")?;
            }
            b"tab" if parent == Some(b"r".as_slice()) && !self.in_non_text(stack) => {
                self.text.push('\t');
            }
            b"br" | b"cr" if parent == Some(b"r".as_slice()) && !self.in_non_text(stack) => {
                self.text.push('\n');
            }
            _ => {}
        }
        Ok(())
    }

    fn into_block(self, styles: &HashMap<String, String>) -> Option<Block> {
        if self.has_graphic {
            return match self.embeds.into_iter().next() {
                Some(relationship_id) => Some(Block::ImageRef { relationship_id }),
                None => {
                    debug!("Paragraph with graphic data but no embedded picture; skipped");
                    None
                }
            };
        }

        let text = self.text.trim().to_string();
        if text.is_empty() {
            return Some(Block::Paragraph { text });
        }

        let style_name = self
            .style_id
            .as_deref()
            .map(|id| styles.get(id).map(String::as_str).unwrap_or(id))
            .unwrap_or("Normal");
        Some(match heading_level(style_name) {
            Some(level) => Block::Heading { level, text },
            None => Block::Paragraph { text },
        })
    }
}

/// Heading level (1–3) implied by a style name, if any.
pub fn heading_level(style_name: &str) -> Option<u8> {
    let lower = style_name.to_lowercase();
    (1..=3u8).find(|level| lower.starts_with(&format!("heading {level}")))
}

/// Parse the main document part into blocks.
pub fn parse_blocks(
    xml: &str,
    styles: &HashMap<String, String>,
) -> Result<Vec<Block>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut blocks = Vec::new();
    let mut para: Option<ParagraphScan> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                let at_body = stack.last().map(Vec::as_slice) == Some(b"body".as_slice());
                if name == b"p" && at_body && para.is_none() {
                    para = Some(ParagraphScan {
                        depth: stack.len() + 1,
                        ..Default::default()
                    });
                } else if let Some(p) = para.as_mut() {
                    p.element(&e, &stack)?;
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                let at_body = stack.last().map(Vec::as_slice) == Some(b"body".as_slice());
                if let Some(p) = para.as_mut() {
                    p.element(&e, &stack)?;
                } else if at_body && e.local_name().as_ref() == b"p" {
                    blocks.push(Block::Paragraph {
                        text: String::new(),
                    });
                }
            }
            Event::Text(t) => {
                if let Some(p) = para.as_mut() {
                    if stack.last().map(Vec::as_slice) == Some(b"t".as_slice())
                        && !p.in_non_text(&stack)
                    {
                        p.text.push_str(&t.unescape()?);
                    }
                }
            }
            Event::End(_) => {
                stack.pop();
                if para.as_ref().is_some_and(|p| stack.len() + 1 == p.depth) {
                    if let Some(block) = para.take().and_then(|p| p.into_block(styles)) {
                        blocks.push(block);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(blocks)
}
