//! In-memory `.docx` builders for unit tests.

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const IMAGE_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
pub const STYLES_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
pub const HYPERLINK_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
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

/// JPEG SOI + APP0 marker prefix; enough for format sniffing.
pub const JPEG_HEADER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Wrap body children into a complete `document.xml`.
pub fn body(children: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture" xmlns:v="urn:schemas-microsoft-com:vml" xmlns:c="http://schemas.openxmlformats.org/drawingml/2006/chart"><w:body>{}<w:sectPr/></w:body></w:document>"#,
        children.concat()
    )
}

pub fn paragraph(text: &str) -> String {
    format!(
        r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
        escape(text)
    )
}

pub fn heading(style_id: &str, text: &str) -> String {
    format!(
        r#"<w:p><w:pPr><w:pStyle w:val="{style_id}"/></w:pPr><w:r><w:t>{}</w:t></w:r></w:p>"#,
        escape(text)
    )
}

pub fn image_paragraph(relationship_id: &str) -> String {
    format!(
        r#"<w:p><w:r><w:drawing><wp:inline><wp:docPr id="1" name="Picture 1"/><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture"><pic:pic><pic:blipFill><a:blip r:embed="{relationship_id}"/></pic:blipFill></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#
    )
}

pub fn rels_xml(rels: &[(&str, &str, &str, bool)]) -> String {
    let entries: String = rels
        .iter()
        .map(|(id, ty, target, external)| {
            let mode = if *external { r#" TargetMode="External""# } else { "" };
            format!(r#"<Relationship Id="{id}" Type="{ty}" Target="{target}"{mode}/>"#)
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{entries}</Relationships>"#
    )
}

/// Styles with a localized id for heading 1 and English ids for 2 and 3.
pub fn styles_xml() -> String {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style><w:style w:type="paragraph" w:styleId="Ttulo1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/></w:style><w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/></w:style><w:style w:type="paragraph" w:styleId="Heading3"><w:name w:val="heading 3"/></w:style></w:styles>"#
        .to_string()
}

pub fn zip_entries(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        zip.start_file(*name, SimpleFileOptions::default())
            .expect("start zip entry");
        zip.write_all(data).expect("write zip entry");
    }
    zip.finish().expect("finish zip").into_inner()
}

/// Builder for a minimal but well-formed `.docx`.
#[derive(Default)]
pub struct DocxFixture {
    blocks: Vec<String>,
    rels: Vec<(String, String, String, bool)>,
    media: Vec<(String, Vec<u8>)>,
}

impl DocxFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block(mut self, xml: String) -> Self {
        self.blocks.push(xml);
        self
    }

    /// Add an image paragraph plus its relationship and media part.
    pub fn image(mut self, relationship_id: &str, target: &str, bytes: &[u8]) -> Self {
        self.blocks.push(image_paragraph(relationship_id));
        self.image_part(relationship_id, target, bytes)
    }

    /// Add an image relationship and media part without referencing it.
    pub fn image_part(mut self, relationship_id: &str, target: &str, bytes: &[u8]) -> Self {
        self.rels.push((
            relationship_id.into(),
            IMAGE_REL.into(),
            target.into(),
            false,
        ));
        self.media.push((format!("word/{target}"), bytes.to_vec()));
        self
    }

    pub fn relationship(mut self, id: &str, ty: &str, target: &str, external: bool) -> Self {
        self.rels.push((id.into(), ty.into(), target.into(), external));
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let package_rels = rels_xml(&[("rId1", OFFICE_DOCUMENT_REL, "word/document.xml", false)]);
        let mut rels: Vec<(&str, &str, &str, bool)> =
            vec![("rIdStyles", STYLES_REL, "styles.xml", false)];
        rels.extend(
            self.rels
                .iter()
                .map(|(id, ty, t, ext)| (id.as_str(), ty.as_str(), t.as_str(), *ext)),
        );
        let document_rels = rels_xml(&rels);
        let document = body(&self.blocks);
        let styles = styles_xml();

        let mut entries: Vec<(&str, &[u8])> = vec![
            ("_rels/.rels", package_rels.as_bytes()),
            ("word/document.xml", document.as_bytes()),
            ("word/_rels/document.xml.rels", document_rels.as_bytes()),
            ("word/styles.xml", styles.as_bytes()),
        ];
        for (name, data) in &self.media {
            entries.push((name.as_str(), data.as_slice()));
        }
        zip_entries(&entries)
    }

    pub fn write_to(&self, path: &std::path::Path) {
        std::fs::write(path, self.to_bytes()).expect("write fixture docx");
    }
}
