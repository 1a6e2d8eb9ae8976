//! Document walk: ordered blocks → Markdown, with inline image descriptions.
//!
//! The walk carries one piece of state besides the output buffer: the
//! context cursor, i.e. the text of the most recent non-empty heading or
//! paragraph. Image blocks read it (it is the prompt context) but never
//! move it, so two consecutive screenshots share the same context.

use crate::output::DocumentStats;
use crate::pipeline::describe::ImageEnricher;
use crate::pipeline::extract::RelationshipMap;
use crate::pipeline::package::Block;
use crate::progress::ConversionProgressCallback;
use std::path::Path;
use tracing::{debug, warn};

/// Bold label that opens every image callout.
pub const CALLOUT_LABEL: &str = "**[Descrição da Imagem]**";

/// Markdown produced for one document, plus counters.
#[derive(Debug, Clone, Default)]
pub struct WalkOutput {
    pub markdown: String,
    pub stats: DocumentStats,
}

/// Block-quoted callout wrapping a description or sentinel.
///
/// Carries its own trailing newline; joined with the `"\n\n"` entry
/// separator this leaves two blank lines after every callout.
pub fn format_callout(description: &str) -> String {
    format!("> {CALLOUT_LABEL}: {description}\n")
}

fn format_heading(level: u8, text: &str) -> String {
    format!("{} {}", "#".repeat(level as usize), text)
}

/// Walk `blocks` in order and assemble the document text.
///
/// Every image is described through `enricher` one at a time, in document
/// order. Description failures become sentinel callouts and the walk goes
/// on; only the caller decides what is fatal.
pub async fn walk_document(
    blocks: &[Block],
    images: &RelationshipMap,
    enricher: &dyn ImageEnricher,
    progress: Option<&dyn ConversionProgressCallback>,
    input: &Path,
) -> WalkOutput {
    let total_images = blocks
        .iter()
        .filter(|b| matches!(b, Block::ImageRef { .. }))
        .count();

    let mut entries: Vec<String> = Vec::with_capacity(blocks.len());
    let mut stats = DocumentStats::default();
    let mut context = String::new();
    let mut image_num = 0usize;

    for block in blocks {
        match block {
            Block::Heading { level, text } => {
                entries.push(format_heading(*level, text));
                stats.headings += 1;
                context.clone_from(text);
            }
            Block::Paragraph { text } if text.is_empty() => {}
            Block::Paragraph { text } => {
                entries.push(text.clone());
                stats.paragraphs += 1;
                context.clone_from(text);
            }
            Block::ImageRef { relationship_id } => {
                image_num += 1;
                let Some(asset) = images.get(relationship_id) else {
                    warn!(
                        "{}: image reference '{}' has no extracted asset; skipped",
                        input.display(),
                        relationship_id
                    );
                    continue;
                };

                if let Some(cb) = progress {
                    cb.on_image_start(input, image_num, total_images);
                }
                debug!(
                    "Image {}/{} ({}) with context {:?}",
                    image_num, total_images, relationship_id, context
                );

                let text = match enricher.describe(&asset.path, &context).await {
                    Ok(description) => {
                        stats.images_described += 1;
                        if let Some(cb) = progress {
                            cb.on_image_complete(input, image_num, total_images, description.len());
                        }
                        description
                    }
                    Err(e) => {
                        stats.images_failed += 1;
                        if let Some(cb) = progress {
                            cb.on_image_error(input, image_num, total_images, &e.to_string());
                        }
                        e.sentinel().to_string()
                    }
                };
                entries.push(format_callout(&text));
                stats.images += 1;
            }
        }
    }

    stats.entries = entries.len();
    WalkOutput {
        markdown: entries.join("\n\n"),
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DescriptionError, ANALYSIS_FAILURE_SENTINEL, READ_FAILURE_SENTINEL};
    use crate::pipeline::describe::Description;
    use crate::pipeline::extract::extract_images;
    use crate::pipeline::fixtures::{DocxFixture, PNG_1X1};
    use crate::pipeline::package::{parse_document, DocxPackage};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Replays scripted answers and records `(path, context)` per call.
    struct ScriptedEnricher {
        answers: Mutex<Vec<Description>>,
        calls: Mutex<Vec<(PathBuf, String)>>,
    }

    impl ScriptedEnricher {
        fn new(answers: Vec<Description>) -> Self {
            Self {
                answers: Mutex::new(answers.into_iter().rev().collect()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn contexts(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|(_, c)| c.clone()).collect()
        }
    }

    #[async_trait]
    impl ImageEnricher for ScriptedEnricher {
        async fn describe(&self, image_path: &Path, context: &str) -> Description {
            self.calls
                .lock()
                .unwrap()
                .push((image_path.to_path_buf(), context.to_string()));
            self.answers
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok("default".to_string()))
        }
    }

    fn heading(level: u8, text: &str) -> Block {
        Block::Heading {
            level,
            text: text.into(),
        }
    }

    fn para(text: &str) -> Block {
        Block::Paragraph { text: text.into() }
    }

    fn image(id: &str) -> Block {
        Block::ImageRef {
            relationship_id: id.into(),
        }
    }

    /// Extract real assets for the given ids from an in-memory package.
    fn assets(ids: &[&str], scope: &Path) -> RelationshipMap {
        let mut fixture = DocxFixture::new();
        for (i, id) in ids.iter().enumerate() {
            fixture = fixture.image_part(id, &format!("media/image{i}.png"), PNG_1X1);
        }
        let mut pkg = DocxPackage::from_bytes(Path::new("t.docx"), fixture.to_bytes()).unwrap();
        let doc = parse_document(&mut pkg).unwrap();
        extract_images(&mut pkg, &doc.relationships, doc.base_dir(), scope).unwrap()
    }

    async fn walk(blocks: &[Block], map: &RelationshipMap, enricher: &ScriptedEnricher) -> WalkOutput {
        walk_document(blocks, map, enricher, None, Path::new("doc.docx")).await
    }

    #[tokio::test]
    async fn heading_image_caption_scenario() {
        let scope = tempfile::tempdir().unwrap();
        let map = assets(&["rId1"], scope.path());
        let enricher = ScriptedEnricher::new(vec![Ok("A screenshot.".into())]);

        let out = walk(&[heading(1, "Intro"), image("rId1"), para("caption")], &map, &enricher).await;

        assert_eq!(
            out.markdown,
            "# Intro\n\n> **[Descrição da Imagem]**: A screenshot.\n\n\ncaption"
        );
        assert_eq!(enricher.contexts(), vec!["Intro"]);
        assert_eq!(out.stats.entries, 3);
        assert_eq!(out.stats.images_described, 1);
    }

    #[tokio::test]
    async fn heading_levels_and_order_preserved() {
        let map = RelationshipMap::default();
        let enricher = ScriptedEnricher::new(vec![]);
        let out = walk(
            &[heading(2, "Setup"), para("one"), heading(3, "Detail"), para("two"), heading(1, "End")],
            &map,
            &enricher,
        )
        .await;
        assert_eq!(out.markdown, "## Setup\n\none\n\n### Detail\n\ntwo\n\n# End");
        assert_eq!(out.stats.headings, 3);
        assert_eq!(out.stats.paragraphs, 2);
    }

    #[tokio::test]
    async fn empty_paragraphs_emit_nothing_and_keep_context() {
        let scope = tempfile::tempdir().unwrap();
        let map = assets(&["rId1"], scope.path());
        let enricher = ScriptedEnricher::new(vec![Ok("d".into())]);
        let out = walk(&[para("Open the menu"), para(""), image("rId1")], &map, &enricher).await;

        assert_eq!(enricher.contexts(), vec!["Open the menu"]);
        assert_eq!(out.stats.entries, 2);
        assert!(!out.markdown.contains("\n\n\n\n\n"));
    }

    #[tokio::test]
    async fn context_is_empty_before_any_text_and_not_moved_by_images() {
        let scope = tempfile::tempdir().unwrap();
        let map = assets(&["rId1", "rId2", "rId3"], scope.path());
        let enricher = ScriptedEnricher::new(vec![]);
        walk(
            &[image("rId1"), para("Step 1"), image("rId2"), image("rId3")],
            &map,
            &enricher,
        )
        .await;
        assert_eq!(enricher.contexts(), vec!["", "Step 1", "Step 1"]);
    }

    #[tokio::test]
    async fn enricher_receives_extracted_paths() {
        let scope = tempfile::tempdir().unwrap();
        let map = assets(&["rId7", "rId8"], scope.path());
        let enricher = ScriptedEnricher::new(vec![]);
        walk(&[image("rId8"), image("rId7")], &map, &enricher).await;

        let calls = enricher.calls.lock().unwrap();
        assert_eq!(calls[0].0, map.get("rId8").unwrap().path);
        assert_eq!(calls[1].0, map.get("rId7").unwrap().path);
    }

    #[tokio::test]
    async fn failures_become_sentinels_and_walk_continues() {
        let scope = tempfile::tempdir().unwrap();
        let map = assets(&["rId1", "rId2", "rId3"], scope.path());
        let enricher = ScriptedEnricher::new(vec![
            Err(DescriptionError::ReadFailed {
                path: "x".into(),
                detail: "gone".into(),
            }),
            Err(DescriptionError::Timeout { secs: 300 }),
            Ok("Third.".into()),
        ]);
        let out = walk(
            &[image("rId1"), image("rId2"), image("rId3"), para("after")],
            &map,
            &enricher,
        )
        .await;

        let expected = [
            format_callout(READ_FAILURE_SENTINEL),
            format_callout(ANALYSIS_FAILURE_SENTINEL),
            format_callout("Third."),
            "after".to_string(),
        ]
        .join("\n\n");
        assert_eq!(out.markdown, expected);
        assert_eq!(out.stats.images, 3);
        assert_eq!(out.stats.images_failed, 2);
        assert_eq!(out.stats.images_described, 1);
    }

    #[tokio::test]
    async fn unknown_relationship_is_skipped() {
        let map = RelationshipMap::default();
        let enricher = ScriptedEnricher::new(vec![]);
        let out = walk(&[para("a"), image("rId404"), para("b")], &map, &enricher).await;
        assert_eq!(out.markdown, "a\n\nb");
        assert!(enricher.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_document_is_empty_markdown() {
        let out = walk(&[], &RelationshipMap::default(), &ScriptedEnricher::new(vec![])).await;
        assert_eq!(out.markdown, "");
        assert_eq!(out.stats, DocumentStats::default());
    }
}
