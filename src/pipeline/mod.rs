//! Pipeline stages for DOCX-to-Markdown conversion.
//!
//! Each submodule implements exactly one transformation step and is
//! testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ package ──▶ extract ──▶ walk ──▶ markdown
//! (.docx)   (zip+xml)   (temp files)  │
//!                                     ▼
//!                      encode ──▶ describe ──▶ language ──▶ postprocess
//!                      (base64)   (VLM)        (detect/translate) (cleanup)
//! ```
//!
//! 1. [`input`]: discover `.docx` files and check the ZIP magic bytes
//! 2. [`package`]: open the package, read relationships, styles and body
//!    blocks; runs in `spawn_blocking` because zip and XML parsing are
//!    synchronous
//! 3. [`extract`]: write every embedded image to the document's temp scope
//! 4. [`walk`]: emit Markdown in document order with a running context
//! 5. [`encode`]: read an extracted image and base64-wrap it for the
//!    multimodal request body
//! 6. [`describe`]: one vision-model call per image; the only stage besides
//!    translation with network I/O
//! 7. [`language`]: detect the description language and translate into the
//!    target language when needed
//! 8. [`postprocess`]: deterministic cleanup of model quirks

pub mod describe;
pub mod encode;
pub mod extract;
pub mod input;
pub mod language;
pub mod package;
pub mod postprocess;
pub mod walk;

#[cfg(test)]
pub(crate) mod fixtures;
