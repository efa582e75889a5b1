//! Document intake: styled paragraphs in, addressable blocks out.
//!
//! The binary document format (docx and friends) is parsed by an external
//! collaborator — all this module needs from it is an ordered sequence of
//! [`Paragraph`]s (style name + text). From there:
//!
//! - [`segment`](segment::segment) decomposes paragraphs into an ordered
//!   sequence of [`Block`](segment::Block)s with stable `S<n>` IDs.
//! - [`render`] turns a block sequence into the markdown sent to the model
//!   as "Original Article" context, and into the structured
//!   `[{id, text}]` source list that is the attribution universe.

pub mod render;
pub mod segment;

pub use render::{
    SourceEntry, heading_level, render_entries, render_markdown, source_entries,
    unknown_source_refs,
};
pub use segment::{Block, BlockKind, segment, split_sentences};

use crate::error::{SumciteError, SumciteResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

// ── Paragraph ──────────────────────────────────────────────────────

/// One styled paragraph as produced by the external document parser.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Paragraph {
    /// Style name, e.g. `"Title"`, `"Heading 2"`, `"Normal"`.
    pub style: String,
    /// The paragraph's literal text.
    pub text: String,
}

impl Paragraph {
    pub fn new(style: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            style: style.into(),
            text: text.into(),
        }
    }
}

// ── Document source ────────────────────────────────────────────────

/// Yields a document's styled paragraphs given its external identifier.
pub trait DocumentSource: Send + Sync {
    fn paragraphs(&self, document_id: &str) -> SumciteResult<Vec<Paragraph>>;
}

/// File-backed document source: `{root}/{document_id}.json`, each file an
/// array of `{style, text}` paragraphs.
pub struct FileDocumentSource {
    root: PathBuf,
}

impl FileDocumentSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DocumentSource for FileDocumentSource {
    fn paragraphs(&self, document_id: &str) -> SumciteResult<Vec<Paragraph>> {
        // Document IDs are caller-supplied; refuse anything that could
        // escape the documents directory.
        if document_id.contains('/') || document_id.contains("..") {
            return Err(SumciteError::DocumentSource(format!(
                "invalid document id: {document_id}"
            )));
        }
        let path = self.root.join(format!("{document_id}.json"));
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            SumciteError::DocumentSource(format!(
                "failed to read document {document_id} at {}: {e}",
                path.display()
            ))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            SumciteError::DocumentSource(format!("malformed document {document_id}: {e}"))
        })
    }
}

/// In-memory document source for tests and demos.
#[derive(Default)]
pub struct MemoryDocumentSource {
    docs: HashMap<String, Vec<Paragraph>>,
}

impl MemoryDocumentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, document_id: impl Into<String>, paragraphs: Vec<Paragraph>) -> Self {
        self.docs.insert(document_id.into(), paragraphs);
        self
    }
}

impl DocumentSource for MemoryDocumentSource {
    fn paragraphs(&self, document_id: &str) -> SumciteResult<Vec<Paragraph>> {
        self.docs.get(document_id).cloned().ok_or_else(|| {
            SumciteError::DocumentSource(format!("unknown document: {document_id}"))
        })
    }
}
