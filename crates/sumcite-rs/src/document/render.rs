//! Markdown and structured rendering of block sequences.
//!
//! The markdown form is the exact "Original Article" text shown to the
//! model — every content block carries its `(S<n>)` marker, which is what
//! teaches the model the addressable-ID scheme. Rendering is deterministic
//! for a given block sequence (required for cache-hit equivalence and
//! reproducible tests).
//!
//! The structured form — an ordered list of [`SourceEntry`] — is the
//! `source` field returned to callers and the attribution universe against
//! which summary-block citations are checked.

use super::segment::{Block, BlockKind};
use serde::{Deserialize, Serialize};

/// One `{id, text}` entry of the structured source list.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SourceEntry {
    pub id: String,
    pub text: String,
}

/// Render blocks to the markdown sent to the model.
///
/// Titles render as `# text (S<n>)`, headings as a run of `#` matching
/// their level, sentences as `text (S<n>)`, and blank separators as empty
/// lines. Lines are joined with `\n`.
pub fn render_markdown(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(|block| match block.kind {
            BlockKind::Title => format!("# {} ({})", block.text, block.id),
            BlockKind::Heading(level) => format!(
                "{} {} ({})",
                "#".repeat(usize::from(level)),
                block.text,
                block.id
            ),
            BlockKind::Sentence => format!("{} ({})", block.text, block.id),
            BlockKind::Blank => String::new(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The structured source list for a block sequence. Every block appears,
/// blanks included (their empty text anchors paragraph layout for callers
/// reconstructing the document).
pub fn source_entries(blocks: &[Block]) -> Vec<SourceEntry> {
    blocks
        .iter()
        .map(|block| SourceEntry {
            id: block.id.clone(),
            text: block.text.clone(),
        })
        .collect()
}

/// Render a structured source list back to markdown-ish lines.
///
/// Used for conversations synthesized from pregenerated artifacts, where
/// only the `{id, text}` form survives: each non-empty entry becomes
/// `text (id)`, empty entries become blank lines.
pub fn render_entries(entries: &[SourceEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            if entry.text.is_empty() {
                String::new()
            } else {
                format!("{} ({})", entry.text, entry.id)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The heading level of a rendered markdown line: `Some(n)` for a line
/// opening with `n` `#` characters and a space, `None` otherwise.
pub fn heading_level(line: &str) -> Option<u8> {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if hashes == 0 {
        return None;
    }
    let rest = line.trim_start_matches('#');
    if rest.starts_with(' ') {
        Some(hashes as u8)
    } else {
        None
    }
}

/// Source-block IDs referenced by a summary but absent from the attribution
/// universe. An empty result means every citation resolves.
pub fn unknown_source_refs<'a>(
    referenced: impl IntoIterator<Item = &'a str>,
    entries: &[SourceEntry],
) -> Vec<String> {
    let known: std::collections::HashSet<&str> =
        entries.iter().map(|entry| entry.id.as_str()).collect();
    let mut unknown = Vec::new();
    for id in referenced {
        if !known.contains(id) && !unknown.iter().any(|u| u == id) {
            unknown.push(id.to_string());
        }
    }
    unknown
}
