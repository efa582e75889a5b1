//! Deterministic block segmentation of styled paragraphs.
//!
//! A document becomes an ordered sequence of addressable [`Block`]s: the
//! title, each heading, each sentence of body text, and one blank separator
//! after every body paragraph (blanks anchor paragraph breaks in the
//! reconstructed markdown but carry no summarizable content). IDs come from
//! a single counter shared across all block kinds, formatted `S1`, `S2`, …
//! in strict document order — the counter never resets within one pass.
//!
//! Sentence splitting is a deliberate heuristic: body text is split on the
//! literal `.` character and the period is re-appended to each non-empty
//! fragment. Decimal numbers and abbreviations are mis-split. This is an
//! accepted limitation, kept behind [`split_sentences`] so a tokenizer-based
//! splitter can be substituted without touching the rest of the pipeline.

use super::Paragraph;

/// Style name that marks the document title.
const TITLE_STYLE: &str = "Title";

/// Style-name prefix that marks headings (`"Heading 1"`, `"Heading 2"`, …).
const HEADING_STYLE_PREFIX: &str = "Heading";

/// Classification of an addressable block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockKind {
    /// The document title (rendered as a level-1 heading).
    Title,
    /// A heading with its level.
    Heading(u8),
    /// One sentence-like fragment of body text.
    Sentence,
    /// A separator after a body paragraph; no content.
    Blank,
}

/// One addressable unit of source content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    /// Stable identifier, `"S<n>"`, monotonically assigned in document order.
    pub id: String,
    /// Literal content (empty for blank separators).
    pub text: String,
    pub kind: BlockKind,
}

/// Decompose styled paragraphs into addressable blocks.
///
/// Paragraphs whose trimmed text is empty are dropped. `"Title"` becomes a
/// title block, `"Heading N"` a heading block (level parsed from the style
/// name's trailing token, defaulting to 1), and anything else is body text:
/// split into sentence blocks, followed by exactly one blank separator
/// block. Output order is exactly document order.
pub fn segment(paragraphs: &[Paragraph]) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut counter: usize = 0;

    for para in paragraphs {
        let text = para.text.trim();
        if text.is_empty() {
            continue;
        }

        if para.style == TITLE_STYLE {
            counter += 1;
            blocks.push(Block {
                id: block_id(counter),
                text: text.to_string(),
                kind: BlockKind::Title,
            });
        } else if para.style.starts_with(HEADING_STYLE_PREFIX) {
            counter += 1;
            blocks.push(Block {
                id: block_id(counter),
                text: text.to_string(),
                kind: BlockKind::Heading(heading_level_from_style(&para.style)),
            });
        } else {
            for sentence in split_sentences(text) {
                counter += 1;
                blocks.push(Block {
                    id: block_id(counter),
                    text: sentence,
                    kind: BlockKind::Sentence,
                });
            }
            counter += 1;
            blocks.push(Block {
                id: block_id(counter),
                text: String::new(),
                kind: BlockKind::Blank,
            });
        }
    }

    blocks
}

/// The `.`-split sentence heuristic, isolated for substitution.
///
/// Each non-empty trimmed fragment gets its period back, so splitting and
/// rejoining is lossy only in whitespace normalization. Empty fragments
/// (from trailing periods or runs of dots) are dropped and consume no ID.
pub fn split_sentences(text: &str) -> Vec<String> {
    text.split('.')
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .map(|fragment| format!("{fragment}."))
        .collect()
}

fn block_id(n: usize) -> String {
    format!("S{n}")
}

/// Parse the heading level from a style name's trailing token
/// (`"Heading 2"` → 2). Styles with no parseable level become level 1.
fn heading_level_from_style(style: &str) -> u8 {
    style
        .rsplit(' ')
        .next()
        .and_then(|token| token.parse().ok())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_paragraphs() -> Vec<Paragraph> {
        vec![
            Paragraph::new("Title", "Annual Review"),
            Paragraph::new("Heading 2", "Financials"),
            Paragraph::new("Normal", "Revenue grew. Costs fell."),
            Paragraph::new("Normal", "Margins improved."),
        ]
    }

    #[test]
    fn classification_and_order() {
        let blocks = segment(&sample_paragraphs());
        let kinds: Vec<BlockKind> = blocks.iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![
                BlockKind::Title,
                BlockKind::Heading(2),
                BlockKind::Sentence,
                BlockKind::Sentence,
                BlockKind::Blank,
                BlockKind::Sentence,
                BlockKind::Blank,
            ]
        );
    }

    #[test]
    fn ids_are_monotonic_from_one() {
        let blocks = segment(&sample_paragraphs());
        let ids: Vec<&str> = blocks.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["S1", "S2", "S3", "S4", "S5", "S6", "S7"]);
    }

    #[test]
    fn blank_follows_every_body_paragraph_and_nowhere_else() {
        let blocks = segment(&sample_paragraphs());
        for (i, block) in blocks.iter().enumerate() {
            if block.kind == BlockKind::Blank {
                // The preceding block must be the paragraph's last sentence.
                assert_eq!(blocks[i - 1].kind, BlockKind::Sentence);
            }
        }
        // Title and heading blocks are not followed by blanks.
        assert_ne!(blocks[1].kind, BlockKind::Blank);
        assert_eq!(blocks.last().unwrap().kind, BlockKind::Blank);
    }

    #[test]
    fn empty_paragraphs_are_dropped() {
        let paragraphs = vec![
            Paragraph::new("Normal", "   "),
            Paragraph::new("Normal", "Real content."),
            Paragraph::new("Heading 1", ""),
        ];
        let blocks = segment(&paragraphs);
        assert_eq!(blocks.len(), 2); // sentence + blank
        assert_eq!(blocks[0].text, "Real content.");
    }

    #[test]
    fn sentences_get_periods_back() {
        let blocks = segment(&[Paragraph::new("Normal", "First thing. Second thing.")]);
        assert_eq!(blocks[0].text, "First thing.");
        assert_eq!(blocks[1].text, "Second thing.");
    }

    #[test]
    fn decimal_numbers_are_mis_split() {
        // The accepted limitation of the literal-period heuristic.
        let sentences = split_sentences("Pi is 3.14");
        assert_eq!(sentences, vec!["Pi is 3.", "14."]);
    }

    #[test]
    fn runs_of_dots_yield_no_empty_fragments() {
        assert!(split_sentences("...").is_empty());
        assert_eq!(split_sentences("End..."), vec!["End."]);
    }

    #[test]
    fn heading_level_parsed_from_style_suffix() {
        let blocks = segment(&[
            Paragraph::new("Heading 3", "Deep section"),
            Paragraph::new("Heading", "Bare heading"),
        ]);
        assert_eq!(blocks[0].kind, BlockKind::Heading(3));
        assert_eq!(blocks[1].kind, BlockKind::Heading(1));
    }

    #[test]
    fn segmentation_is_deterministic() {
        let paragraphs = sample_paragraphs();
        assert_eq!(segment(&paragraphs), segment(&paragraphs));
    }

    #[test]
    fn ids_strictly_increase_in_document_order() {
        let blocks = segment(&sample_paragraphs());
        let numbers: Vec<usize> = blocks
            .iter()
            .map(|b| b.id.trim_start_matches('S').parse().unwrap())
            .collect();
        assert!(numbers.windows(2).all(|w| w[1] > w[0]));
    }
}
