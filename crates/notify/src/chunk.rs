//! Splitting documents into transport-sized blocks.
//!
//! Blocks are cut on paragraph (blank-line) boundaries and packed greedily.
//! A paragraph larger than the limit is delivered as its own oversized block
//! rather than truncated.

use serde::{Deserialize, Serialize};

/// Separator placed between paragraphs packed into the same block.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// One transport-sized chunk of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryBlock {
    text: String,
}

impl DeliveryBlock {
    /// Wrap a piece of text as a single block, unchecked against any limit.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Text carried by this block.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Size in characters, the unit the transport limit is expressed in.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// The paragraphs packed into this block, in order.
    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.text.split(PARAGRAPH_SEPARATOR)
    }
}

/// Split `text` into paragraphs: runs of lines separated by blank lines.
///
/// Lines containing only whitespace count as blank. Paragraph-internal line
/// breaks are kept.
#[must_use]
pub fn paragraphs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        out.push(current.join("\n"));
    }

    out
}

/// Pack the paragraphs of `text` into blocks of at most `max_chars` characters.
///
/// Order is preserved and no block is empty. A `max_chars` of zero is treated
/// as one so every paragraph still ends up somewhere.
#[must_use]
pub fn chunk(text: &str, max_chars: usize) -> Vec<DeliveryBlock> {
    let limit = max_chars.max(1);
    let separator_len = PARAGRAPH_SEPARATOR.chars().count();

    let mut blocks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for paragraph in paragraphs(text) {
        let len = paragraph.chars().count();

        if current.is_empty() {
            current = paragraph;
            current_len = len;
            continue;
        }

        if current_len + separator_len + len <= limit {
            current.push_str(PARAGRAPH_SEPARATOR);
            current.push_str(&paragraph);
            current_len += separator_len + len;
        } else {
            blocks.push(DeliveryBlock::new(std::mem::take(&mut current)));
            current = paragraph;
            current_len = len;
        }
    }

    if !current.is_empty() {
        blocks.push(DeliveryBlock::new(current));
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraphs_ignore_whitespace_only_lines() {
        let text = "first line\nsecond line\n  \n\nthird\n";
        assert_eq!(paragraphs(text), vec!["first line\nsecond line", "third"]);
    }

    #[test]
    fn test_small_document_is_single_block() {
        let blocks = chunk("one\n\ntwo", 100);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text(), "one\n\ntwo");
    }

    #[test]
    fn test_three_paragraphs_over_limit_split() {
        let a = "a".repeat(40);
        let b = "b".repeat(40);
        let c = "c".repeat(40);
        let text = format!("{a}\n\n{b}\n\n{c}");

        let blocks = chunk(&text, 100);

        assert!(blocks.len() >= 2);
        assert!(blocks.iter().all(|b| !b.text().is_empty()));
        assert!(blocks.iter().all(|b| b.char_len() <= 100));

        let rebuilt: Vec<&str> = blocks.iter().flat_map(DeliveryBlock::paragraphs).collect();
        assert_eq!(rebuilt, vec![a.as_str(), b.as_str(), c.as_str()]);
    }

    #[test]
    fn test_oversized_paragraph_is_kept_whole() {
        let big = "x".repeat(250);
        let text = format!("short\n\n{big}\n\ntail");

        let blocks = chunk(&text, 100);

        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[1].text(), big);
        assert_eq!(blocks[1].char_len(), 250);
    }

    #[test]
    fn test_limit_counts_characters_not_bytes() {
        let para = "é".repeat(10);
        let text = format!("{para}\n\n{para}");

        // 10 + 2 + 10 characters, far more bytes
        let blocks = chunk(&text, 22);
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn test_empty_text_has_no_blocks() {
        assert!(chunk("", 10).is_empty());
        assert!(chunk("\n\n   \n", 10).is_empty());
    }
}
