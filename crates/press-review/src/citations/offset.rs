//! Character-offset citation placement.

use super::{CitationStrategy, Insertion};
use crate::document::Attestation;

/// Trailing characters skipped when looking for the insertion point.
const TRAILING_BLANKS: &[char] = &[' ', '\t', '\r'];

/// Places the first source of each span at the end of the line holding the
/// span's end.
///
/// Attaching to the line rather than the exact offset keeps citations in the
/// right place when the generator's offsets drift by a few characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct OffsetStrategy;

#[derive(Debug, Clone, Copy)]
struct Accepted<'a> {
    start: usize,
    end: usize,
    url: &'a str,
}

impl CitationStrategy for OffsetStrategy {
    fn insertions(&self, body: &str, attestations: &[Attestation]) -> Vec<Insertion> {
        let char_len = body.chars().count();

        let mut spans: Vec<Accepted<'_>> = attestations
            .iter()
            .filter_map(|a| {
                let span = a.span?;
                let url = a.urls().into_iter().next()?;
                if span.start < 0 || span.end < span.start {
                    return None;
                }
                let start = usize::try_from(span.start).ok()?;
                let end = usize::try_from(span.end).ok()?;
                if end > char_len {
                    return None;
                }
                Some(Accepted { start, end, url })
            })
            .collect();

        // Longer span first among equal starts; stable, so ties keep declaration order.
        spans.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then_with(|| (b.end - b.start).cmp(&(a.end - a.start)))
        });

        let mut accepted: Vec<Accepted<'_>> = Vec::with_capacity(spans.len());
        for span in spans {
            if let Some(last) = accepted.last() {
                if span.start >= last.start && span.end <= last.end {
                    continue;
                }
            }
            accepted.push(span);
        }

        // Positions are resolved against the original body, so working from
        // the end never shifts a span that is still pending.
        accepted.sort_by(|a, b| b.end.cmp(&a.end));

        let mut insertions: Vec<Insertion> = accepted
            .iter()
            .map(|span| Insertion {
                at: line_insertion_point(body, char_to_byte(body, span.end)),
                urls: vec![span.url.to_string()],
            })
            .collect();

        // Within one insertion point, list sources in reading order.
        insertions.reverse();
        insertions
    }
}

/// Byte index of the `chars`-th character, or the body length past the end.
fn char_to_byte(body: &str, chars: usize) -> usize {
    body.char_indices()
        .nth(chars)
        .map_or(body.len(), |(byte, _)| byte)
}

/// End of the line containing `byte`, moved back over trailing blanks.
fn line_insertion_point(body: &str, byte: usize) -> usize {
    let line_end = body[byte..].find('\n').map_or(body.len(), |i| byte + i);
    body[..line_end].trim_end_matches(TRAILING_BLANKS).len()
}
