//! Grounding-to-citation annotation.
//!
//! Both strategies resolve attestations to insertion points in the
//! *original* body; a single splicer then writes the markers. Markers are
//! pure insertions: every character of the body survives, in order, and no
//! marker text is ever scanned for further matches.
//!
//! Malformed or unusable attestations are dropped silently, so annotation
//! never fails. With nothing usable the body comes back unchanged.

mod offset;
mod substring;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::document::Attestation;

pub use offset::OffsetStrategy;
pub use substring::SubstringStrategy;

/// Characters after which a marker is glued on without a separating space.
const NO_SPACE_AFTER: &[char] = &[' ', '\t', '\n', '\r', '(', '[', '{', '"', '\''];

/// How attestations are located in the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CitationMode {
    /// Substring when any attestation carries match text, offsets otherwise.
    #[default]
    Auto,
    /// Match the exact supported text.
    Substring,
    /// Use character offsets into the original body.
    Offset,
}

impl CitationMode {
    /// Resolve `Auto` against the attestations actually received.
    #[must_use]
    pub fn resolve(self, attestations: &[Attestation]) -> Self {
        match self {
            Self::Auto if attestations.iter().any(|a| a.text().is_some()) => Self::Substring,
            Self::Auto => Self::Offset,
            other => other,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Substring => "substring",
            Self::Offset => "offset",
        }
    }
}

impl fmt::Display for CitationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CitationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "substring" | "text" => Ok(Self::Substring),
            "offset" | "offsets" => Ok(Self::Offset),
            other => Err(format!(
                "unknown citation mode '{other}' (expected auto, substring or offset)"
            )),
        }
    }
}

/// A marker to place at byte position `at` of the original body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    pub at: usize,
    pub urls: Vec<String>,
}

/// Strategy for turning attestations into insertion points.
pub trait CitationStrategy {
    /// Insertion points against `body`, in priority order.
    fn insertions(&self, body: &str, attestations: &[Attestation]) -> Vec<Insertion>;
}

/// Inline marker for one source.
#[must_use]
pub fn marker(url: &str) -> String {
    format!("[<{url}|source>]")
}

/// Annotates documents with citation markers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Annotator {
    mode: CitationMode,
}

impl Annotator {
    #[must_use]
    pub const fn new(mode: CitationMode) -> Self {
        Self { mode }
    }

    #[must_use]
    pub const fn mode(&self) -> CitationMode {
        self.mode
    }

    /// Insert citation markers into `body`.
    #[must_use]
    pub fn annotate(&self, body: &str, attestations: &[Attestation]) -> String {
        if attestations.is_empty() {
            return body.to_string();
        }

        let mode = self.mode.resolve(attestations);
        let insertions = match mode {
            CitationMode::Offset => OffsetStrategy.insertions(body, attestations),
            _ => SubstringStrategy.insertions(body, attestations),
        };

        tracing::debug!(
            mode = %mode,
            attestations = attestations.len(),
            insertions = insertions.len(),
            "Resolved citation insertions"
        );

        splice(body, &insertions)
    }
}

/// Annotate with automatic mode selection.
#[must_use]
pub fn annotate(body: &str, attestations: &[Attestation]) -> String {
    Annotator::default().annotate(body, attestations)
}

/// Write the markers into a copy of `body`.
///
/// Insertions sharing a position are merged into one marker group with
/// repeated URLs dropped. Positions that are out of range or not on a char
/// boundary are ignored.
fn splice(body: &str, insertions: &[Insertion]) -> String {
    let mut points: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
    for insertion in insertions {
        if insertion.at > body.len() || !body.is_char_boundary(insertion.at) {
            continue;
        }
        let urls = points.entry(insertion.at).or_default();
        for url in &insertion.urls {
            if !url.is_empty() && !urls.contains(&url.as_str()) {
                urls.push(url);
            }
        }
    }

    let extra: usize = points
        .values()
        .flat_map(|urls| urls.iter().map(|u| u.len() + 12))
        .sum();
    let mut out = String::with_capacity(body.len() + extra);
    let mut cursor = 0;

    for (at, urls) in points {
        if urls.is_empty() {
            continue;
        }
        out.push_str(&body[cursor..at]);
        cursor = at;

        let glue = body[..at]
            .chars()
            .next_back()
            .is_some_and(|c| !NO_SPACE_AFTER.contains(&c));
        if glue {
            out.push(' ');
        }

        let group: Vec<String> = urls.iter().map(|u| marker(u)).collect();
        out.push_str(&group.join(" "));
    }
    out.push_str(&body[cursor..]);

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_attestations_are_noop() {
        assert_eq!(annotate("Some body.", &[]), "Some body.");
    }

    #[test]
    fn test_missing_substring_is_noop() {
        let atts = vec![Attestation::for_text("Goodbye", ["http://a"])];
        assert_eq!(annotate("Hello world", &atts), "Hello world");
    }

    #[test]
    fn test_multi_source_formatting() {
        let atts = vec![Attestation::for_text("Fact.", ["http://a", "http://b"])];
        assert_eq!(
            annotate("Fact.", &atts),
            "Fact. [<http://a|source>] [<http://b|source>]"
        );
    }

    #[test]
    fn test_repeated_url_across_attestations_for_same_match() {
        let atts = vec![
            Attestation::for_text("Fact.", ["http://a"]),
            Attestation::for_text("Fact.", ["http://a", "http://b"]),
        ];
        assert_eq!(
            annotate("Fact.", &atts),
            "Fact. [<http://a|source>] [<http://b|source>]"
        );
    }

    #[test]
    fn test_auto_mode_prefers_substring_when_text_present() {
        let atts = vec![
            Attestation::for_span(0, 2, ["http://a"]),
            Attestation::for_text("B", ["http://b"]),
        ];
        assert_eq!(CitationMode::Auto.resolve(&atts), CitationMode::Substring);
        assert_eq!(
            CitationMode::Auto.resolve(&[Attestation::for_span(0, 1, ["http://a"])]),
            CitationMode::Offset
        );
        assert_eq!(CitationMode::Offset.resolve(&atts), CitationMode::Offset);
    }

    #[test]
    fn test_forced_offset_mode_ignores_text() {
        let atts = vec![Attestation::for_text("line one", ["http://a"]).with_span(0, 4)];
        let out = Annotator::new(CitationMode::Offset).annotate("line one\nline two", &atts);
        assert_eq!(out, "line one [<http://a|source>]\nline two");
    }

    #[test]
    fn test_no_space_after_opening_bracket() {
        let out = splice(
            "see (",
            &[Insertion {
                at: 5,
                urls: vec!["http://a".into()],
            }],
        );
        assert_eq!(out, "see ([<http://a|source>]");
    }

    #[test]
    fn test_splice_ignores_bad_positions() {
        let body = "é";
        let out = splice(
            body,
            &[
                Insertion {
                    at: 1,
                    urls: vec!["http://a".into()],
                },
                Insertion {
                    at: 99,
                    urls: vec!["http://b".into()],
                },
            ],
        );
        assert_eq!(out, body);
    }

    #[test]
    fn test_citation_mode_parsing() {
        assert_eq!("auto".parse::<CitationMode>(), Ok(CitationMode::Auto));
        assert_eq!(" Offset ".parse::<CitationMode>(), Ok(CitationMode::Offset));
        assert_eq!("substring".parse::<CitationMode>(), Ok(CitationMode::Substring));
        assert!("exact".parse::<CitationMode>().is_err());
    }
}
