//! Generated documents and their grounding attestations.

use serde::{Deserialize, Serialize};

/// Character offsets into the original body, `start..end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: i64,
    pub end: i64,
}

impl Span {
    #[must_use]
    pub const fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Length in characters; negative for inverted spans.
    #[must_use]
    pub const fn len(&self) -> i64 {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// A claim that part of the body is supported by one or more sources.
///
/// The location is given as a character span, as the exact supported text,
/// or both. Which one is used depends on the citation mode.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Attestation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_text: Option<String>,
    /// Source URLs in first-seen order.
    #[serde(default)]
    pub source_urls: Vec<String>,
}

impl Attestation {
    /// Attestation located by the exact supported text.
    pub fn for_text<I, S>(text: impl Into<String>, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            span: None,
            match_text: Some(text.into()),
            source_urls: dedup_urls(urls),
        }
    }

    /// Attestation located by character offsets.
    pub fn for_span<I, S>(start: i64, end: i64, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            span: Some(Span::new(start, end)),
            match_text: None,
            source_urls: dedup_urls(urls),
        }
    }

    /// Attach a span to a text-located attestation.
    #[must_use]
    pub fn with_span(mut self, start: i64, end: i64) -> Self {
        self.span = Some(Span::new(start, end));
        self
    }

    /// Match text, if present and not blank.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.match_text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Source URLs with blanks and repeats removed, first-seen order kept.
    #[must_use]
    pub fn urls(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::with_capacity(self.source_urls.len());
        for url in &self.source_urls {
            let url = url.trim();
            if !url.is_empty() && !seen.contains(&url) {
                seen.push(url);
            }
        }
        seen
    }
}

/// Body text plus the attestations the generator returned for it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GeneratedDocument {
    pub body: String,
    #[serde(default)]
    pub attestations: Vec<Attestation>,
}

impl GeneratedDocument {
    pub fn new(body: impl Into<String>, attestations: Vec<Attestation>) -> Self {
        Self {
            body: body.into(),
            attestations,
        }
    }

    /// True when the generator supplied no usable grounding.
    #[must_use]
    pub fn is_ungrounded(&self) -> bool {
        self.attestations.iter().all(|a| a.urls().is_empty())
    }
}

fn dedup_urls<I, S>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut out: Vec<String> = Vec::new();
    for url in urls {
        let url = url.into();
        if !out.contains(&url) {
            out.push(url);
        }
    }
    out
}
