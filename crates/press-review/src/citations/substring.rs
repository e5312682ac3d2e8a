//! Exact-text citation placement.

use std::ops::Range;

use super::{CitationStrategy, Insertion};
use crate::document::Attestation;

/// Places a marker after every occurrence of each attestation's text.
///
/// Longer match texts claim the body first; attestations of equal length
/// keep their declaration order. An occurrence whose end falls strictly
/// inside text already claimed is skipped; one ending exactly where a claim
/// ends shares that claim's marker group.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringStrategy;

impl CitationStrategy for SubstringStrategy {
    fn insertions(&self, body: &str, attestations: &[Attestation]) -> Vec<Insertion> {
        let mut claimed: Vec<Range<usize>> = Vec::new();
        let mut insertions = Vec::new();

        let mut ranked: Vec<(&str, &Attestation)> = attestations
            .iter()
            .filter_map(|a| Some((a.text()?, a)))
            .collect();
        // Stable: ties stay in declaration order
        ranked.sort_by_key(|(needle, _)| std::cmp::Reverse(needle.len()));

        for (needle, attestation) in ranked {
            let urls: Vec<String> = attestation.urls().into_iter().map(String::from).collect();
            if urls.is_empty() {
                continue;
            }

            let occurrences: Vec<Range<usize>> = body
                .match_indices(needle)
                .map(|(start, m)| start..start + m.len())
                .collect();

            for occurrence in occurrences {
                let end = occurrence.end;
                if claimed.iter().any(|c| c.start < end && end < c.end) {
                    continue;
                }
                claimed.push(occurrence);
                insertions.push(Insertion {
                    at: end,
                    urls: urls.clone(),
                });
            }
        }

        insertions
    }
}

#[cfg(test)]
mod tests {
    use super::super::annotate;
    use super::*;

    #[test]
    fn test_every_occurrence_is_annotated() {
        let atts = vec![Attestation::for_text("rose.", ["http://a"])];
        assert_eq!(
            annotate("A rose. Another rose.", &atts),
            "A rose. [<http://a|source>] Another rose. [<http://a|source>]"
        );
    }

    #[test]
    fn test_nested_occurrence_inside_earlier_claim_is_skipped() {
        let body = "Prices rose sharply in March.\nNothing else.";
        let atts = vec![
            Attestation::for_text("Prices rose sharply in March.", ["http://long"]),
            Attestation::for_text("rose sharply", ["http://short"]),
        ];

        let out = annotate(body, &atts);

        assert_eq!(
            out,
            "Prices rose sharply in March. [<http://long|source>]\nNothing else."
        );
    }

    #[test]
    fn test_longer_attestation_wins_regardless_of_order() {
        let body = "Prices rose sharply in March.\nNothing else.";
        let atts = vec![
            Attestation::for_text("rose sharply", ["http://short"]),
            Attestation::for_text("Prices rose sharply in March.", ["http://long"]),
        ];

        assert_eq!(
            annotate(body, &atts),
            "Prices rose sharply in March. [<http://long|source>]\nNothing else."
        );
    }

    #[test]
    fn test_shorter_text_outside_longer_claim_is_kept() {
        let body = "Prices rose sharply in March. Rents rose sharply too.";
        let atts = vec![
            Attestation::for_text("rose sharply", ["http://short"]),
            Attestation::for_text("Prices rose sharply in March.", ["http://long"]),
        ];

        assert_eq!(
            annotate(body, &atts),
            "Prices rose sharply in March. [<http://long|source>] Rents rose sharply [<http://short|source>] too."
        );
    }

    #[test]
    fn test_match_text_trailing_whitespace_is_ignored() {
        let atts = vec![Attestation::for_text("First.\n", ["http://a"])];
        assert_eq!(
            annotate("First.\nSecond.", &atts),
            "First. [<http://a|source>]\nSecond."
        );
    }

    #[test]
    fn test_urls_in_markers_are_not_rematched() {
        // The second needle occurs inside the first attestation's marker URL,
        // never in the body itself.
        let atts = vec![
            Attestation::for_text("Fact.", ["http://example.com/news"]),
            Attestation::for_text("example.com", ["http://b"]),
        ];
        assert_eq!(
            annotate("Fact.", &atts),
            "Fact. [<http://example.com/news|source>]"
        );
    }

    #[test]
    fn test_attestation_without_urls_is_skipped() {
        let atts = vec![Attestation::for_text("Fact.", Vec::<String>::new())];
        assert!(SubstringStrategy.insertions("Fact.", &atts).is_empty());
    }

    #[test]
    fn test_unicode_body() {
        let atts = vec![Attestation::for_text("Zürich.", ["http://z"])];
        assert_eq!(
            annotate("Née à Zürich. Fin", &atts),
            "Née à Zürich. [<http://z|source>] Fin"
        );
    }
}
