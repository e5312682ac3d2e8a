//! Markdown to Slack mrkdwn normalization.
//!
//! Generators answer in Markdown; Slack renders its own dialect. The rewrite
//! is line-oriented and idempotent:
//!
//! - `**bold**` becomes `*bold*`
//! - `## Heading` / `### Heading` become a bold line
//! - `*` and `•` bullets become `-`
//! - a `-` list marker is followed by exactly one space

use regex::{Captures, Regex};
use std::sync::LazyLock;

static DOUBLE_EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());

static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#{2,3} (.+)$").unwrap());

static SPACED_BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([ \t]*)[*•][ \t]+").unwrap());

static TIGHT_DOT_BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([ \t]*)•(\S)").unwrap());

static DASH_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([ \t]*)-[ \t]*([^\s-])").unwrap());

/// Rewrite `text` into Slack mrkdwn.
#[must_use]
pub fn normalize(text: &str) -> String {
    let mut out = text.to_string();

    // Nested or adjacent pairs ("****x****") need more than one pass.
    while DOUBLE_EMPHASIS.is_match(&out) {
        out = DOUBLE_EMPHASIS.replace_all(&out, "*$1*").into_owned();
    }

    out = HEADING
        .replace_all(&out, |caps: &Captures<'_>| {
            let title = caps[1].trim_matches(|c: char| c == '*' || c.is_whitespace());
            if title.is_empty() {
                caps[0].to_string()
            } else {
                format!("*{title}*")
            }
        })
        .into_owned();

    out = SPACED_BULLET.replace_all(&out, "${1}- ").into_owned();
    out = TIGHT_DOT_BULLET.replace_all(&out, "${1}- ${2}").into_owned();
    DASH_ITEM.replace_all(&out, "${1}- ${2}").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings_become_bold() {
        assert_eq!(normalize("## Europe\n### Health"), "*Europe*\n*Health*");
    }

    #[test]
    fn test_heading_with_bold_markup_is_not_double_wrapped() {
        assert_eq!(normalize("## **Europe**"), "*Europe*");
    }

    #[test]
    fn test_deeper_headings_are_left_alone() {
        assert_eq!(normalize("#### Four"), "#### Four");
        assert_eq!(normalize("# One"), "# One");
    }

    #[test]
    fn test_double_emphasis_becomes_single() {
        assert_eq!(
            normalize("A **big** and **bold** claim"),
            "A *big* and *bold* claim"
        );
        assert_eq!(normalize("****x****"), "*x*");
    }

    #[test]
    fn test_bullets_become_dashes() {
        assert_eq!(normalize("* one\n*   two\n• three"), "- one\n- two\n- three");
        assert_eq!(normalize("  * nested"), "  - nested");
    }

    #[test]
    fn test_bold_title_line_is_not_a_bullet() {
        assert_eq!(normalize("*Title*\nBody."), "*Title*\nBody.");
    }

    #[test]
    fn test_list_marker_gets_exactly_one_space() {
        assert_eq!(normalize("-*Title*"), "- *Title*");
        assert_eq!(normalize("-    *Title*"), "- *Title*");
        assert_eq!(normalize("•Item"), "- Item");
    }

    #[test]
    fn test_rules_and_dashes_inside_text_are_kept() {
        assert_eq!(normalize("---"), "---");
        assert_eq!(normalize("well-known fact"), "well-known fact");
    }

    #[test]
    fn test_full_digest_sample() {
        let input = "## AI WEEKLY\n\n* **Model launch**\nTwo sentences here.\n\n-**Policy**\nMore.";
        let expected = "*AI WEEKLY*\n\n- *Model launch*\nTwo sentences here.\n\n- *Policy*\nMore.";
        assert_eq!(normalize(input), expected);
    }

    #[test]
    fn test_idempotent_on_samples() {
        for sample in [
            "## **a** b",
            "* * *",
            "•-x",
            "** x**",
            "## a**b",
            "-\t\tx\n  •y\n### ",
        ] {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "sample {sample:?}");
        }
    }
}
