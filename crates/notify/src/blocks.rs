//! Slack Block Kit payload types.

use serde::Serialize;

use crate::chunk::DeliveryBlock;

/// Action id of the "approve" button on review messages.
pub const ACTION_APPROVE: &str = "approve";

/// Action id of the "regenerate" button on review messages.
pub const ACTION_REGENERATE: &str = "regenerate";

/// Block id of the actions block carrying the review buttons.
pub const REVIEW_ACTIONS_BLOCK_ID: &str = "review_actions";

/// Slack refuses messages with more blocks than this.
pub const MAX_BLOCKS_PER_MESSAGE: usize = 50;

/// A single Block Kit layout block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackBlock {
    /// Section block with text
    Section { text: SlackText },
    /// Divider line
    Divider,
    /// Context block for metadata
    Context { elements: Vec<SlackText> },
    /// Interactive elements
    Actions {
        block_id: String,
        elements: Vec<SlackButton>,
    },
}

impl SlackBlock {
    /// Section holding mrkdwn text.
    pub fn section(text: impl Into<String>) -> Self {
        Self::Section {
            text: SlackText::mrkdwn(text),
        }
    }

    /// Context line holding mrkdwn text.
    pub fn context(text: impl Into<String>) -> Self {
        Self::Context {
            elements: vec![SlackText::mrkdwn(text)],
        }
    }

    /// The approve/regenerate button pair attached to review messages.
    #[must_use]
    pub fn review_actions() -> Self {
        Self::Actions {
            block_id: REVIEW_ACTIONS_BLOCK_ID.to_string(),
            elements: vec![
                SlackButton::new(ACTION_APPROVE, "Approve").primary(),
                SlackButton::new(ACTION_REGENERATE, "Regenerate"),
            ],
        }
    }
}

/// Text object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlackText {
    #[serde(rename = "type")]
    text_type: &'static str,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    emoji: Option<bool>,
}

impl SlackText {
    /// Markdown-formatted text.
    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self {
            text_type: "mrkdwn",
            text: text.into(),
            emoji: None,
        }
    }

    /// Plain text, as required for button labels.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text_type: "plain_text",
            text: text.into(),
            emoji: Some(true),
        }
    }

    /// The raw text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Button element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlackButton {
    #[serde(rename = "type")]
    element_type: &'static str,
    action_id: String,
    text: SlackText,
    value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    style: Option<&'static str>,
}

impl SlackButton {
    fn new(action_id: &str, label: &str) -> Self {
        Self {
            element_type: "button",
            action_id: action_id.to_string(),
            text: SlackText::plain(label),
            value: action_id.to_string(),
            style: None,
        }
    }

    fn primary(mut self) -> Self {
        self.style = Some("primary");
        self
    }

    /// Action id reported back when the button is clicked.
    #[must_use]
    pub fn action_id(&self) -> &str {
        &self.action_id
    }
}

/// Render delivery blocks as mrkdwn sections.
#[must_use]
pub fn content_blocks(blocks: &[DeliveryBlock]) -> Vec<SlackBlock> {
    blocks
        .iter()
        .map(|b| SlackBlock::section(b.text()))
        .collect()
}

/// Group content into per-message block lists.
///
/// Every message stays within [`MAX_BLOCKS_PER_MESSAGE`]; when `interactive`
/// is set the last message keeps room for a divider and the actions block.
#[must_use]
pub fn layout_messages(blocks: &[DeliveryBlock], interactive: bool) -> Vec<Vec<SlackBlock>> {
    let sections = content_blocks(blocks);
    let reserved = if interactive { 2 } else { 0 };

    let mut messages: Vec<Vec<SlackBlock>> = sections
        .chunks(MAX_BLOCKS_PER_MESSAGE)
        .map(<[SlackBlock]>::to_vec)
        .collect();

    if interactive {
        let needs_split = messages
            .last()
            .is_some_and(|last| last.len() + reserved > MAX_BLOCKS_PER_MESSAGE);
        if needs_split {
            if let Some(last) = messages.last_mut() {
                let tail = last.split_off(MAX_BLOCKS_PER_MESSAGE - reserved);
                messages.push(tail);
            }
        }
        if let Some(last) = messages.last_mut() {
            last.push(SlackBlock::Divider);
            last.push(SlackBlock::review_actions());
        }
    }

    messages
}

/// Plain-text fallback shown in notifications for a message.
#[must_use]
pub fn fallback_text(blocks: &[SlackBlock]) -> String {
    const MAX_FALLBACK_CHARS: usize = 150;

    let first = blocks
        .iter()
        .find_map(|b| match b {
            SlackBlock::Section { text } => Some(text.text()),
            _ => None,
        })
        .unwrap_or_default();

    let line = first.lines().next().unwrap_or_default();
    if line.chars().count() <= MAX_FALLBACK_CHARS {
        line.to_string()
    } else {
        let truncated: String = line.chars().take(MAX_FALLBACK_CHARS).collect();
        format!("{truncated}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_actions_serialization() {
        let json = serde_json::to_value(SlackBlock::review_actions()).unwrap();

        assert_eq!(json["type"], "actions");
        assert_eq!(json["block_id"], REVIEW_ACTIONS_BLOCK_ID);
        assert_eq!(json["elements"][0]["action_id"], ACTION_APPROVE);
        assert_eq!(json["elements"][0]["style"], "primary");
        assert_eq!(json["elements"][0]["text"]["type"], "plain_text");
        assert_eq!(json["elements"][1]["action_id"], ACTION_REGENERATE);
        assert!(json["elements"][1].get("style").is_none());
    }

    #[test]
    fn test_section_serialization() {
        let json = serde_json::to_value(SlackBlock::section("*hi*")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "section", "text": {"type": "mrkdwn", "text": "*hi*"}})
        );
    }

    #[test]
    fn test_layout_plain_single_message() {
        let blocks = vec![DeliveryBlock::new("a"), DeliveryBlock::new("b")];
        let messages = layout_messages(&blocks, false);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].len(), 2);
    }

    #[test]
    fn test_layout_interactive_appends_actions_to_last_message() {
        let blocks = vec![DeliveryBlock::new("a")];
        let messages = layout_messages(&blocks, true);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].len(), 3);
        assert_eq!(messages[0][1], SlackBlock::Divider);
        assert_eq!(messages[0][2], SlackBlock::review_actions());
    }

    #[test]
    fn test_layout_respects_block_limit() {
        let blocks: Vec<_> = (0..MAX_BLOCKS_PER_MESSAGE)
            .map(|i| DeliveryBlock::new(format!("p{i}")))
            .collect();

        let messages = layout_messages(&blocks, true);

        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m.len() <= MAX_BLOCKS_PER_MESSAGE));
        assert_eq!(messages[1].last(), Some(&SlackBlock::review_actions()));
    }

    #[test]
    fn test_fallback_text_uses_first_line() {
        let blocks = vec![SlackBlock::section("*Weekly*\nmore"), SlackBlock::Divider];
        assert_eq!(fallback_text(&blocks), "*Weekly*");
        assert_eq!(fallback_text(&[SlackBlock::Divider]), "");
    }
}
