//! Slack Web API delivery channel.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::blocks::{fallback_text, layout_messages, SlackBlock};
use crate::channels::{DeliveryChannel, DeliveryId, DeliveryReceipt};
use crate::chunk::DeliveryBlock;
use crate::error::DeliveryError;

/// Default Slack Web API base URL.
pub const SLACK_API_BASE_URL: &str = "https://slack.com/api";

/// Slack channel backed by a bot token.
pub struct SlackClient {
    token: String,
    base_url: String,
    client: reqwest::Client,
}

impl SlackClient {
    /// Create a client for the public Slack API.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: SLACK_API_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the client at a different API root (proxies, tests).
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Call a Web API method with a JSON body and decode the envelope.
    async fn call<T: Serialize + Sync>(
        &self,
        method: &str,
        body: &T,
    ) -> Result<SlackResponse, DeliveryError> {
        let url = format!("{}/{method}", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(1);
            warn!(method, retry_after_secs, "Slack rate limited request");
            return Err(DeliveryError::RateLimited { retry_after_secs });
        }

        let text = response.text().await?;
        if !status.is_success() {
            warn!(method, status = %status, body = %text, "Slack request failed");
            return Err(DeliveryError::Status {
                method: method.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        let envelope: SlackResponse = serde_json::from_str(&text)?;
        if !envelope.ok {
            let error = envelope
                .error
                .clone()
                .unwrap_or_else(|| "unknown_error".to_string());
            warn!(method, error = %error, "Slack API returned an error");
            return Err(DeliveryError::Api {
                method: method.to_string(),
                error,
            });
        }

        Ok(envelope)
    }

    async fn post_message(
        &self,
        channel: &str,
        blocks: Vec<SlackBlock>,
    ) -> Result<DeliveryId, DeliveryError> {
        let request = PostMessageRequest {
            channel,
            text: fallback_text(&blocks),
            blocks,
            mrkdwn: true,
            unfurl_links: false,
            unfurl_media: false,
        };

        let response = self.call("chat.postMessage", &request).await?;
        let ts = response.ts.ok_or_else(|| DeliveryError::Api {
            method: "chat.postMessage".to_string(),
            error: "missing_ts".to_string(),
        })?;

        Ok(DeliveryId {
            channel: response.channel.unwrap_or_else(|| channel.to_string()),
            ts,
        })
    }
}

#[async_trait]
impl DeliveryChannel for SlackClient {
    fn name(&self) -> &'static str {
        "slack"
    }

    async fn post(
        &self,
        destination: &str,
        blocks: &[DeliveryBlock],
        interactive: bool,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        if blocks.is_empty() {
            return Err(DeliveryError::Empty);
        }

        let messages = layout_messages(blocks, interactive);
        let message_count = messages.len();
        let mut last = None;
        let mut consumed = 0;

        for (index, message) in messages.into_iter().enumerate() {
            let sections = message
                .iter()
                .filter(|b| matches!(b, SlackBlock::Section { .. }))
                .count();

            debug!(
                channel = "slack",
                destination,
                part = index + 1,
                parts = message_count,
                interactive,
                "Posting message"
            );

            let id = self.post_message(destination, message).await?;
            last = Some((id, consumed..consumed + sections));
            consumed += sections;
        }

        let (id, range) = last.ok_or(DeliveryError::Empty)?;
        debug!(channel = "slack", message = %id, "Message delivered");

        Ok(DeliveryReceipt {
            id,
            blocks: blocks[range].to_vec(),
        })
    }

    async fn update(&self, receipt: &DeliveryReceipt, status: &str) -> Result<(), DeliveryError> {
        let mut blocks: Vec<SlackBlock> = receipt
            .blocks
            .iter()
            .map(|b| SlackBlock::section(b.text()))
            .collect();
        blocks.push(SlackBlock::Divider);
        blocks.push(SlackBlock::context(status));

        let request = UpdateMessageRequest {
            channel: &receipt.id.channel,
            ts: &receipt.id.ts,
            text: status.to_string(),
            blocks,
        };

        self.call("chat.update", &request).await?;
        debug!(channel = "slack", message = %receipt.id, status, "Message updated");
        Ok(())
    }
}

// =============================================================================
// Slack API types
// =============================================================================

#[derive(Debug, Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: String,
    blocks: Vec<SlackBlock>,
    mrkdwn: bool,
    unfurl_links: bool,
    unfurl_media: bool,
}

#[derive(Debug, Serialize)]
struct UpdateMessageRequest<'a> {
    channel: &'a str,
    ts: &'a str,
    text: String,
    blocks: Vec<SlackBlock>,
}

#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = SlackClient::new("xoxb-test").with_base_url("http://localhost:1234/api/");
        assert_eq!(client.base_url, "http://localhost:1234/api");
    }

    #[test]
    fn test_post_request_disables_unfurling() {
        let request = PostMessageRequest {
            channel: "C1",
            text: "fallback".to_string(),
            blocks: vec![SlackBlock::section("body")],
            mrkdwn: true,
            unfurl_links: false,
            unfurl_media: false,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["unfurl_links"], false);
        assert_eq!(json["unfurl_media"], false);
        assert_eq!(json["mrkdwn"], true);
        assert_eq!(json["blocks"][0]["type"], "section");
    }

    #[test]
    fn test_error_envelope_decodes() {
        let response: SlackResponse =
            serde_json::from_str(r#"{"ok":false,"error":"channel_not_found"}"#).unwrap();
        assert!(!response.ok);
        assert_eq!(response.error.as_deref(), Some("channel_not_found"));
        assert!(response.ts.is_none());
    }
}
