//! Delivery channel implementations.

pub mod slack;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chunk::{chunk, DeliveryBlock};
use crate::error::DeliveryError;

/// Reference to a delivered message, used for update-in-place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeliveryId {
    /// Resolved channel the message landed in (a DM posted to a user id
    /// resolves to a conversation id).
    pub channel: String,
    /// Message timestamp, unique within the channel.
    pub ts: String,
}

impl std::fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.channel, self.ts)
    }
}

/// Result of a post: the reference to the last message plus the content it carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// The last message posted (the one carrying actions when interactive).
    pub id: DeliveryId,
    /// Content blocks of that message, kept so it can be re-rendered.
    pub blocks: Vec<DeliveryBlock>,
}

/// Trait for delivery channels (Slack, etc.).
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Get the name of this channel.
    fn name(&self) -> &'static str;

    /// Post content blocks to `destination`, optionally with review actions.
    async fn post(
        &self,
        destination: &str,
        blocks: &[DeliveryBlock],
        interactive: bool,
    ) -> Result<DeliveryReceipt, DeliveryError>;

    /// Replace the actions of a previously posted message with a status line.
    async fn update(&self, receipt: &DeliveryReceipt, status: &str) -> Result<(), DeliveryError>;

    /// Chunk `text` at `max_chars` and post it.
    async fn post_text(
        &self,
        destination: &str,
        text: &str,
        max_chars: usize,
        interactive: bool,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let blocks = chunk(text, max_chars);
        if blocks.is_empty() {
            return Err(DeliveryError::Empty);
        }
        self.post(destination, &blocks, interactive).await
    }
}
