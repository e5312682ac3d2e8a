//! Message delivery for the press review.
//!
//! This crate turns a finished document into transport-sized blocks and
//! delivers them through Slack, either as plain content or as a review
//! message carrying approve/regenerate actions.
//!
//! # Usage
//!
//! ```no_run
//! use notify::{DeliveryChannel, SlackClient, DEFAULT_MAX_BLOCK_CHARS};
//!
//! # async fn run() -> Result<(), notify::DeliveryError> {
//! let slack = SlackClient::new("xoxb-...");
//! let receipt = slack
//!     .post_text("C0123456", "*Weekly*\n\n- *Item*", DEFAULT_MAX_BLOCK_CHARS, true)
//!     .await?;
//! slack.update(&receipt, ":white_check_mark: Approved").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`chunk`] splits text on paragraph boundaries into [`DeliveryBlock`]s
//! - [`DeliveryChannel`] defines posting and update-in-place
//! - [`SlackClient`] implements it over `chat.postMessage` / `chat.update`

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod blocks;
pub mod channels;
pub mod chunk;
pub mod error;

pub use blocks::{ACTION_APPROVE, ACTION_REGENERATE};
pub use channels::slack::SlackClient;
pub use channels::{DeliveryChannel, DeliveryId, DeliveryReceipt};
pub use chunk::{chunk, DeliveryBlock};
pub use error::DeliveryError;

/// Slack caps mrkdwn section text at this many characters.
pub const DEFAULT_MAX_BLOCK_CHARS: usize = 3000;
