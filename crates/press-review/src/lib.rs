//! Grounded weekly press review.
//!
//! Generates a news digest with a search-grounded LLM, turns the grounding
//! into inline citations, and gates publication behind a human review in
//! Slack.
//!
//! # Pipeline
//!
//! 1. [`generator`] asks Gemini for the digest and returns a
//!    [`GeneratedDocument`] with its grounding attestations
//! 2. [`citations`] inserts `[<url|source>]` markers where the attestations
//!    point
//! 3. [`markup`] converts Markdown into Slack mrkdwn
//! 4. [`review`] posts the candidate with Approve / Regenerate buttons and
//!    waits for a decision, publishing on approval
//!
//! The [`interactions`] listener receives the button presses.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod citations;
pub mod config;
pub mod document;
pub mod error;
pub mod generator;
pub mod interactions;
pub mod markup;
pub mod pipeline;
pub mod retry;
pub mod review;

pub use citations::{annotate, Annotator, CitationMode};
pub use config::Config;
pub use document::{Attestation, GeneratedDocument, Span};
pub use error::{ConfigError, GenerationError, WorkflowError};
pub use generator::{ContentGenerator, GeminiClient, PromptConfig};
pub use interactions::InteractionListener;
pub use markup::normalize;
pub use pipeline::{generate_digest, Digest};
pub use retry::{with_bounded_retry, RetryOutcome};
pub use review::{
    ActionKind, ActionOutcome, Decision, ReviewAction, ReviewCoordinator, ReviewWorkflow,
    WorkflowOutcome, WorkflowSettings,
};
