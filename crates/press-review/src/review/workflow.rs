//! The generate → review → publish loop.

use std::sync::Arc;
use std::time::Duration;

use notify::{DeliveryChannel, DeliveryReceipt};
use tokio::time::{interval, interval_at, sleep_until, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::session::{Decision, ReviewCoordinator};
use crate::citations::{Annotator, CitationMode};
use crate::config::{
    Config, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_PROGRESS_INTERVAL_SECS,
    DEFAULT_REVIEW_TIMEOUT_SECS,
};
use crate::error::WorkflowError;
use crate::generator::{ContentGenerator, PromptConfig};
use crate::pipeline::generate_digest;
use crate::retry::DEFAULT_MAX_ATTEMPTS;

/// Knobs for one workflow run.
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub prompt: PromptConfig,
    pub citation_mode: CitationMode,
    pub max_attempts: u32,
    /// Final publication destination.
    pub main_channel: String,
    /// Where candidates are posted for review.
    pub review_channel: String,
    pub max_block_chars: usize,
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub progress_interval: Duration,
}

impl WorkflowSettings {
    /// Defaults for everything but the two destinations.
    pub fn new(main_channel: impl Into<String>, review_channel: impl Into<String>) -> Self {
        Self {
            prompt: PromptConfig::default(),
            citation_mode: CitationMode::Auto,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            main_channel: main_channel.into(),
            review_channel: review_channel.into(),
            max_block_chars: notify::DEFAULT_MAX_BLOCK_CHARS,
            timeout: Duration::from_secs(DEFAULT_REVIEW_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            progress_interval: Duration::from_secs(DEFAULT_PROGRESS_INTERVAL_SECS),
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            prompt: config.generation.prompt.clone(),
            citation_mode: config.generation.citation_mode,
            max_attempts: config.generation.max_attempts,
            main_channel: config.delivery.main_channel.clone(),
            review_channel: config.review.review_channel.clone(),
            max_block_chars: config.delivery.max_block_chars,
            timeout: config.review.timeout,
            poll_interval: config.review.poll_interval,
            progress_interval: config.review.progress_interval,
        }
    }
}

/// How a workflow run ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowOutcome {
    /// Approved and posted to the main destination.
    Published(DeliveryReceipt),
    /// Nobody decided before the deadline.
    TimedOut,
    /// Stopped from outside.
    Cancelled,
}

enum Step {
    Done(WorkflowOutcome),
    Regenerate,
}

/// Drives candidates through review until one is published, the review
/// window closes, or the run is cancelled.
pub struct ReviewWorkflow {
    generator: Arc<dyn ContentGenerator>,
    channel: Arc<dyn DeliveryChannel>,
    coordinator: Arc<ReviewCoordinator>,
    settings: WorkflowSettings,
}

impl ReviewWorkflow {
    pub fn new(
        generator: Arc<dyn ContentGenerator>,
        channel: Arc<dyn DeliveryChannel>,
        coordinator: Arc<ReviewCoordinator>,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            generator,
            channel,
            coordinator,
            settings,
        }
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    /// Run to completion.
    ///
    /// Generation that gives up and a review post that fails end the run
    /// with an error after a best-effort report to the review destination.
    /// A failed publication is reported and the review continues.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<WorkflowOutcome, WorkflowError> {
        let annotator = Annotator::new(self.settings.citation_mode);
        let mut round: u32 = 0;

        loop {
            round += 1;
            info!(round, "Starting review round");

            let generated = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!(round, "Workflow cancelled during generation");
                    return Ok(WorkflowOutcome::Cancelled);
                }
                result = generate_digest(
                    self.generator.as_ref(),
                    &self.settings.prompt,
                    annotator,
                    self.settings.max_attempts,
                ) => result,
            };

            let digest = match generated {
                Ok(digest) => digest,
                Err(e) => {
                    error!(error = %e, "Digest generation failed");
                    self.report(&format!("Press review generation failed: {e}"))
                        .await;
                    return Err(e);
                }
            };

            let receipt = match self
                .channel
                .post_text(
                    &self.settings.review_channel,
                    &digest.text,
                    self.settings.max_block_chars,
                    true,
                )
                .await
            {
                Ok(receipt) => receipt,
                Err(e) => {
                    error!(error = %e, "Failed to post candidate for review");
                    self.report(&format!("Could not post the press review for approval: {e}"))
                        .await;
                    return Err(e.into());
                }
            };

            self.coordinator
                .open(receipt, digest.text, self.settings.timeout);

            match self.await_decision(cancel).await {
                Step::Done(outcome) => return Ok(outcome),
                Step::Regenerate => {}
            }
        }
    }

    /// Wait on the live session until it reaches a decision that ends the round.
    async fn await_decision(&self, cancel: &CancellationToken) -> Step {
        let deadline = instant_after(self.settings.timeout);

        let mut poll = interval(self.settings.poll_interval.min(FAR_FUTURE));
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let progress_every = self.settings.progress_interval.min(FAR_FUTURE);
        let mut progress = interval_at(instant_after(progress_every), progress_every);
        progress.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            match self.coordinator.decision() {
                Some(Decision::Pending) => {}
                Some(Decision::Approved) => {
                    if let Some(receipt) = self.publish().await {
                        self.coordinator.close();
                        return Step::Done(WorkflowOutcome::Published(receipt));
                    }
                    self.coordinator.reopen();
                }
                Some(Decision::Regenerated) => {
                    let user = self.decider();
                    self.resolve(&format!(
                        ":arrows_counterclockwise: Regeneration requested by {user}"
                    ))
                    .await;
                    self.coordinator.close();
                    return Step::Regenerate;
                }
                Some(Decision::TimedOut) => {
                    info!("Review window closed without a decision");
                    self.resolve(":hourglass: Review window closed, digest not published")
                        .await;
                    self.coordinator.close();
                    return Step::Done(WorkflowOutcome::TimedOut);
                }
                None => {
                    warn!("Review session disappeared, starting a new round");
                    return Step::Regenerate;
                }
            }

            tokio::select! {
                () = cancel.cancelled() => {
                    info!("Workflow cancelled while awaiting review");
                    self.resolve(":no_entry_sign: Review cancelled, digest not published")
                        .await;
                    self.coordinator.close();
                    return Step::Done(WorkflowOutcome::Cancelled);
                }
                () = sleep_until(deadline) => {
                    self.coordinator.expire();
                }
                () = self.coordinator.changed() => {}
                _ = poll.tick() => {}
                _ = progress.tick() => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    info!(remaining_secs = remaining.as_secs(), "Still awaiting review decision");
                }
            }
        }
    }

    /// Post the approved candidate to the main destination.
    async fn publish(&self) -> Option<DeliveryReceipt> {
        let session = self.coordinator.snapshot()?;
        let user = self.decider();

        match self
            .channel
            .post_text(
                &self.settings.main_channel,
                &session.candidate,
                self.settings.max_block_chars,
                false,
            )
            .await
        {
            Ok(published) => {
                info!(message = %published.id, approved_by = %user, "Press review published");
                self.resolve(&format!(
                    ":white_check_mark: Approved by {user} and published"
                ))
                .await;
                Some(published)
            }
            Err(e) => {
                error!(error = %e, "Failed to publish approved press review");
                self.report(&format!(
                    "Publishing the approved press review failed: {e}. Approve again to retry."
                ))
                .await;
                None
            }
        }
    }

    /// Mention of whoever decided the live session.
    fn decider(&self) -> String {
        self.coordinator
            .snapshot()
            .and_then(|s| s.decided_by)
            .map_or_else(|| "a reviewer".to_string(), |user| format!("<@{user}>"))
    }

    /// Replace the live review message's actions with `status`. Best effort.
    async fn resolve(&self, status: &str) {
        let Some(session) = self.coordinator.snapshot() else {
            return;
        };
        if let Err(e) = self.channel.update(&session.receipt, status).await {
            warn!(error = %e, message = %session.receipt.id, "Failed to update review message");
        }
    }

    /// Post a visible error to the review destination. Best effort.
    async fn report(&self, message: &str) {
        if let Err(e) = self
            .channel
            .post_text(
                &self.settings.review_channel,
                &format!(":warning: {message}"),
                self.settings.max_block_chars,
                false,
            )
            .await
        {
            warn!(error = %e, "Failed to report error to the review destination");
        }
    }
}

/// Roughly thirty years; stands in for "never" when a delay overflows.
const FAR_FUTURE: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

/// `now + delay`, saturating to a far-future instant instead of overflowing.
fn instant_after(delay: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(delay)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}
