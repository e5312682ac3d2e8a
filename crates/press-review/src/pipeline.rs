//! Generate, annotate and normalize one digest.

use tracing::{info, warn};

use crate::citations::Annotator;
use crate::document::GeneratedDocument;
use crate::error::{GenerationError, WorkflowError};
use crate::generator::{ContentGenerator, PromptConfig};
use crate::markup::normalize;
use crate::retry::{with_bounded_retry, RetryOutcome};

/// A generated document and the text ready for delivery.
#[derive(Debug, Clone)]
pub struct Digest {
    pub document: GeneratedDocument,
    pub text: String,
    /// Generation attempts it took.
    pub attempts: u32,
}

/// Annotate `document` with citation markers, then convert it to mrkdwn.
#[must_use]
pub fn render(document: &GeneratedDocument, annotator: Annotator) -> String {
    let annotated = annotator.annotate(&document.body, &document.attestations);
    normalize(&annotated).trim().to_string()
}

/// Generate a digest, retrying retryable failures up to `max_attempts` times.
pub async fn generate_digest(
    generator: &dyn ContentGenerator,
    prompt: &PromptConfig,
    annotator: Annotator,
    max_attempts: u32,
) -> Result<Digest, WorkflowError> {
    let outcome = with_bounded_retry(
        max_attempts,
        GenerationError::is_retryable,
        move |attempt| {
            info!(attempt, max_attempts, generator = generator.name(), "Generating digest");
            generator.generate(prompt)
        },
    )
    .await;

    match outcome {
        RetryOutcome::Succeeded { value, attempts } => {
            if value.is_ungrounded() {
                warn!("Generated digest carries no grounding; publishing without citations");
            }
            let text = render(&value, annotator);
            info!(attempts, chars = text.chars().count(), "Digest ready");
            Ok(Digest {
                document: value,
                text,
                attempts,
            })
        }
        RetryOutcome::Exhausted { error, attempts } | RetryOutcome::Aborted { error, attempts } => {
            Err(WorkflowError::Generation {
                attempts,
                source: error,
            })
        }
    }
}
