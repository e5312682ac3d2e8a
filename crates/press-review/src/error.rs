//! Error types for the press review.

use notify::DeliveryError;
use thiserror::Error;

/// Invalid or missing startup configuration. Always fatal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or empty
    #[error("Required configuration {0} is not set")]
    Missing(&'static str),

    /// A variable is set but cannot be used
    #[error("Invalid value for {var} ({value:?}): {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Errors from the generation backend.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Transient failure: no candidates, empty text, transport or server error
    #[error("Generation failed: {0}")]
    Failed(String),

    /// The backend refused the request
    #[error("Generation request rejected ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// The backend answered with something that is not a generation response
    #[error("Invalid generation response: {0}")]
    InvalidResponse(String),

    /// The prompt could not be rendered
    #[error("Prompt rendering failed: {0}")]
    Prompt(#[from] handlebars::RenderError),
}

impl GenerationError {
    /// Whether another attempt may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Terminal failures of the review workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Generation did not produce a candidate
    #[error("Generation gave up after {attempts} attempt(s): {source}")]
    Generation {
        attempts: u32,
        #[source]
        source: GenerationError,
    },

    /// The candidate could not be posted for review
    #[error("Delivery failed: {0}")]
    Delivery(#[from] DeliveryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_failed_is_retryable() {
        assert!(GenerationError::Failed("no candidates".into()).is_retryable());
        assert!(!GenerationError::Rejected {
            status: 400,
            body: "bad".into()
        }
        .is_retryable());
        assert!(!GenerationError::InvalidResponse("not json".into()).is_retryable());
    }

    #[test]
    fn test_config_error_messages() {
        assert_eq!(
            ConfigError::Missing("GEMINI_API_KEY").to_string(),
            "Required configuration GEMINI_API_KEY is not set"
        );
    }
}
