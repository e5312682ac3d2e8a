//! Bounded retry without backoff.

use std::future::Future;
use tracing::{info, warn};

/// Default attempt budget for generation.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// How a bounded retry ended.
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    /// The operation succeeded on attempt `attempts`.
    Succeeded { value: T, attempts: u32 },
    /// Every attempt failed with a retryable error; `error` is the last one.
    Exhausted { error: E, attempts: u32 },
    /// A non-retryable error stopped the loop early.
    Aborted { error: E, attempts: u32 },
}

impl<T, E> RetryOutcome<T, E> {
    /// Attempts made before the loop ended.
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Succeeded { attempts, .. }
            | Self::Exhausted { attempts, .. }
            | Self::Aborted { attempts, .. } => *attempts,
        }
    }

    /// Collapse into a `Result`, keeping the attempt count on failure.
    pub fn into_result(self) -> Result<T, (E, u32)> {
        match self {
            Self::Succeeded { value, .. } => Ok(value),
            Self::Exhausted { error, attempts } | Self::Aborted { error, attempts } => {
                Err((error, attempts))
            }
        }
    }
}

/// Run `op` up to `max_attempts` times (at least once), retrying only while
/// `is_retryable` accepts the error.
pub async fn with_bounded_retry<T, E, F, Fut, R>(
    max_attempts: u32,
    is_retryable: R,
    mut op: F,
) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    info!(attempt, max_attempts, "Succeeded after retry");
                }
                return RetryOutcome::Succeeded {
                    value,
                    attempts: attempt,
                };
            }
            Err(error) if !is_retryable(&error) => {
                warn!(attempt, error = %error, "Non-retryable failure");
                return RetryOutcome::Aborted {
                    error,
                    attempts: attempt,
                };
            }
            Err(error) if attempt >= max_attempts => {
                warn!(attempt, max_attempts, error = %error, "All attempts exhausted");
                return RetryOutcome::Exhausted {
                    error,
                    attempts: attempt,
                };
            }
            Err(error) => {
                warn!(attempt, max_attempts, error = %error, "Attempt failed, retrying");
                attempt += 1;
            }
        }
    }
}
