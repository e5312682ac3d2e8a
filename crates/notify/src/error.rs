//! Error types for message delivery.

use thiserror::Error;

/// Errors that can occur when delivering or updating messages.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API accepted the request but reported a failure (`ok: false`)
    #[error("{method} failed: {error}")]
    Api { method: String, error: String },

    /// Unexpected HTTP status
    #[error("{method} returned {status}: {body}")]
    Status {
        method: String,
        status: u16,
        body: String,
    },

    /// Rate limited by the service
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Nothing to deliver
    #[error("Refusing to post an empty message")]
    Empty,
}
