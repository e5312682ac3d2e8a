//! Slack request signing.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Signature scheme version prefix.
const VERSION: &str = "v0";

/// Requests older (or newer) than this are rejected as replays.
pub const MAX_TIMESTAMP_SKEW_SECS: i64 = 300;

/// Header carrying the request signature.
pub const SIGNATURE_HEADER: &str = "x-slack-signature";

/// Header carrying the request timestamp (Unix seconds).
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

/// Compute the `v0=<hex>` signature of `body` sent at `timestamp`.
#[must_use]
pub fn sign(secret: &str, timestamp: &str, body: &[u8]) -> String {
    format!("{VERSION}={}", hex::encode(mac(secret, timestamp, body)))
}

fn mac(secret: &str, timestamp: &str, body: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return Vec::new();
    };
    mac.update(VERSION.as_bytes());
    mac.update(b":");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    mac.finalize().into_bytes().to_vec()
}

/// Verify a Slack request signature.
///
/// # Arguments
/// * `body` - Raw request body bytes
/// * `timestamp` - Value of `X-Slack-Request-Timestamp`
/// * `signature` - Value of `X-Slack-Signature` (`v0=<hex>`)
/// * `secret` - App signing secret
/// * `now` - Current Unix time in seconds
#[must_use]
pub fn verify_slack_signature(
    body: &[u8],
    timestamp: &str,
    signature: &str,
    secret: &str,
    now: i64,
) -> bool {
    let Ok(sent_at) = timestamp.trim().parse::<i64>() else {
        return false;
    };
    if (now - sent_at).abs() > MAX_TIMESTAMP_SKEW_SECS {
        return false;
    }

    let Some(hex_signature) = signature
        .strip_prefix(VERSION)
        .and_then(|rest| rest.strip_prefix('='))
    else {
        return false;
    };
    let Ok(signature_bytes) = hex::decode(hex_signature) else {
        return false;
    };

    let computed = mac(secret, timestamp, body);
    !computed.is_empty() && bool::from(computed.as_slice().ct_eq(&signature_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";
    const NOW: i64 = 1_531_420_618;

    #[test]
    fn test_valid_signature() {
        let body = b"payload=%7B%7D";
        let signature = sign(SECRET, "1531420618", body);

        assert!(signature.starts_with("v0="));
        assert!(verify_slack_signature(body, "1531420618", &signature, SECRET, NOW));
    }

    #[test]
    fn test_tampered_body() {
        let signature = sign(SECRET, "1531420618", b"payload=a");
        assert!(!verify_slack_signature(b"payload=b", "1531420618", &signature, SECRET, NOW));
    }

    #[test]
    fn test_wrong_secret() {
        let signature = sign("other-secret", "1531420618", b"body");
        assert!(!verify_slack_signature(b"body", "1531420618", &signature, SECRET, NOW));
    }

    #[test]
    fn test_stale_timestamp() {
        let signature = sign(SECRET, "1531420000", b"body");
        // 618 seconds old
        assert!(!verify_slack_signature(b"body", "1531420000", &signature, SECRET, NOW));
        assert!(verify_slack_signature(b"body", "1531420000", &signature, SECRET, 1_531_420_300));
    }

    #[test]
    fn test_malformed_headers() {
        let signature = sign(SECRET, "1531420618", b"body");
        let bare_hex = signature.trim_start_matches("v0=");

        assert!(!verify_slack_signature(b"body", "1531420618", bare_hex, SECRET, NOW));
        assert!(!verify_slack_signature(b"body", "1531420618", "v0=not-hex", SECRET, NOW));
        assert!(!verify_slack_signature(b"body", "yesterday", &signature, SECRET, NOW));
        assert!(!verify_slack_signature(b"body", "1531420618", "v1=00", SECRET, NOW));
    }
}
