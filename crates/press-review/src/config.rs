//! Environment configuration.
//!
//! Everything is read once at startup. Each command loads only the sections
//! it needs, so `preview` runs with nothing but a Gemini key.

use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::citations::CitationMode;
use crate::error::ConfigError;
use crate::generator::{
    PromptConfig, DEFAULT_ITEM_COUNT, DEFAULT_LOOKBACK_DAYS, DEFAULT_MODEL, DEFAULT_TEMPERATURE,
    DEFAULT_TOPIC,
};
use crate::retry::DEFAULT_MAX_ATTEMPTS;

/// Default review deadline (2 hours).
pub const DEFAULT_REVIEW_TIMEOUT_SECS: u64 = 7200;

/// Default wait-loop poll interval.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;

/// Default progress log interval (5 minutes).
pub const DEFAULT_PROGRESS_INTERVAL_SECS: u64 = 300;

/// Longest accepted review deadline or interval (30 days).
pub const MAX_DURATION_SECS: u64 = 30 * 24 * 60 * 60;

/// Furthest accepted lookback (10 years).
pub const MAX_LOOKBACK_DAYS: u32 = 3650;

/// Default listener bind address.
pub const DEFAULT_INTERACTIONS_ADDR: &str = "0.0.0.0:3000";

/// Generation backend and prompt.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub prompt: PromptConfig,
    pub citation_mode: CitationMode,
    pub max_attempts: u32,
}

impl GenerationConfig {
    /// # Required Environment Variables
    /// - `GEMINI_API_KEY`
    ///
    /// # Optional Environment Variables
    /// - `DIGEST_TOPIC` (default: AI)
    /// - `DIGEST_MODEL` (default: gemini-2.5-flash)
    /// - `DIGEST_TEMPERATURE` (default: 0.2)
    /// - `DIGEST_LOOKBACK_DAYS` (default: 5)
    /// - `DIGEST_ITEM_COUNT` (default: 10)
    /// - `DIGEST_CITATION_MODE` (default: auto)
    /// - `GEMINI_BASE_URL`
    /// - `GENERATION_MAX_ATTEMPTS` (default: 3)
    pub fn from_lookup<L>(lookup: &L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let api_key = required(lookup, "GEMINI_API_KEY")?;

        let topic = optional(lookup, "DIGEST_TOPIC", DEFAULT_TOPIC.to_string())?;
        let lookback_days = optional(lookup, "DIGEST_LOOKBACK_DAYS", DEFAULT_LOOKBACK_DAYS)?;
        if lookback_days > MAX_LOOKBACK_DAYS {
            return Err(ConfigError::Invalid {
                var: "DIGEST_LOOKBACK_DAYS",
                value: lookback_days.to_string(),
                reason: format!("must be at most {MAX_LOOKBACK_DAYS}"),
            });
        }
        let model = optional(lookup, "DIGEST_MODEL", DEFAULT_MODEL.to_string())?;
        let item_count = positive(lookup, "DIGEST_ITEM_COUNT", DEFAULT_ITEM_COUNT)?;

        let temperature: f32 = optional(lookup, "DIGEST_TEMPERATURE", DEFAULT_TEMPERATURE)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::Invalid {
                var: "DIGEST_TEMPERATURE",
                value: temperature.to_string(),
                reason: "must be between 0 and 2".to_string(),
            });
        }

        Ok(Self {
            api_key,
            base_url: value(lookup, "GEMINI_BASE_URL"),
            prompt: PromptConfig::new(topic, lookback_days)
                .with_model(model)
                .with_temperature(temperature)
                .with_item_count(item_count),
            citation_mode: optional(lookup, "DIGEST_CITATION_MODE", CitationMode::Auto)?,
            max_attempts: positive(lookup, "GENERATION_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?,
        })
    }
}

/// Slack credentials and the publication destination.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    pub bot_token: String,
    pub api_base_url: Option<String>,
    pub main_channel: String,
    pub max_block_chars: usize,
}

impl DeliveryConfig {
    /// # Required Environment Variables
    /// - `SLACK_BOT_TOKEN`
    /// - `SLACK_MAIN_CHANNEL_ID`
    ///
    /// # Optional Environment Variables
    /// - `SLACK_API_BASE_URL`
    /// - `DELIVERY_MAX_BLOCK_CHARS` (default: 3000)
    pub fn from_lookup<L>(lookup: &L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            bot_token: required(lookup, "SLACK_BOT_TOKEN")?,
            main_channel: required(lookup, "SLACK_MAIN_CHANNEL_ID")?,
            api_base_url: value(lookup, "SLACK_API_BASE_URL"),
            max_block_chars: positive(
                lookup,
                "DELIVERY_MAX_BLOCK_CHARS",
                notify::DEFAULT_MAX_BLOCK_CHARS,
            )?,
        })
    }
}

/// Review destination, interaction listener and wait timing.
#[derive(Debug, Clone)]
pub struct ReviewConfig {
    pub signing_secret: String,
    pub review_channel: String,
    pub listen_addr: SocketAddr,
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub progress_interval: Duration,
}

impl ReviewConfig {
    /// # Required Environment Variables
    /// - `SLACK_SIGNING_SECRET`
    /// - `SLACK_REVIEW_CHANNEL_ID`
    ///
    /// # Optional Environment Variables
    /// - `INTERACTIONS_ADDR` (default: 0.0.0.0:3000)
    /// - `REVIEW_TIMEOUT_SECS` (default: 7200)
    /// - `REVIEW_POLL_INTERVAL_SECS` (default: 1)
    /// - `REVIEW_PROGRESS_INTERVAL_SECS` (default: 300)
    pub fn from_lookup<L>(lookup: &L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let default_addr = SocketAddr::from(([0, 0, 0, 0], 3000));
        Ok(Self {
            signing_secret: required(lookup, "SLACK_SIGNING_SECRET")?,
            review_channel: required(lookup, "SLACK_REVIEW_CHANNEL_ID")?,
            listen_addr: optional(lookup, "INTERACTIONS_ADDR", default_addr)?,
            timeout: secs(lookup, "REVIEW_TIMEOUT_SECS", DEFAULT_REVIEW_TIMEOUT_SECS)?,
            poll_interval: secs(lookup, "REVIEW_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?,
            progress_interval: secs(
                lookup,
                "REVIEW_PROGRESS_INTERVAL_SECS",
                DEFAULT_PROGRESS_INTERVAL_SECS,
            )?,
        })
    }
}

/// Full configuration for the review workflow.
#[derive(Debug, Clone)]
pub struct Config {
    pub generation: GenerationConfig,
    pub delivery: DeliveryConfig,
    pub review: ReviewConfig,
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&env_lookup)
    }

    /// Load through `lookup`, which returns the value of a variable if set.
    pub fn from_lookup<L>(lookup: &L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            generation: GenerationConfig::from_lookup(lookup)?,
            delivery: DeliveryConfig::from_lookup(lookup)?,
            review: ReviewConfig::from_lookup(lookup)?,
        })
    }
}

/// Process environment lookup for the `from_lookup` constructors.
pub fn env_lookup(var: &str) -> Option<String> {
    std::env::var(var).ok()
}

/// Set and non-blank value of `var`.
fn value<L>(lookup: &L, var: &str) -> Option<String>
where
    L: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required<L>(lookup: &L, var: &'static str) -> Result<String, ConfigError>
where
    L: Fn(&str) -> Option<String>,
{
    value(lookup, var).ok_or(ConfigError::Missing(var))
}

fn optional<L, T>(lookup: &L, var: &'static str, default: T) -> Result<T, ConfigError>
where
    L: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match value(lookup, var) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value: raw,
        }),
    }
}

/// Like [`optional`], rejecting zero.
fn positive<L, T>(lookup: &L, var: &'static str, default: T) -> Result<T, ConfigError>
where
    L: Fn(&str) -> Option<String>,
    T: FromStr + Default + PartialEq + Display,
    T::Err: Display,
{
    let parsed = optional(lookup, var, default)?;
    if parsed == T::default() {
        return Err(ConfigError::Invalid {
            var,
            value: parsed.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(parsed)
}

fn secs<L>(lookup: &L, var: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    L: Fn(&str) -> Option<String>,
{
    let secs = positive(lookup, var, default)?;
    if secs > MAX_DURATION_SECS {
        return Err(ConfigError::Invalid {
            var,
            value: secs.to_string(),
            reason: format!("must be at most {MAX_DURATION_SECS} seconds"),
        });
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const REQUIRED: &[(&str, &str)] = &[
        ("GEMINI_API_KEY", "gemini-key"),
        ("SLACK_BOT_TOKEN", "xoxb-token"),
        ("SLACK_SIGNING_SECRET", "signing-secret"),
        ("SLACK_MAIN_CHANNEL_ID", "C-MAIN"),
        ("SLACK_REVIEW_CHANNEL_ID", "C-REVIEW"),
    ];

    fn env(extra: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = REQUIRED
            .iter()
            .chain(extra)
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(&env(&[])).unwrap();

        assert_eq!(config.generation.api_key, "gemini-key");
        assert_eq!(config.generation.prompt.model, DEFAULT_MODEL);
        assert_eq!(config.generation.citation_mode, CitationMode::Auto);
        assert_eq!(config.generation.max_attempts, 3);
        assert_eq!(config.delivery.main_channel, "C-MAIN");
        assert_eq!(config.delivery.max_block_chars, 3000);
        assert_eq!(config.review.review_channel, "C-REVIEW");
        assert_eq!(config.review.timeout, Duration::from_secs(7200));
        assert_eq!(config.review.poll_interval, Duration::from_secs(1));
        assert_eq!(config.review.progress_interval, Duration::from_secs(300));
        assert_eq!(
            config.review.listen_addr,
            DEFAULT_INTERACTIONS_ADDR.parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_each_required_variable_is_fatal() {
        for (missing, _) in REQUIRED {
            let vars: HashMap<&str, &str> = REQUIRED
                .iter()
                .copied()
                .filter(|(k, _)| k != missing)
                .collect();
            let lookup = |key: &str| vars.get(key).map(|v| (*v).to_string());

            assert_eq!(
                Config::from_lookup(&lookup).unwrap_err(),
                ConfigError::Missing(*missing)
            );
        }
    }

    #[test]
    fn test_blank_required_is_missing() {
        let err = Config::from_lookup(&env(&[("SLACK_BOT_TOKEN", "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("SLACK_BOT_TOKEN"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(&env(&[
            ("DIGEST_TOPIC", "Robotics"),
            ("DIGEST_ITEM_COUNT", "6"),
            ("DIGEST_CITATION_MODE", "offset"),
            ("REVIEW_TIMEOUT_SECS", "60"),
            ("INTERACTIONS_ADDR", "127.0.0.1:8080"),
            ("GEMINI_BASE_URL", "http://localhost:9000"),
        ]))
        .unwrap();

        assert_eq!(config.generation.prompt.topic, "Robotics");
        assert_eq!(config.generation.prompt.item_count, 6);
        assert_eq!(config.generation.citation_mode, CitationMode::Offset);
        assert_eq!(config.review.timeout, Duration::from_secs(60));
        assert_eq!(config.review.listen_addr.port(), 8080);
        assert_eq!(
            config.generation.base_url.as_deref(),
            Some("http://localhost:9000")
        );
    }

    #[test]
    fn test_unparseable_optional_is_invalid() {
        let err = Config::from_lookup(&env(&[("REVIEW_TIMEOUT_SECS", "two hours")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                var: "REVIEW_TIMEOUT_SECS",
                ..
            }
        ));

        let err = Config::from_lookup(&env(&[("DIGEST_CITATION_MODE", "fuzzy")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                var: "DIGEST_CITATION_MODE",
                ..
            }
        ));
    }

    #[test]
    fn test_zero_intervals_are_invalid() {
        for var in [
            "REVIEW_POLL_INTERVAL_SECS",
            "GENERATION_MAX_ATTEMPTS",
            "DELIVERY_MAX_BLOCK_CHARS",
        ] {
            let err = Config::from_lookup(&env(&[(var, "0")])).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { .. }), "{var}");
        }
    }

    #[test]
    fn test_oversized_durations_are_invalid() {
        for var in [
            "REVIEW_TIMEOUT_SECS",
            "REVIEW_POLL_INTERVAL_SECS",
            "REVIEW_PROGRESS_INTERVAL_SECS",
        ] {
            let lookup = env(&[(var, "18446744073709551615")]);
            assert!(
                matches!(
                    ReviewConfig::from_lookup(&lookup),
                    Err(ConfigError::Invalid { var: v, .. }) if v == var
                ),
                "{var}"
            );
        }

        let lookup = env(&[("REVIEW_TIMEOUT_SECS", "2592000")]);
        assert_eq!(
            ReviewConfig::from_lookup(&lookup).unwrap().timeout,
            Duration::from_secs(MAX_DURATION_SECS)
        );
    }

    #[test]
    fn test_oversized_lookback_is_invalid() {
        let lookup = env(&[("DIGEST_LOOKBACK_DAYS", "4294967295")]);
        assert!(matches!(
            GenerationConfig::from_lookup(&lookup),
            Err(ConfigError::Invalid {
                var: "DIGEST_LOOKBACK_DAYS",
                ..
            })
        ));

        let lookup = env(&[("DIGEST_LOOKBACK_DAYS", "3650")]);
        assert!(GenerationConfig::from_lookup(&lookup).is_ok());
    }

    #[test]
    fn test_temperature_range() {
        let err = Config::from_lookup(&env(&[("DIGEST_TEMPERATURE", "3.5")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                var: "DIGEST_TEMPERATURE",
                ..
            }
        ));
    }

    #[test]
    fn test_preview_needs_only_the_gemini_key() {
        let lookup = |key: &str| (key == "GEMINI_API_KEY").then(|| "k".to_string());
        assert!(GenerationConfig::from_lookup(&lookup).is_ok());
        assert_eq!(
            DeliveryConfig::from_lookup(&lookup).unwrap_err(),
            ConfigError::Missing("SLACK_BOT_TOKEN")
        );
    }
}
