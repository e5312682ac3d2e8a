//! Content generation.
//!
//! A [`ContentGenerator`] turns a [`PromptConfig`] into a
//! [`GeneratedDocument`]: the digest body plus whatever grounding the
//! backend attached to it.

pub mod gemini;
pub mod prompt;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::document::GeneratedDocument;
use crate::error::GenerationError;

pub use gemini::GeminiClient;
pub use prompt::GenerationRequest;

/// Default generation model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Default number of days the digest looks back.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 5;

/// Default number of news items.
pub const DEFAULT_ITEM_COUNT: u32 = 10;

/// Default digest subject.
pub const DEFAULT_TOPIC: &str = "AI";

/// Minimum number of items that must cover a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryQuota {
    pub name: String,
    pub min_items: u32,
}

impl CategoryQuota {
    pub fn new(name: impl Into<String>, min_items: u32) -> Self {
        Self {
            name: name.into(),
            min_items,
        }
    }
}

/// Everything that shapes one generation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptConfig {
    pub topic: String,
    /// Only news published after this date.
    pub cutoff: NaiveDate,
    pub item_count: u32,
    pub quotas: Vec<CategoryQuota>,
    pub model: String,
    pub temperature: f32,
}

impl PromptConfig {
    /// Config for `topic` with the standard category mix and a cutoff
    /// `lookback_days` before today (UTC).
    pub fn new(topic: impl Into<String>, lookback_days: u32) -> Self {
        let topic = topic.into();
        let today = Utc::now().date_naive();
        Self {
            quotas: default_quotas(&topic),
            cutoff: today
                .checked_sub_signed(chrono::Duration::days(i64::from(lookback_days)))
                .unwrap_or(NaiveDate::MIN),
            item_count: DEFAULT_ITEM_COUNT,
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            topic,
        }
    }

    /// Change the subject; the category mix follows it.
    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self.quotas = default_quotas(&self.topic);
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn with_item_count(mut self, item_count: u32) -> Self {
        self.item_count = item_count;
        self
    }

    #[must_use]
    pub fn with_cutoff(mut self, cutoff: NaiveDate) -> Self {
        self.cutoff = cutoff;
        self
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC, DEFAULT_LOOKBACK_DAYS)
    }
}

fn default_quotas(topic: &str) -> Vec<CategoryQuota> {
    vec![
        CategoryQuota::new(format!("{topic} in Europe"), 2),
        CategoryQuota::new(format!("{topic} for Medicine & Healthcare"), 2),
    ]
}

/// Backend that writes the digest.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Get the name of this generator.
    fn name(&self) -> &'static str;

    /// Generate one candidate document.
    ///
    /// A response without usable text is [`GenerationError::Failed`].
    async fn generate(&self, config: &PromptConfig) -> Result<GeneratedDocument, GenerationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PromptConfig::default();
        assert_eq!(config.topic, "AI");
        assert_eq!(config.item_count, 10);
        assert_eq!(config.model, "gemini-2.5-flash");
        assert!((config.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(
            config.quotas,
            vec![
                CategoryQuota::new("AI in Europe", 2),
                CategoryQuota::new("AI for Medicine & Healthcare", 2),
            ]
        );
        assert_eq!(
            Utc::now().date_naive() - config.cutoff,
            chrono::Duration::days(5)
        );
    }

    #[test]
    fn test_huge_lookback_saturates() {
        let config = PromptConfig::new("AI", u32::MAX);
        assert_eq!(config.cutoff, NaiveDate::MIN);
    }

    #[test]
    fn test_builders() {
        let cutoff = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let config = PromptConfig::new("Robotics", 7)
            .with_model("gemini-2.5-pro")
            .with_temperature(0.5)
            .with_item_count(6)
            .with_cutoff(cutoff);

        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.item_count, 6);
        assert_eq!(config.cutoff, cutoff);
        assert_eq!(config.quotas[0].name, "Robotics in Europe");

        let config = config.with_topic("Space");
        assert_eq!(config.quotas[1].name, "Space for Medicine & Healthcare");
        assert_eq!(config.cutoff, cutoff);
    }
}
