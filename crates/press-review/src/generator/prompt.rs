//! Prompt construction.

use handlebars::{no_escape, Handlebars, RenderError};
use serde::Serialize;
use serde_json::json;

use super::PromptConfig;

/// System instruction template; the editor's beat follows the topic.
const SYSTEM_INSTRUCTION_TEMPLATE: &str = "You are a meticulous {{topic}} news editor. Always use Google Search grounding, \
include inline source links, and avoid unverified claims.";

/// User instruction template.
const USER_PROMPT_TEMPLATE: &str = r"Write a press review about the most important {{topic}} news of the current week (news published after {{cutoff}}).
The review must include exactly {{item_count}} distinct news items.
{{#each quotas}}
At least {{this.min_items}} of them must focus on {{this.name}}.
{{/each}}
Each news item must be 2 sentences and MUST include a source web link.
Only use reputable sources. Use web search to find and verify the most important and recent facts.
Use the format '- *Title*' for news titles.
Always start the report with '*{{headline}} WEEKLY REVIEW: AN OVERVIEW OF WHAT HAPPENED THIS WEEK ({{cutoff}})*'.
Then give the news directly, without any introduction.
";

/// Provider-neutral request: instructions, grounding flag and sampling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub model: String,
    pub system_instruction: String,
    pub user_prompt: String,
    pub grounding_enabled: bool,
    pub temperature: f32,
}

impl GenerationRequest {
    /// Build the request for `config`.
    pub fn build(config: &PromptConfig) -> Result<Self, RenderError> {
        Ok(Self {
            model: config.model.clone(),
            system_instruction: render_system_instruction(config)?,
            user_prompt: render_user_prompt(config)?,
            grounding_enabled: true,
            temperature: config.temperature,
        })
    }
}

fn renderer() -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    // Plain text prompt; "&" in category names must survive.
    handlebars.register_escape_fn(no_escape);
    handlebars
}

/// Render the system instruction for `config`.
pub fn render_system_instruction(config: &PromptConfig) -> Result<String, RenderError> {
    renderer().render_template(SYSTEM_INSTRUCTION_TEMPLATE, &json!({ "topic": config.topic }))
}

/// Render the user instruction for `config`.
pub fn render_user_prompt(config: &PromptConfig) -> Result<String, RenderError> {
    let data = json!({
        "topic": config.topic,
        "headline": config.topic.to_uppercase(),
        "cutoff": config.cutoff.format("%Y-%m-%d").to_string(),
        "item_count": config.item_count,
        "quotas": config.quotas,
    });

    renderer().render_template(USER_PROMPT_TEMPLATE, &data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn config() -> PromptConfig {
        PromptConfig::default().with_cutoff(NaiveDate::from_ymd_opt(2025, 6, 9).unwrap())
    }

    #[test]
    fn test_prompt_carries_cutoff_and_count() {
        let prompt = render_user_prompt(&config()).unwrap();

        assert!(prompt.contains("news published after 2025-06-09"));
        assert!(prompt.contains("exactly 10 distinct news items"));
        assert!(prompt.contains(
            "'*AI WEEKLY REVIEW: AN OVERVIEW OF WHAT HAPPENED THIS WEEK (2025-06-09)*'"
        ));
        assert!(prompt.contains("'- *Title*'"));
    }

    #[test]
    fn test_prompt_lists_quotas_unescaped() {
        let prompt = render_user_prompt(&config()).unwrap();

        assert!(prompt.contains("At least 2 of them must focus on AI in Europe."));
        assert!(prompt.contains("At least 2 of them must focus on AI for Medicine & Healthcare."));
        assert!(!prompt.contains("&amp;"));
    }

    #[test]
    fn test_prompt_without_quotas() {
        let mut config = config();
        config.quotas.clear();
        let prompt = render_user_prompt(&config).unwrap();
        assert!(!prompt.contains("At least"));
    }

    #[test]
    fn test_request_enables_grounding() {
        let request = GenerationRequest::build(&config()).unwrap();
        assert!(request.grounding_enabled);
        assert!(request
            .system_instruction
            .starts_with("You are a meticulous AI news editor."));
        assert_eq!(request.model, "gemini-2.5-flash");
    }

    #[test]
    fn test_system_instruction_follows_topic() {
        let request = GenerationRequest::build(&config().with_topic("Robotics")).unwrap();
        assert!(request
            .system_instruction
            .starts_with("You are a meticulous Robotics news editor."));
        assert!(!request.system_instruction.contains("AI news editor"));
    }
}
