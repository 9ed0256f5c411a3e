use anyhow::Result;

use super::{LlmProvider, LlmRequest, LlmResponse, UsageMetadata};

/// Offline provider returning a canned post, used by `adapter = "stub"` and tests.
///
/// The reply is built from the first line of the prompt so each article gets
/// distinct content.
#[derive(Debug, Clone, Default)]
pub struct StubLlmProvider;

impl StubLlmProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl LlmProvider for StubLlmProvider {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
        let topic = request
            .prompt
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("AI news")
            .trim_start_matches("Title:")
            .trim()
            .to_string();

        let body = serde_json::json!({
            "content": format!(
                "{}\n\nWhat this means for people teams: AI keeps changing how we hire and grow talent.",
                topic
            ),
            "hashtags": ["#AI", "#HRTech", "#FutureOfWork"],
            "image_prompt": format!("Abstract illustration about {}", topic),
        });

        Ok(LlmResponse {
            content: body.to_string(),
            usage: UsageMetadata::default(),
            model: "stub".to_string(),
        })
    }
}
