use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::response::AiResponseEnvelope;

/// Raw text used when the backend answers without any candidate text.
pub const NO_RESPONSE_TEXT: &str = "[No response]";

pub const DEFAULT_PERSONA_PROMPT: &str = "You are a warm, supportive mental health companion for students. \
Reply to the user's message helpfully and briefly.\n\n\
You MUST end every reply with a single JSON object on its own line, after a blank line, \
with no markdown and no code fences:\n\
{\"user_mood_analysis\": \"<Mood>\", \"crisis_detected\": \"<true|false>\"}\n\n\
<Mood> is one of: Happy, Calm, Sad, Anxious, Stressed, Neutral.\n\
Set crisis_detected to \"true\" only when the user expresses intent to harm themselves or others.\n\n\
Example:\n\
I understand you're feeling stressed. A few slow, deep breaths can help.\n\n\
{\"user_mood_analysis\": \"Stressed\", \"crisis_detected\": \"false\"}";

/// The generative backend as seen by the chat pipeline: one message in, one
/// raw reply out.
#[async_trait]
pub trait CompanionBackend: Send + Sync {
    async fn generate(&self, user_message: &str) -> Result<AiResponseEnvelope>;
}

#[derive(Clone)]
pub struct GeminiClient {
    endpoint: String,
    api_key: String,
    persona_prompt: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl GeminiClient {
    pub fn new(
        endpoint: String,
        api_key: String,
        persona_prompt: String,
        client: reqwest::Client,
    ) -> Self {
        Self {
            endpoint,
            api_key,
            persona_prompt,
            client,
        }
    }

    pub fn from_config(config: &AppConfig, client: reqwest::Client) -> Self {
        Self::new(
            config.generate_content_url(),
            config.llm_api_key.clone().unwrap_or_default(),
            config.persona_prompt.clone(),
            client,
        )
    }

    /// Fixed persona part first, then the user's latest message.
    fn build_request(&self, user_message: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        text: Some(self.persona_prompt.clone()),
                    },
                    Part {
                        text: Some(user_message.to_string()),
                    },
                ],
            }],
        }
    }

    async fn generate_content(&self, user_message: &str) -> Result<String> {
        if self.api_key.is_empty() {
            anyhow::bail!("Generative backend API key is not configured");
        }

        let request = self.build_request(user_message);

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send generateContent request")?;

        // Check for HTTP errors and include response body for debugging
        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            anyhow::bail!("Generative API returned error {}: {}", status, body);
        }

        let completion: GenerateContentResponse = response
            .json()
            .await
            .context("Failed to parse generateContent response")?;

        Ok(first_candidate_text(&completion).unwrap_or_else(|| NO_RESPONSE_TEXT.to_string()))
    }
}

fn first_candidate_text(response: &GenerateContentResponse) -> Option<String> {
    response
        .candidates
        .first()?
        .content
        .as_ref()?
        .parts
        .first()?
        .text
        .clone()
        .filter(|text| !text.is_empty())
}

#[async_trait]
impl CompanionBackend for GeminiClient {
    async fn generate(&self, user_message: &str) -> Result<AiResponseEnvelope> {
        tracing::debug!("Calling generative backend ({} chars)", user_message.len());
        let raw_text = self.generate_content(user_message).await?;
        Ok(AiResponseEnvelope::new(raw_text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GeminiClient {
        GeminiClient::new(
            "http://127.0.0.1:9/v1beta/models/test:generateContent".to_string(),
            "key".to_string(),
            "persona".to_string(),
            reqwest::Client::new(),
        )
    }

    #[test]
    fn request_body_has_persona_then_message() {
        let body = serde_json::to_value(client().build_request("I feel tired"))
            .expect("serialize request");
        assert_eq!(
            body,
            serde_json::json!({
                "contents": [{
                    "parts": [
                        {"text": "persona"},
                        {"text": "I feel tired"}
                    ]
                }]
            })
        );
    }

    #[test]
    fn extracts_first_candidate_text() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [
                {"content": {"parts": [{"text": "first"}, {"text": "second"}], "role": "model"}},
                {"content": {"parts": [{"text": "other"}]}}
            ],
            "usageMetadata": {"totalTokenCount": 12}
        }))
        .expect("parse response");
        assert_eq!(first_candidate_text(&response).as_deref(), Some("first"));
    }

    #[test]
    fn missing_text_yields_none() {
        let empty: GenerateContentResponse =
            serde_json::from_value(serde_json::json!({})).expect("parse empty");
        assert_eq!(first_candidate_text(&empty), None);

        let blocked: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .expect("parse blocked");
        assert_eq!(first_candidate_text(&blocked), None);
    }

    #[test]
    fn default_persona_describes_payload_contract() {
        assert!(DEFAULT_PERSONA_PROMPT.contains("\"user_mood_analysis\""));
        assert!(DEFAULT_PERSONA_PROMPT.contains("\"crisis_detected\""));
    }

    #[tokio::test]
    async fn missing_api_key_is_an_error() {
        let client = GeminiClient::new(
            "http://127.0.0.1:9/unused".to_string(),
            String::new(),
            "persona".to_string(),
            reqwest::Client::new(),
        );
        let err = client.generate("hello").await.expect_err("no key configured");
        assert!(err.to_string().contains("API key"));
    }
}
