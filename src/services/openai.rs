use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::OpenAiConfig;
use crate::error::AppResult;

/// Anything that went wrong while asking the model for a schedule.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("could not reach the LLM service: {0}")]
    Transport(String),

    #[error("LLM service rejected the API key (status {0})")]
    Unauthorized(u16),

    #[error("LLM service returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("could not parse LLM response: {0}")]
    Malformed(String),

    #[error("LLM response contained no choices")]
    EmptyResponse,
}

/// Chat-completion boundary used by the planner.
#[async_trait]
pub trait ScheduleGenerator: Send + Sync + 'static {
    async fn generate(&self, system_role: &str, user_prompt: &str)
        -> Result<String, GenerationError>;
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

// ============================================================================
// OpenAI-compatible client
// ============================================================================

#[derive(Debug, Clone)]
pub struct OpenAiService {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiService {
    pub fn new(config: &OpenAiConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl ScheduleGenerator for OpenAiService {
    async fn generate(
        &self,
        system_role: &str,
        user_prompt: &str,
    ) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_role,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
        };

        debug!(model = %self.model, prompt_len = user_prompt.len(), "Sending chat completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 401 || status == 403 {
            return Err(GenerationError::Unauthorized(status));
        }

        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status, body = %message, "LLM service returned error");
            return Err(GenerationError::Api { status, message });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(GenerationError::EmptyResponse)?;

        choice
            .message
            .content
            .ok_or_else(|| GenerationError::Malformed("first choice has no content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(base_url: &str) -> OpenAiService {
        OpenAiService::new(&OpenAiConfig {
            api_key: "sk-test".to_string(),
            base_url: base_url.to_string(),
            model: "gpt-4o".to_string(),
            timeout_seconds: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn returns_first_choice_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o",
                "messages": [
                    {"role": "system", "content": "You're a friendly student planner."},
                    {"role": "user", "content": "plan my week"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "choices": [
                    {"index": 0, "message": {"role": "assistant", "content": "## Monday\n- Study"}},
                    {"index": 1, "message": {"role": "assistant", "content": "ignored"}}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let out = service(&server.uri())
            .generate("You're a friendly student planner.", "plan my week")
            .await
            .unwrap();

        assert_eq!(out, "## Monday\n- Study");
    }

    #[tokio::test]
    async fn status_errors_are_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let err = service(&server.uri()).generate("s", "u").await.unwrap_err();
        match err {
            GenerationError::Api { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "quota exceeded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn bad_key_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = service(&server.uri()).generate("s", "u").await.unwrap_err();
        assert!(matches!(err, GenerationError::Unauthorized(401)));
    }

    #[tokio::test]
    async fn empty_or_malformed_bodies_fail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let svc = service(&server.uri());
        assert!(matches!(
            svc.generate("s", "u").await,
            Err(GenerationError::EmptyResponse)
        ));
        assert!(matches!(
            svc.generate("s", "u").await,
            Err(GenerationError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn transport_failure_is_wrapped() {
        let err = service("http://127.0.0.1:9").generate("s", "u").await.unwrap_err();
        assert!(matches!(err, GenerationError::Transport(_)));
    }
}
