use crate::config::ProviderConfig;
use crate::events::Role;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Reply used when the provider answers without any usable content.
pub const NO_RESPONSE: &str = "No response";

pub const TEMPERATURE: f32 = 1.0;
pub const MAX_COMPLETION_TOKENS: u32 = 1024;
pub const TOP_P: f32 = 1.0;

/// Errors raised while talking to the completion provider
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no API key configured (set {0})")]
    MissingApiKey(String),

    #[error("request to provider failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("provider response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Message in the outbound conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: Role,
    pub content: String,
}

/// Request body for an OpenAI-compatible chat completion
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub messages: Vec<LlmMessage>,
    pub model: String,
    pub temperature: f32,
    pub max_completion_tokens: u32,
    pub top_p: f32,
}

impl CompletionRequest {
    /// Single-turn request with the fixed sampling parameters
    pub fn single_turn(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            messages: vec![LlmMessage {
                role: Role::User,
                content: message.into(),
            }],
            model: model.into(),
            temperature: TEMPERATURE,
            max_completion_tokens: MAX_COMPLETION_TOKENS,
            top_p: TOP_P,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Option<Vec<Choice>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl CompletionResponse {
    /// Content of the first choice, or [`NO_RESPONSE`] when there is none
    pub fn reply(&self) -> String {
        self.choices
            .as_deref()
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.message.as_ref())
            .and_then(|message| message.content.as_deref())
            .filter(|content| !content.is_empty())
            .unwrap_or(NO_RESPONSE)
            .to_string()
    }
}

/// Anything that can turn a single user message into a reply
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, message: &str) -> Result<String, ProviderError>;
}

/// HTTP client for an OpenAI-compatible completion endpoint
#[derive(Clone)]
pub struct LlmClient {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl LlmClient {
    pub fn new(config: ProviderConfig) -> anyhow::Result<Self> {
        // No explicit timeout: the provider call relies on client defaults.
        let client = reqwest::Client::builder().build()?;

        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Send one completion request and decode the response body
    pub async fn send(&self, request: &CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::MissingApiKey(self.config.api_key_env.clone()))?;

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ProviderError::Status { status, body });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl CompletionProvider for LlmClient {
    async fn complete(&self, message: &str) -> Result<String, ProviderError> {
        let request = CompletionRequest::single_turn(&self.config.model, message);
        let response = self.send(&request).await?;
        let reply = response.reply();

        debug!(model = %self.config.model, reply_len = reply.len(), "completion received");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn provider_config(base_url: String, api_key: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            base_url,
            api_key: api_key.map(str::to_string),
            ..ProviderConfig::default()
        }
    }

    #[test]
    fn request_carries_fixed_parameters() {
        let request = CompletionRequest::single_turn("llama-3.3-70b-versatile", "hello");
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value,
            json!({
                "messages": [{ "role": "user", "content": "hello" }],
                "model": "llama-3.3-70b-versatile",
                "temperature": 1.0,
                "max_completion_tokens": 1024,
                "top_p": 1.0,
            })
        );
    }

    #[test]
    fn reply_falls_back_when_choices_missing() {
        let empty: CompletionResponse = serde_json::from_value(json!({ "choices": [] })).unwrap();
        let absent: CompletionResponse = serde_json::from_value(json!({})).unwrap();
        let null_content: CompletionResponse =
            serde_json::from_value(json!({ "choices": [{ "message": { "content": null } }] })).unwrap();
        let blank_content: CompletionResponse =
            serde_json::from_value(json!({ "choices": [{ "message": { "content": "" } }] })).unwrap();

        assert_eq!(empty.reply(), NO_RESPONSE);
        assert_eq!(absent.reply(), NO_RESPONSE);
        assert_eq!(null_content.reply(), NO_RESPONSE);
        assert_eq!(blank_content.reply(), NO_RESPONSE);
    }

    #[test]
    fn reply_uses_first_choice() {
        let response: CompletionResponse = serde_json::from_value(json!({
            "choices": [
                { "message": { "role": "assistant", "content": "first" } },
                { "message": { "role": "assistant", "content": "second" } },
            ]
        }))
        .unwrap();

        assert_eq!(response.reply(), "first");
    }

    #[tokio::test]
    async fn complete_posts_single_turn_with_bearer_auth() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer gsk-test")
            .match_body(Matcher::PartialJson(json!({
                "messages": [{ "role": "user", "content": "hello" }],
                "model": "llama-3.3-70b-versatile",
                "max_completion_tokens": 1024,
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"hi there"}}]}"#)
            .create_async()
            .await;

        let client = LlmClient::new(provider_config(server.url(), Some("gsk-test"))).unwrap();
        let reply = client.complete("hello").await.unwrap();

        assert_eq!(reply, "hi there");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error":{"message":"Invalid API Key"}}"#)
            .create_async()
            .await;

        let client = LlmClient::new(provider_config(server.url(), Some("bad"))).unwrap();
        let err = client.complete("hello").await.unwrap_err();

        assert!(matches!(err, ProviderError::Status { status, .. } if status.as_u16() == 401));
    }

    #[tokio::test]
    async fn malformed_body_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let client = LlmClient::new(provider_config(server.url(), Some("gsk-test"))).unwrap();
        let err = client.complete("hello").await.unwrap_err();

        assert!(matches!(err, ProviderError::Decode(_)));
    }

    #[tokio::test]
    async fn missing_key_fails_without_network_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .expect(0)
            .create_async()
            .await;

        let client = LlmClient::new(provider_config(server.url(), None)).unwrap();
        let err = client.complete("hello").await.unwrap_err();

        assert!(matches!(err, ProviderError::MissingApiKey(ref env) if env == "GROQ_API_KEY"));
        mock.assert_async().await;
    }
}
