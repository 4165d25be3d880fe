//! Client for the proxy's `POST /api/chat` endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CHAT_PATH: &str = "/api/chat";

/// Why a round trip to the proxy did not produce a reply
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not reach chat server: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("chat server answered {status}: {reply:?}")]
    Status {
        status: reqwest::StatusCode,
        reply: Option<String>,
    },
}

/// Wire shape of a chat request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Wire shape of every chat response, success or failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

/// Sends one user message and resolves to the assistant reply
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send(&self, message: &str) -> Result<String, ClientError>;
}

#[derive(Clone)]
pub struct HttpChatBackend {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpChatBackend {
    pub fn new(server_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            endpoint: format!("{}{}", server_url.trim_end_matches('/'), CHAT_PATH),
            client,
        })
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn send(&self, message: &str) -> Result<String, ClientError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ChatRequest {
                message: message.to_string(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let reply = response.json::<ChatReply>().await.ok().map(|r| r.reply);
            return Err(ClientError::Status { status, reply });
        }

        Ok(response.json::<ChatReply>().await?.reply)
    }
}
