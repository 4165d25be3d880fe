//! Error type for the chat endpoint.
//!
//! Every failure is rendered as `{ "reply": ... }` so the client can always
//! decode the body. Provider detail is logged and never sent to the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use crate::api::ChatReply;
use crate::llm::ProviderError;

pub const MESSAGE_REQUIRED: &str = "Message is required";
pub const PROCESSING_FAILED: &str = "Failed to process request";

#[derive(Debug, Error)]
pub enum ChatError {
    /// The request carried no usable `message`.
    #[error("message is required")]
    Validation,

    /// The completion provider could not produce a reply.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The request body was the JSON literal `null`.
    #[error("request body is null")]
    NullBody,

    /// The request body could not be read as JSON.
    #[error("malformed request body: {0}")]
    Body(#[from] serde_json::Error),
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let (status, reply) = match &self {
            ChatError::Validation => (StatusCode::BAD_REQUEST, MESSAGE_REQUIRED),
            ChatError::Provider(e) => {
                error!(error = %e, "completion provider error");
                (StatusCode::INTERNAL_SERVER_ERROR, PROCESSING_FAILED)
            }
            ChatError::NullBody => {
                error!("chat request body is null");
                (StatusCode::INTERNAL_SERVER_ERROR, PROCESSING_FAILED)
            }
            ChatError::Body(e) => {
                error!(error = %e, "failed to decode chat request");
                (StatusCode::INTERNAL_SERVER_ERROR, PROCESSING_FAILED)
            }
        };

        (
            status,
            Json(ChatReply {
                reply: reply.to_string(),
            }),
        )
            .into_response()
    }
}
