//! `POST /api/chat`: forward one message to the completion provider.

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use tracing::{debug, info};

use crate::api::{ChatReply, CHAT_PATH};
use crate::server::error::ChatError;
use crate::server::state::AppState;

/// Register chat routes.
pub fn router() -> Router<AppState> {
    Router::new().route(CHAT_PATH, post(chat))
}

/// The text to forward, or `None` when `message` is absent or falsy
/// (`null`, `false`, `0`, `""`). Bodies that are not objects carry no
/// `message` at all.
fn message_text(body: &Value) -> Option<String> {
    match body.get("message")? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

async fn chat(State(state): State<AppState>, body: Bytes) -> Result<Json<ChatReply>, ChatError> {
    let body: Value = serde_json::from_slice(&body)?;
    if body.is_null() {
        return Err(ChatError::NullBody);
    }
    let message = message_text(&body).ok_or(ChatError::Validation)?;

    debug!(message_len = message.len(), "chat request");

    let reply = state.provider.complete(&message).await?;

    info!(reply_len = reply.len(), "chat reply sent");
    Ok(Json(ChatReply { reply }))
}
