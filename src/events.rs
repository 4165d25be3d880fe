use crate::api::ClientError;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Internal application events for coordinating between components
#[derive(Debug)]
pub enum AppEvent {
    /// Key press from the terminal
    Key(crossterm::event::KeyEvent),

    /// Bracketed paste
    Paste(String),

    /// Terminal resize; the next draw picks up the new size
    Resize,

    /// Animation tick for the typing indicator
    Tick,

    /// A round trip to the proxy finished
    ReplyReceived {
        seq: u64,
        result: Result<String, ClientError>,
    },
}

/// Role in conversation
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single exchanged message. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
