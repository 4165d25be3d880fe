//! Conversation UI components for chat interface

pub mod composer;
pub mod history;
pub mod indicator;
pub mod manager;

pub use manager::{ConversationAction, ConversationManager, Submission};
