//! Terminal chat client.

pub mod app;
pub mod conversation;
pub mod markdown;
pub mod onboarding;

pub use app::run;
