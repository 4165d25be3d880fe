use crate::api::ClientError;
use crate::events::Message;
use crate::ui::conversation::composer::{ComposerAction, ConversationComposer};
use crate::ui::conversation::history::{ConversationHistory, HistoryView};
use crate::ui::conversation::indicator::TypingIndicator;
use crate::ui::markdown::MarkdownRenderer;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    widgets::Widget,
};
use std::sync::Arc;

/// Assistant message appended when a round trip fails
pub const APOLOGY: &str =
    "I apologize, but I encountered an error. Please try again or refresh the page.";

pub const EMPTY_PLACEHOLDER: &str = "How can I help you today?";
pub const FOLLOW_UP_PLACEHOLDER: &str = "Continue the conversation...";

const SCROLL_STEP: usize = 5;

/// A message that has been echoed locally and must now go to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub seq: u64,
    pub text: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Draft was blank; nothing changed
    Empty,
    /// A reply is still pending; the draft is kept
    Busy,
    Sent(Submission),
}

/// Actions that can be requested by the conversation manager
#[derive(Debug, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Send(Submission),
}

/// Owns the conversation state and keeps the widgets in sync with it
pub struct ConversationManager {
    history: ConversationHistory,
    composer: ConversationComposer,
    indicator: TypingIndicator,
    loading: bool,
    next_seq: u64,
    pending: Option<u64>,
    user_name: String,
    renderer: Arc<dyn MarkdownRenderer>,
}

impl ConversationManager {
    pub fn new(user_name: impl Into<String>, renderer: Arc<dyn MarkdownRenderer>) -> Self {
        Self {
            history: ConversationHistory::new(),
            composer: ConversationComposer::new(EMPTY_PLACEHOLDER),
            indicator: TypingIndicator::new(),
            loading: false,
            next_seq: 1,
            pending: None,
            user_name: user_name.into(),
            renderer,
        }
    }

    pub fn set_user_name(&mut self, name: impl Into<String>) {
        self.user_name = name.into();
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn messages(&self) -> &[Message] {
        self.history.messages()
    }

    #[cfg(test)]
    pub fn draft(&self) -> &str {
        self.composer.content()
    }

    pub fn set_focus(&mut self, has_focus: bool) {
        self.composer.set_focus(has_focus);
    }

    /// Echo the draft and mark a request as pending.
    ///
    /// The caller is responsible for actually sending [`Submission::text`]
    /// and reporting back through [`ConversationManager::complete`].
    pub fn begin_submit(&mut self) -> SubmitOutcome {
        if self.composer.is_blank() {
            return SubmitOutcome::Empty;
        }
        if self.loading {
            tracing::debug!("submission refused while a reply is pending");
            return SubmitOutcome::Busy;
        }

        let text = self.composer.take();
        self.history.push(Message::user(text.clone()));

        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending = Some(seq);
        self.loading = true;
        self.indicator.reset();
        self.sync_widgets();

        tracing::info!(seq, chars = text.chars().count(), "message submitted");
        SubmitOutcome::Sent(Submission { seq, text })
    }

    /// Record the outcome of submission `seq`. Returns false if it was stale.
    pub fn complete(&mut self, seq: u64, result: Result<String, ClientError>) -> bool {
        if self.pending != Some(seq) {
            tracing::warn!(seq, pending = ?self.pending, "discarding stale reply");
            return false;
        }

        let reply = match result {
            Ok(reply) => {
                tracing::info!(seq, "reply received");
                reply
            }
            Err(err) => {
                tracing::warn!(seq, error = %err, "chat request failed");
                APOLOGY.to_string()
            }
        };

        self.history.push(Message::assistant(reply));
        self.pending = None;
        self.loading = false;
        self.sync_widgets();
        true
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.kind != KeyEventKind::Press {
            return ConversationAction::None;
        }

        match key.code {
            KeyCode::PageUp => self.history.scroll_up(SCROLL_STEP),
            KeyCode::PageDown => self.history.scroll_down(SCROLL_STEP),
            _ => {
                if self.composer.handle_key(key) == ComposerAction::Submit {
                    if let SubmitOutcome::Sent(submission) = self.begin_submit() {
                        return ConversationAction::Send(submission);
                    }
                }
            }
        }

        ConversationAction::None
    }

    pub fn handle_paste(&mut self, text: &str) {
        self.composer.insert_str(text);
    }

    /// Advance animations while a reply is pending
    pub fn tick(&mut self) {
        if self.loading {
            self.indicator.tick();
            self.composer.tick();
        }
    }

    fn sync_widgets(&mut self) {
        self.composer.set_busy(self.loading);
        self.composer.set_placeholder(if self.history.is_empty() {
            EMPTY_PLACEHOLDER
        } else {
            FOLLOW_UP_PLACEHOLDER
        });
    }

    /// History on top, composer sized to its draft at the bottom
    fn layout(&self, area: Rect) -> (Rect, Rect) {
        let composer_height = self.composer.desired_height(area.width);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(composer_height)])
            .split(area);
        (chunks[0], chunks[1])
    }

    /// Terminal cell for the input cursor
    pub fn cursor(&self, area: Rect) -> (u16, u16) {
        let (_, composer_area) = self.layout(area);
        self.composer.cursor(composer_area)
    }
}

impl Widget for &ConversationManager {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (history_area, composer_area) = self.layout(area);

        HistoryView {
            history: &self.history,
            renderer: self.renderer.as_ref(),
            user_name: &self.user_name,
            typing: self.loading.then_some(&self.indicator),
        }
        .render(history_area, buf);

        self.composer.render(composer_area, buf);
    }
}
