use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        block::{Position, Title},
        Block, Borders, Widget,
    },
};

/// Tallest the composer grows before it starts scrolling its own content
pub const MAX_VISIBLE_LINES: u16 = 8;

const SPINNER: [&str; 4] = ["◐", "◓", "◑", "◒"];

/// What the composer asks its owner to do after a key press
#[derive(Debug, PartialEq, Eq)]
pub enum ComposerAction {
    Submit,
    None,
}

/// State for the text area within the composer
#[derive(Debug, Clone, Default)]
pub struct TextAreaState {
    pub content: String,
    /// Cursor position in characters, not bytes
    pub cursor_position: usize,
}

impl TextAreaState {
    fn byte_index(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Draft input for the conversation
#[derive(Debug, Clone)]
pub struct ConversationComposer {
    state: TextAreaState,
    placeholder: String,
    has_focus: bool,
    busy: bool,
    spinner_frame: usize,
}

impl ConversationComposer {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            state: TextAreaState::default(),
            placeholder: placeholder.into(),
            has_focus: true,
            busy: false,
            spinner_frame: 0,
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerAction {
        if key.kind != KeyEventKind::Press {
            return ComposerAction::None;
        }

        match key.code {
            KeyCode::Enter => {
                if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) {
                    self.insert_char('\n');
                } else {
                    return ComposerAction::Submit;
                }
            }
            KeyCode::Char(c) => {
                if !key.modifiers.contains(KeyModifiers::CONTROL) {
                    self.insert_char(c);
                }
            }
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => {
                self.state.cursor_position = self.state.cursor_position.saturating_sub(1);
            }
            KeyCode::Right => {
                if self.state.cursor_position < self.state.char_len() {
                    self.state.cursor_position += 1;
                }
            }
            KeyCode::Home => self.state.cursor_position = 0,
            KeyCode::End => self.state.cursor_position = self.state.char_len(),
            _ => {}
        }

        ComposerAction::None
    }

    /// Insert pasted text at the cursor
    pub fn insert_str(&mut self, text: &str) {
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        let at = self.state.byte_index(self.state.cursor_position);
        self.state.content.insert_str(at, &normalized);
        self.state.cursor_position += normalized.chars().count();
    }

    fn insert_char(&mut self, c: char) {
        let at = self.state.byte_index(self.state.cursor_position);
        self.state.content.insert(at, c);
        self.state.cursor_position += 1;
    }

    /// Delete character before cursor
    fn backspace(&mut self) {
        if self.state.cursor_position > 0 {
            self.state.cursor_position -= 1;
            let at = self.state.byte_index(self.state.cursor_position);
            self.state.content.remove(at);
        }
    }

    /// Delete character at cursor
    fn delete(&mut self) {
        if self.state.cursor_position < self.state.char_len() {
            let at = self.state.byte_index(self.state.cursor_position);
            self.state.content.remove(at);
        }
    }

    #[cfg(test)]
    pub fn content(&self) -> &str {
        &self.state.content
    }

    pub fn is_blank(&self) -> bool {
        self.state.content.trim().is_empty()
    }

    /// Move the draft out, leaving the composer empty
    pub fn take(&mut self) -> String {
        self.state.cursor_position = 0;
        std::mem::take(&mut self.state.content)
    }

    pub fn set_placeholder(&mut self, placeholder: &str) {
        if self.placeholder != placeholder {
            self.placeholder = placeholder.to_string();
        }
    }

    pub fn set_focus(&mut self, has_focus: bool) {
        self.has_focus = has_focus;
    }

    /// Mark whether a request is in flight
    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    pub fn tick(&mut self) {
        self.spinner_frame = (self.spinner_frame + 1) % SPINNER.len();
    }

    /// Whether the send affordance is enabled
    pub fn can_send(&self) -> bool {
        !self.busy && !self.is_blank()
    }

    /// Height (borders included) needed to show the draft at `width`
    pub fn desired_height(&self, width: u16) -> u16 {
        let inner = width.saturating_sub(2) as usize;
        let rows = visual_rows(&self.state.content, inner).len() as u16;
        rows.clamp(1, MAX_VISIBLE_LINES) + 2
    }

    /// Terminal cell for the cursor when the composer is drawn in `area`
    pub fn cursor(&self, area: Rect) -> (u16, u16) {
        let inner = Block::default().borders(Borders::ALL).inner(area);
        let (row, col) = cursor_row_col(&self.state, inner.width as usize);
        let scroll = row.saturating_sub(inner.height.saturating_sub(1) as usize);
        (
            inner.x + col as u16,
            inner.y + (row - scroll) as u16,
        )
    }
}

/// Split text into visual rows: explicit newlines, then hard wraps at `width`.
/// A logical line of exactly `width` characters gets a trailing empty row so
/// the cursor always has a cell to sit in.
fn visual_rows(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();
    for line in text.split('\n') {
        let chars: Vec<char> = line.chars().collect();
        let count = chars.len() / width + 1;
        for n in 0..count {
            let start = (n * width).min(chars.len());
            let end = ((n + 1) * width).min(chars.len());
            rows.push(chars[start..end].iter().collect());
        }
    }
    rows
}

fn cursor_row_col(state: &TextAreaState, width: usize) -> (usize, usize) {
    let width = width.max(1);
    let before: String = state.content.chars().take(state.cursor_position).collect();
    let mut row = 0;
    let mut lines = before.split('\n').peekable();

    while let Some(line) = lines.next() {
        let len = line.chars().count();
        if lines.peek().is_none() {
            return (row + len / width, len % width);
        }
        row += len / width + 1;
    }
    (row, 0)
}

impl Widget for &ConversationComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (label, label_style) = if self.busy {
            (
                format!(" {} Sending ", SPINNER[self.spinner_frame]),
                Style::default().fg(Color::Yellow),
            )
        } else if self.can_send() {
            (
                " ⏎ Send ".to_string(),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )
        } else {
            (" ⏎ Send ".to_string(), Style::default().fg(Color::DarkGray))
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(if self.has_focus {
                Style::default().fg(Color::LightRed)
            } else {
                Style::default().fg(Color::Gray)
            })
            .title(
                Title::from(Span::styled(label, label_style))
                    .position(Position::Bottom)
                    .alignment(Alignment::Right),
            );

        let inner = block.inner(area);
        block.render(area, buf);

        if self.state.content.is_empty() {
            let placeholder = Line::from(Span::styled(
                self.placeholder.as_str(),
                Style::default().fg(Color::DarkGray),
            ));
            buf.set_line(inner.x, inner.y, &placeholder, inner.width);
            return;
        }

        let rows = visual_rows(&self.state.content, inner.width as usize);
        let (cursor_row, _) = cursor_row_col(&self.state, inner.width as usize);
        let scroll = cursor_row.saturating_sub(inner.height.saturating_sub(1) as usize);

        for (i, text) in rows.iter().skip(scroll).take(inner.height as usize).enumerate() {
            let line = Line::from(Span::raw(text.as_str()));
            buf.set_line(inner.x, inner.y + i as u16, &line, inner.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(composer: &mut ConversationComposer, text: &str) {
        for c in text.chars() {
            composer.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn enter_submits_and_shift_enter_inserts_newline() {
        let mut composer = ConversationComposer::new("placeholder");
        type_text(&mut composer, "hi");

        let shifted = KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT);
        assert_eq!(composer.handle_key(shifted), ComposerAction::None);
        assert_eq!(composer.content(), "hi\n");

        assert_eq!(composer.handle_key(key(KeyCode::Enter)), ComposerAction::Submit);
        assert_eq!(composer.content(), "hi\n");
    }

    #[test]
    fn editing_handles_multibyte_characters() {
        let mut composer = ConversationComposer::new("");
        type_text(&mut composer, "héllo");
        composer.handle_key(key(KeyCode::Left));
        composer.handle_key(key(KeyCode::Left));
        composer.handle_key(key(KeyCode::Backspace));
        composer.handle_key(key(KeyCode::Backspace));

        assert_eq!(composer.content(), "hlo");

        composer.handle_key(key(KeyCode::Home));
        composer.handle_key(key(KeyCode::Delete));
        assert_eq!(composer.content(), "lo");
    }

    #[test]
    fn take_clears_the_draft() {
        let mut composer = ConversationComposer::new("");
        type_text(&mut composer, "draft");

        assert_eq!(composer.take(), "draft");
        assert!(composer.is_blank());
        assert_eq!(composer.content(), "");
    }

    #[test]
    fn paste_normalises_line_endings() {
        let mut composer = ConversationComposer::new("");
        composer.insert_str("a\r\nb");
        assert_eq!(composer.content(), "a\nb");
    }

    #[test]
    fn send_is_disabled_when_blank_or_busy() {
        let mut composer = ConversationComposer::new("");
        assert!(!composer.can_send());

        type_text(&mut composer, "  ");
        assert!(!composer.can_send());

        type_text(&mut composer, "x");
        assert!(composer.can_send());

        composer.set_busy(true);
        assert!(!composer.can_send());
    }

    #[test]
    fn height_grows_with_content_and_is_capped() {
        let mut composer = ConversationComposer::new("");
        assert_eq!(composer.desired_height(12), 3);

        // 10 inner columns: 25 characters need three rows
        type_text(&mut composer, &"x".repeat(25));
        assert_eq!(composer.desired_height(12), 5);

        composer.insert_str(&"\n".repeat(20));
        assert_eq!(composer.desired_height(12), MAX_VISIBLE_LINES + 2);

        composer.take();
        assert_eq!(composer.desired_height(12), 3);
    }

    #[test]
    fn cursor_follows_wrapped_text() {
        let mut composer = ConversationComposer::new("");
        type_text(&mut composer, "abcdefghijkl");

        // inner area starts at (1, 1) with width 10
        let area = Rect::new(0, 0, 12, 5);
        assert_eq!(composer.cursor(area), (3, 2));

        composer.insert_str("\nz");
        assert_eq!(composer.cursor(area), (2, 3));
    }

    #[test]
    fn renders_placeholder_when_empty() {
        let composer = ConversationComposer::new("How can I help you today?");
        let area = Rect::new(0, 0, 40, 3);
        let mut buf = Buffer::empty(area);
        (&composer).render(area, &mut buf);

        let row: String = (0..40).map(|x| buf.get(x, 1).symbol().to_string()).collect();
        assert!(row.contains("How can I help you today?"));
    }
}
