//! Conversation history display component

use crate::events::{Message, Role};
use crate::ui::conversation::indicator::TypingIndicator;
use crate::ui::markdown::MarkdownRenderer;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Scrollbar, ScrollbarOrientation, ScrollbarState, StatefulWidget, Widget},
};
use std::cell::Cell;

pub const ASSISTANT_COLOR: Color = Color::Rgb(249, 115, 22);
pub const USER_COLOR: Color = Color::Blue;

const AVATAR_WIDTH: usize = 3;

/// Ordered, append-only message list plus the viewport position
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    messages: Vec<Message>,
    /// Lines scrolled up from the newest entry; 0 follows the bottom
    scroll_offset: usize,
    max_offset: Cell<usize>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and jump to the newest entry
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.scroll_to_bottom();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_offset = (self.scroll_offset + lines).min(self.max_offset.get());
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
    }

    #[cfg(test)]
    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }
}

/// Renders a [`ConversationHistory`] for one frame
pub struct HistoryView<'a> {
    pub history: &'a ConversationHistory,
    pub renderer: &'a dyn MarkdownRenderer,
    pub user_name: &'a str,
    /// Present while a reply is pending
    pub typing: Option<&'a TypingIndicator>,
}

impl HistoryView<'_> {
    fn avatar(&self, role: Role) -> Span<'static> {
        let (label, color) = match role {
            Role::User => (
                self.user_name
                    .chars()
                    .next()
                    .map(|c| c.to_uppercase().to_string())
                    .unwrap_or_else(|| "U".to_string()),
                USER_COLOR,
            ),
            Role::Assistant => ("A".to_string(), ASSISTANT_COLOR),
        };
        Span::styled(
            format!(" {label} "),
            Style::default()
                .fg(Color::White)
                .bg(color)
                .add_modifier(Modifier::BOLD),
        )
    }

    /// Lay out one message: assistant on the left, user on the right
    fn message_lines(&self, message: &Message, width: usize) -> Vec<Line<'static>> {
        let bubble = (width * 4 / 5).saturating_sub(AVATAR_WIDTH + 1).max(1);
        let base = match message.role {
            Role::User => Style::default().fg(USER_COLOR),
            Role::Assistant => Style::default(),
        };
        let body = self.renderer.render(&message.content, bubble as u16, base);
        let blank = " ".repeat(AVATAR_WIDTH + 1);

        body.into_iter()
            .enumerate()
            .map(|(n, line)| match message.role {
                Role::Assistant => {
                    let mut spans = if n == 0 {
                        vec![self.avatar(Role::Assistant), Span::raw(" ")]
                    } else {
                        vec![Span::raw(blank.clone())]
                    };
                    spans.extend(line.spans);
                    Line::from(spans)
                }
                Role::User => {
                    let used = line.width() + AVATAR_WIDTH + 1;
                    let mut spans = vec![Span::raw(" ".repeat(width.saturating_sub(used)))];
                    spans.extend(line.spans);
                    if n == 0 {
                        spans.push(Span::raw(" "));
                        spans.push(self.avatar(Role::User));
                    } else {
                        spans.push(Span::raw(blank.clone()));
                    }
                    Line::from(spans)
                }
            })
            .collect()
    }

    /// Every line of the conversation, oldest first
    pub fn lines(&self, width: usize) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        for (n, message) in self.history.messages.iter().enumerate() {
            if n > 0 {
                lines.push(Line::default());
            }
            lines.extend(self.message_lines(message, width));
        }

        if let Some(typing) = self.typing {
            if !lines.is_empty() {
                lines.push(Line::default());
            }
            lines.push(typing.line(
                vec![self.avatar(Role::Assistant), Span::raw(" ")],
                ASSISTANT_COLOR,
            ));
        }
        lines
    }

    fn render_empty_state(&self, area: Rect, buf: &mut Buffer) {
        let lines = [
            Line::from(Span::styled(
                "How can I help you today?",
                Style::default().fg(ASSISTANT_COLOR).add_modifier(Modifier::BOLD),
            )),
            Line::default(),
            Line::from(Span::styled(
                "Ask me anything and I'll do my best to assist you with your questions.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let top = area.y + area.height.saturating_sub(lines.len() as u16) / 2;
        for (i, line) in lines.iter().enumerate() {
            let y = top + i as u16;
            if y >= area.bottom() {
                break;
            }
            let x = area.x + area.width.saturating_sub(line.width() as u16) / 2;
            buf.set_line(x, y, line, area.right().saturating_sub(x));
        }
    }
}

impl Widget for HistoryView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray));
        let inner = block.inner(area);
        block.render(area, buf);

        if self.history.is_empty() && self.typing.is_none() {
            self.history.max_offset.set(0);
            self.render_empty_state(inner, buf);
            return;
        }

        // one column is kept for the scrollbar
        let width = inner.width.saturating_sub(1) as usize;
        let lines = self.lines(width);
        let height = inner.height as usize;
        let total = lines.len();

        let max_offset = total.saturating_sub(height);
        self.history.max_offset.set(max_offset);
        let offset = self.history.scroll_offset.min(max_offset);
        let start = total.saturating_sub(height + offset);

        for (i, line) in lines.iter().skip(start).take(height).enumerate() {
            buf.set_line(inner.x, inner.y + i as u16, line, width as u16);
        }

        if max_offset > 0 {
            let mut state = ScrollbarState::new(max_offset).position(max_offset - offset);
            Scrollbar::default()
                .orientation(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"))
                .render(inner, buf, &mut state);
        }
    }
}
