//! First-run dialog that asks for a display name.

use crate::profile::{name_or_default, DEFAULT_NAME};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};
use std::rc::Rc;

pub const PROMPT: &str = "What should I call you?";

const MAX_NAME_CHARS: usize = 40;

#[derive(Debug, PartialEq, Eq)]
pub enum OnboardingAction {
    None,
    /// Dialog finished with this display name
    Done(String),
}

#[derive(Debug, Default)]
pub struct OnboardingDialog {
    input: String,
}

impl OnboardingDialog {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Enter confirms (blank means the default name); Esc skips
    pub fn handle_key(&mut self, key: KeyEvent) -> OnboardingAction {
        if key.kind != KeyEventKind::Press {
            return OnboardingAction::None;
        }

        match key.code {
            KeyCode::Enter => OnboardingAction::Done(name_or_default(&self.input)),
            KeyCode::Esc => OnboardingAction::Done(DEFAULT_NAME.to_string()),
            KeyCode::Backspace => {
                self.input.pop();
                OnboardingAction::None
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.push(c);
                OnboardingAction::None
            }
            _ => OnboardingAction::None,
        }
    }

    pub fn handle_paste(&mut self, text: &str) {
        for c in text.chars().filter(|c| !c.is_control()) {
            self.push(c);
        }
    }

    fn push(&mut self, c: char) {
        if self.input.chars().count() < MAX_NAME_CHARS {
            self.input.push(c);
        }
    }

    /// Popup rectangle centered in `area`
    pub fn popup_area(area: Rect) -> Rect {
        let width = area.width.min(50);
        let height = area.height.min(7);
        Rect::new(
            area.x + (area.width - width) / 2,
            area.y + (area.height - height) / 2,
            width,
            height,
        )
    }

    pub fn cursor(&self, area: Rect) -> (u16, u16) {
        let input = Self::input_area(Self::popup_area(area));
        let col = (self.input.chars().count() as u16).min(input.width.saturating_sub(1));
        (input.x + col, input.y)
    }

    fn input_area(popup: Rect) -> Rect {
        Self::rows(popup)[2]
    }

    /// Prompt, spacer and input rows inside the popup border
    fn rows(popup: Rect) -> Rc<[Rect]> {
        let inner = Block::default().borders(Borders::ALL).inner(popup);
        Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Length(1)])
            .split(inner)
    }
}

impl Widget for &OnboardingDialog {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let popup = OnboardingDialog::popup_area(area);
        Clear.render(popup, buf);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::LightRed))
            .title(Span::styled(
                " Welcome ",
                Style::default().add_modifier(Modifier::BOLD),
            ));
        block.render(popup, buf);
        let rows = OnboardingDialog::rows(popup);

        Paragraph::new(Line::from(PROMPT))
            .alignment(Alignment::Left)
            .render(rows[0], buf);

        let input = if self.input.is_empty() {
            Line::from(Span::styled(DEFAULT_NAME, Style::default().fg(Color::DarkGray)))
        } else {
            Line::from(Span::styled(self.input.as_str(), Style::default().fg(Color::Cyan)))
        };
        Paragraph::new(input).render(rows[2], buf);
    }
}
