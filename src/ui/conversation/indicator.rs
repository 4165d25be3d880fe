//! Typing indicator shown while a reply is pending

use ratatui::{
    style::{Color, Style},
    text::{Line, Span},
};

const DOT_ON: &str = "●";
const DOT_OFF: &str = "○";

/// Three bouncing dots; the highlighted dot advances on every tick
#[derive(Debug, Clone, Default)]
pub struct TypingIndicator {
    frame: usize,
}

impl TypingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self) {
        self.frame = (self.frame + 1) % 3;
    }

    pub fn reset(&mut self) {
        self.frame = 0;
    }

    /// Dot spans for the current frame
    pub fn spans(&self, color: Color) -> Vec<Span<'static>> {
        let mut spans = Vec::with_capacity(5);
        for dot in 0..3 {
            if dot > 0 {
                spans.push(Span::raw(" "));
            }
            let symbol = if dot == self.frame { DOT_ON } else { DOT_OFF };
            spans.push(Span::styled(symbol, Style::default().fg(color)));
        }
        spans
    }

    pub fn line(&self, prefix: Vec<Span<'static>>, color: Color) -> Line<'static> {
        let mut spans = prefix;
        spans.extend(self.spans(color));
        Line::from(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(indicator: &TypingIndicator) -> String {
        indicator
            .spans(Color::White)
            .iter()
            .map(|s| s.content.as_ref())
            .collect()
    }

    #[test]
    fn highlighted_dot_cycles() {
        let mut indicator = TypingIndicator::new();
        assert_eq!(symbols(&indicator), "● ○ ○");

        indicator.tick();
        assert_eq!(symbols(&indicator), "○ ● ○");

        indicator.tick();
        indicator.tick();
        assert_eq!(symbols(&indicator), "● ○ ○");

        indicator.tick();
        indicator.reset();
        assert_eq!(symbols(&indicator), "● ○ ○");
    }
}
