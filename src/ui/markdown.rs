//! Markdown to ratatui lines.
//!
//! Parsing is done by `pulldown-cmark` with the GitHub extensions chat replies
//! use (tables, strikethrough, task lists). Its event stream is folded into
//! styled lines pre-wrapped to the requested width.

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

/// Turns message text into display lines
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, text: &str, width: u16, base: Style) -> Vec<Line<'static>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GfmRenderer;

impl GfmRenderer {
    fn options() -> Options {
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
    }
}

impl MarkdownRenderer for GfmRenderer {
    fn render(&self, text: &str, width: u16, base: Style) -> Vec<Line<'static>> {
        let width = if width == 0 { usize::MAX } else { width as usize };
        let mut writer = LineWriter::new(width, base);

        for event in Parser::new_ext(text, Self::options()) {
            writer.event(event);
        }
        writer.finish()
    }
}

fn code_style(base: Style) -> Style {
    base.fg(Color::Yellow)
}

fn link_style(base: Style) -> Style {
    base.fg(Color::Cyan).add_modifier(Modifier::UNDERLINED)
}

type Run = (String, Style);

#[derive(Default)]
struct TableRows {
    rows: Vec<(bool, Vec<Vec<Run>>)>,
}

/// Accumulates parser events into wrapped lines
struct LineWriter {
    width: usize,
    base: Style,
    lines: Vec<Line<'static>>,
    runs: Vec<Run>,
    styles: Vec<Style>,
    /// Next number for each open list; `None` for bullet lists
    lists: Vec<Option<u64>>,
    marker: Option<String>,
    quote_depth: usize,
    in_code_block: bool,
    /// Destination and run index where each open link started
    links: Vec<(String, usize)>,
    table: Option<TableRows>,
    /// A blank line is owed before the next block
    gap: bool,
}

impl LineWriter {
    fn new(width: usize, base: Style) -> Self {
        Self {
            width,
            base,
            lines: Vec::new(),
            runs: Vec::new(),
            styles: vec![base],
            lists: Vec::new(),
            marker: None,
            quote_depth: 0,
            in_code_block: false,
            links: Vec::new(),
            table: None,
            gap: false,
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or(self.base)
    }

    fn push_style(&mut self, modifier: Modifier) {
        let style = self.style().add_modifier(modifier);
        self.styles.push(style);
    }

    fn pop_style(&mut self) {
        if self.styles.len() > 1 {
            self.styles.pop();
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if self.in_code_block {
                    for line in text.lines() {
                        self.code_line(line);
                    }
                } else {
                    let style = self.style();
                    self.runs.push((text.into_string(), style));
                }
            }
            Event::Code(code) => {
                let style = code_style(self.base);
                self.runs.push((code.into_string(), style));
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                let style = self.style();
                self.runs.push((html.into_string(), style));
            }
            Event::FootnoteReference(name) => {
                let style = self.style();
                self.runs.push((format!("[^{name}]"), style));
            }
            Event::TaskListMarker(done) => {
                let style = self.style();
                self.runs.push((if done { "[x] " } else { "[ ] " }.to_string(), style));
            }
            Event::SoftBreak => {
                let style = self.style();
                self.runs.push((" ".to_string(), style));
            }
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.flush();
                let rule = Span::styled(
                    "─".repeat(self.width.min(40)),
                    self.base.add_modifier(Modifier::DIM),
                );
                self.push_line(Line::from(rule));
                self.gap = true;
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush();
                if level == HeadingLevel::H1 {
                    self.push_style(Modifier::BOLD | Modifier::UNDERLINED);
                } else {
                    self.push_style(Modifier::BOLD);
                }
            }
            Tag::BlockQuote { .. } => {
                self.flush();
                self.quote_depth += 1;
                self.push_style(Modifier::ITALIC);
            }
            Tag::CodeBlock(_) => {
                self.flush();
                self.in_code_block = true;
            }
            Tag::List(first) => {
                self.flush();
                self.lists.push(first);
            }
            Tag::Item => {
                self.flush();
                let marker = match self.lists.last_mut() {
                    Some(Some(next)) => {
                        let marker = format!("{next}.");
                        *next += 1;
                        marker
                    }
                    _ => "•".to_string(),
                };
                self.marker = Some(marker);
            }
            Tag::Emphasis => self.push_style(Modifier::ITALIC),
            Tag::Strong => self.push_style(Modifier::BOLD),
            Tag::Strikethrough => self.push_style(Modifier::CROSSED_OUT),
            Tag::Link { dest_url, .. } | Tag::Image { dest_url, .. } => {
                let style = link_style(self.style());
                self.styles.push(style);
                self.links.push((dest_url.into_string(), self.runs.len()));
            }
            Tag::Table(_) => {
                self.flush();
                self.table = Some(TableRows::default());
            }
            Tag::TableHead => {
                self.push_style(Modifier::BOLD);
                self.start_row(true);
            }
            Tag::TableRow => self.start_row(false),
            Tag::TableCell => self.runs.clear(),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.flush();
                if self.lists.is_empty() {
                    self.gap = true;
                }
            }
            TagEnd::Heading(_) => {
                self.flush();
                self.pop_style();
                self.gap = true;
            }
            TagEnd::BlockQuote { .. } => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.pop_style();
                self.gap = true;
            }
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                self.gap = true;
            }
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.gap = true;
                }
            }
            TagEnd::Item => self.flush(),
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => self.pop_style(),
            TagEnd::Link | TagEnd::Image => {
                self.pop_style();
                if let Some((dest, start)) = self.links.pop() {
                    let label: String = self.runs[start.min(self.runs.len())..]
                        .iter()
                        .map(|(text, _)| text.as_str())
                        .collect();
                    if !dest.is_empty() && label != dest {
                        let style = self.style().add_modifier(Modifier::DIM);
                        self.runs.push((format!(" ({dest})"), style));
                    }
                }
            }
            TagEnd::TableHead => self.pop_style(),
            TagEnd::TableCell => {
                let cell = std::mem::take(&mut self.runs);
                if let Some((_, cells)) = self.table.as_mut().and_then(|t| t.rows.last_mut()) {
                    cells.push(cell);
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    for line in render_table(&table.rows, self.base) {
                        self.push_line(line);
                    }
                }
                self.gap = true;
            }
            _ => {}
        }
    }

    fn start_row(&mut self, header: bool) {
        if let Some(table) = self.table.as_mut() {
            table.rows.push((header, Vec::new()));
        }
    }

    /// Prefix for lines that continue the current block
    fn continuation(&self) -> String {
        let mut prefix = "│ ".repeat(self.quote_depth);
        prefix.push_str(&"  ".repeat(self.lists.len()));
        prefix
    }

    fn push_line(&mut self, line: Line<'static>) {
        if self.gap && !self.lines.is_empty() {
            self.lines.push(Line::default());
        }
        self.gap = false;
        self.lines.push(line);
    }

    fn code_line(&mut self, text: &str) {
        let prefix = self.continuation();
        let style = code_style(self.base);
        for chunk in hard_split(text, self.width.saturating_sub(prefix.chars().count())) {
            self.push_line(Line::from(vec![
                Span::styled(prefix.clone(), self.base),
                Span::styled(chunk, style),
            ]));
        }
    }

    /// Wrap the pending inline runs into lines under the current prefixes
    fn flush(&mut self) {
        if self.runs.iter().all(|(text, _)| text.trim().is_empty()) && self.marker.is_none() {
            self.runs.clear();
            return;
        }

        let quote = "│ ".repeat(self.quote_depth);
        let (first, rest) = match self.marker.take() {
            Some(marker) => {
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let first = format!("{quote}{indent}{marker} ");
                let rest = format!("{quote}{}", " ".repeat(indent.len() + marker.chars().count() + 1));
                (first, rest)
            }
            None => {
                let prefix = self.continuation();
                (prefix.clone(), prefix)
            }
        };

        let runs = std::mem::take(&mut self.runs);
        for line in prefixed(&first, &rest, &runs, self.width, self.base) {
            self.push_line(line);
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        if self.lines.is_empty() {
            self.lines.push(Line::default());
        }
        self.lines
    }
}

struct Atom {
    text: String,
    style: Style,
    space_before: bool,
}

fn atoms(runs: &[Run]) -> Vec<Atom> {
    let mut out = Vec::new();
    let mut pending_space = false;

    for (text, style) in runs {
        let mut word = String::new();
        for ch in text.chars() {
            if ch.is_whitespace() {
                if !word.is_empty() {
                    out.push(Atom {
                        text: std::mem::take(&mut word),
                        style: *style,
                        space_before: pending_space,
                    });
                }
                pending_space = true;
            } else {
                word.push(ch);
            }
        }
        // A trailing word may be glued to the next run, e.g. "**bold**,".
        if !word.is_empty() {
            out.push(Atom {
                text: word,
                style: *style,
                space_before: pending_space,
            });
            pending_space = false;
        }
    }
    out
}

fn hard_split(text: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars.chunks(width.max(1)).map(|c| c.iter().collect()).collect()
}

/// Greedy word wrap that keeps each word's style.
fn wrap(runs: &[Run], width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut current_width = 0;

    for atom in atoms(runs) {
        let len = atom.text.chars().count();
        let mut gap = usize::from(atom.space_before && current_width > 0);

        if current_width > 0 && current_width + gap + len > width {
            lines.push(Line::from(std::mem::take(&mut current)));
            current_width = 0;
            gap = 0;
        }

        if gap == 1 {
            current.push(Span::styled(" ", atom.style));
            current_width += 1;
        }

        if len > width {
            let mut chunks = hard_split(&atom.text, width);
            let last = chunks.pop().unwrap_or_default();
            for chunk in chunks {
                current.push(Span::styled(chunk, atom.style));
                lines.push(Line::from(std::mem::take(&mut current)));
            }
            current_width = last.chars().count();
            current.push(Span::styled(last, atom.style));
        } else {
            current.push(Span::styled(atom.text, atom.style));
            current_width += len;
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(Line::from(current));
    }
    lines
}

fn prefixed(first: &str, rest: &str, runs: &[Run], width: usize, base: Style) -> Vec<Line<'static>> {
    let inner = width.saturating_sub(first.chars().count()).max(1);
    wrap(runs, inner)
        .into_iter()
        .enumerate()
        .map(|(n, line)| {
            let prefix = if n == 0 { first } else { rest };
            if prefix.is_empty() {
                return line;
            }
            let mut spans = vec![Span::styled(prefix.to_string(), base)];
            spans.extend(line.spans);
            Line::from(spans)
        })
        .collect()
}

fn cell_width(cell: &[Run]) -> usize {
    cell.iter().map(|(text, _)| text.chars().count()).sum()
}

/// Lay out table rows in aligned columns with a rule under the header
fn render_table(rows: &[(bool, Vec<Vec<Run>>)], base: Style) -> Vec<Line<'static>> {
    let columns = rows.iter().map(|(_, cells)| cells.len()).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|col| {
            rows.iter()
                .filter_map(|(_, cells)| cells.get(col))
                .map(|cell| cell_width(cell))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let border = base.add_modifier(Modifier::DIM);
    let mut lines = Vec::new();

    for (header, cells) in rows {
        let mut spans = Vec::new();
        for (col, width) in widths.iter().enumerate() {
            if col > 0 {
                spans.push(Span::styled(" │ ", border));
            }
            let cell = cells.get(col).map(Vec::as_slice).unwrap_or(&[]);
            for (text, style) in cell {
                spans.push(Span::styled(text.clone(), *style));
            }
            let pad = width - cell_width(cell);
            if pad > 0 {
                spans.push(Span::raw(" ".repeat(pad)));
            }
        }
        lines.push(Line::from(spans));

        if *header {
            let rule = widths
                .iter()
                .map(|w| "─".repeat(*w))
                .collect::<Vec<_>>()
                .join("─┼─");
            lines.push(Line::from(Span::styled(rule, border)));
        }
    }
    lines
}
