//! Transcript pane: renders the conversation with markup styling and
//! keeps a bottom-anchored scroll position.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, StatefulWidget, Widget},
};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::conversation::{Conversation, Message, Sender};
use crate::markup::{self, Document, Fragment, RenderOptions};

const HISTORY_TITLE: &str = "🔎 Reddit Agent";
const CONTENT_INDENT: &str = "  ";

/// Scroll position for the transcript, measured in lines back from the
/// newest entry so the view stays pinned to the bottom as replies land.
#[derive(Debug, Default)]
pub struct HistoryState {
    /// Lines scrolled back from the bottom; 0 means following the newest.
    pub scroll_back: usize,
    /// Total rendered lines, updated on every render.
    pub content_height: usize,
    /// Visible lines, updated on every render.
    pub viewport_height: usize,
}

impl HistoryState {
    pub fn scroll_up(&mut self, amount: usize) {
        let max_back = self.content_height.saturating_sub(self.viewport_height);
        self.scroll_back = (self.scroll_back + amount).min(max_back);
    }

    pub fn scroll_down(&mut self, amount: usize) {
        self.scroll_back = self.scroll_back.saturating_sub(amount);
    }

    /// Re-pin the view to the newest entry.
    pub fn follow(&mut self) {
        self.scroll_back = 0;
    }
}

/// The transcript widget. Borrows the conversation and renders every
/// message through the markup pipeline.
pub struct History<'a> {
    conversation: &'a Conversation,
    options: RenderOptions,
}

impl<'a> History<'a> {
    pub fn new(conversation: &'a Conversation, options: RenderOptions) -> Self {
        Self {
            conversation,
            options,
        }
    }
}

impl StatefulWidget for History<'_> {
    type State = HistoryState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut HistoryState) {
        let block = Block::default().borders(Borders::ALL).title(HISTORY_TITLE);
        let inner = block.inner(area);
        block.render(area, buf);
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let width = inner.width as usize;
        let content_width = width.saturating_sub(CONTENT_INDENT.len());
        let mut lines: Vec<Line<'static>> = Vec::new();

        for message in self.conversation.messages() {
            lines.push(header_line(message));
            let document = markup::render(&message.text, &self.options);
            for line in document_lines(&document, base_style(message.sender)) {
                for wrapped in wrap_line(line, content_width) {
                    let mut spans = vec![Span::raw(CONTENT_INDENT)];
                    spans.extend(wrapped.spans);
                    lines.push(Line::from(spans));
                }
            }
            lines.push(Line::default());
        }

        if self.conversation.is_awaiting() {
            lines.push(thinking_line());
        }

        let height = inner.height as usize;
        let total = lines.len();
        state.content_height = total;
        state.viewport_height = height;
        let max_back = total.saturating_sub(height);
        if state.scroll_back > max_back {
            state.scroll_back = max_back;
        }

        let start = total.saturating_sub(height + state.scroll_back);
        let end = (start + height).min(total);
        for (row, line) in lines[start..end].iter().enumerate() {
            buf.set_line(inner.x, inner.y + row as u16, line, inner.width);
        }
    }
}

fn base_style(sender: Sender) -> Style {
    match sender {
        Sender::User => Style::default().fg(Color::Blue),
        Sender::Bot => Style::default().fg(Color::Green),
    }
}

fn header_line(message: &Message) -> Line<'static> {
    let icon = match message.sender {
        Sender::User => "👤",
        Sender::Bot => "🤖",
    };
    let header = format!(
        "{} {} {} {}",
        icon,
        message.sender.display_name(),
        message.timestamp.format("%H:%M:%S"),
        "─".repeat(20)
    );
    Line::from(Span::styled(header, Style::default().fg(Color::DarkGray)))
}

fn heading_style(level: u8) -> Style {
    match level {
        1 => Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        2 => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        _ => Style::default()
            .fg(Color::LightBlue)
            .add_modifier(Modifier::BOLD),
    }
}

fn marker_style() -> Style {
    Style::default().fg(Color::Cyan)
}

fn code_style() -> Style {
    Style::default().fg(Color::Yellow)
}

fn code_block_style() -> Style {
    Style::default().fg(Color::Gray)
}

/// Lay a rendered document out as styled lines. A heading marker colours
/// the rest of its visual line; breaks reset it.
fn document_lines(document: &Document, base: Style) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut line_style: Option<Style> = None;

    for fragment in &document.fragments {
        let style = line_style.unwrap_or(base);
        match fragment {
            Fragment::Text(text) => push_text(&mut lines, &mut current, text, style),
            Fragment::Bold(text) => push_text(
                &mut lines,
                &mut current,
                text,
                style.add_modifier(Modifier::BOLD),
            ),
            Fragment::Italic(text) => push_text(
                &mut lines,
                &mut current,
                text,
                style.add_modifier(Modifier::ITALIC),
            ),
            Fragment::Code(text) => push_text(&mut lines, &mut current, text, code_style()),
            Fragment::CodeBlock(content) => {
                if !current.is_empty() {
                    lines.push(Line::from(std::mem::take(&mut current)));
                }
                for code_line in content.trim_matches('\n').split('\n') {
                    lines.push(Line::from(Span::styled(
                        code_line.to_string(),
                        code_block_style(),
                    )));
                }
            }
            Fragment::Heading(level) => line_style = Some(heading_style(*level)),
            Fragment::Bullet => current.push(Span::styled("• ", marker_style())),
            Fragment::Numbered(number) => {
                current.push(Span::styled(format!("{}. ", number), marker_style()));
            }
            Fragment::LineBreak => {
                lines.push(Line::from(std::mem::take(&mut current)));
                line_style = None;
            }
            Fragment::ParagraphBreak => {
                lines.push(Line::from(std::mem::take(&mut current)));
                lines.push(Line::default());
                line_style = None;
            }
        }
    }

    if !current.is_empty() {
        lines.push(Line::from(current));
    }
    lines
}

fn push_text(
    lines: &mut Vec<Line<'static>>,
    current: &mut Vec<Span<'static>>,
    text: &str,
    style: Style,
) {
    // Claimed fragments should not carry newlines, but split anyway so a
    // stray one cannot smear styling across rows.
    for (index, part) in text.split('\n').enumerate() {
        if index > 0 {
            lines.push(Line::from(std::mem::take(current)));
        }
        if !part.is_empty() {
            current.push(Span::styled(part.to_string(), style));
        }
    }
}

/// Word-wrap a styled line to `width` columns. Breaks happen at spaces;
/// a single word longer than the width is hard-split.
fn wrap_line(line: Line<'static>, width: usize) -> Vec<Line<'static>> {
    if width == 0 {
        return vec![line];
    }

    let mut wrapped: Vec<Line<'static>> = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut current_width = 0usize;

    for span in line.spans {
        let style = span.style;
        let mut chunk = String::new();
        for token in tokenize(&span.content) {
            let token_width = token.chars().count();
            if current_width + token_width > width && current_width > 0 {
                break_line(&mut wrapped, &mut current, &mut chunk, style);
                current_width = 0;
                // A space at a break point is swallowed by the wrap.
                if token.trim().is_empty() {
                    continue;
                }
            }
            if token_width > width {
                for c in token.chars() {
                    if current_width >= width {
                        break_line(&mut wrapped, &mut current, &mut chunk, style);
                        current_width = 0;
                    }
                    chunk.push(c);
                    current_width += 1;
                }
            } else {
                chunk.push_str(token);
                current_width += token_width;
            }
        }
        if !chunk.is_empty() {
            current.push(Span::styled(chunk, style));
        }
    }

    if !current.is_empty() || wrapped.is_empty() {
        wrapped.push(Line::from(current));
    }
    wrapped
}

/// Emit the line under construction, dropping trailing spaces left at the
/// break point.
fn break_line(
    wrapped: &mut Vec<Line<'static>>,
    current: &mut Vec<Span<'static>>,
    chunk: &mut String,
    style: Style,
) {
    if !chunk.is_empty() {
        current.push(Span::styled(std::mem::take(chunk), style));
    }
    while let Some(last) = current.last_mut() {
        let trimmed = last.content.trim_end_matches(' ');
        if trimmed.len() == last.content.len() {
            break;
        }
        if trimmed.is_empty() {
            current.pop();
        } else {
            last.content = trimmed.to_string().into();
            break;
        }
    }
    wrapped.push(Line::from(std::mem::take(current)));
}

/// Split text into alternating runs of spaces and non-spaces, both kept.
fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_space: Option<bool> = None;

    for (index, c) in text.char_indices() {
        let is_space = c == ' ';
        match in_space {
            None => in_space = Some(is_space),
            Some(previous) if previous != is_space => {
                tokens.push(&text[start..index]);
                start = index;
                in_space = Some(is_space);
            }
            _ => {}
        }
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

fn thinking_line() -> Line<'static> {
    let dots = match (SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        / 300)
        % 4
    {
        0 => ".",
        1 => "..",
        2 => "...",
        _ => "   ",
    };
    Line::from(vec![
        Span::styled("🤖 ", Style::default().fg(Color::Green)),
        Span::styled(
            "Reddit Agent is thinking",
            Style::default().fg(Color::Green),
        ),
        Span::styled(dots.to_string(), Style::default().fg(Color::Yellow)),
    ])
}
