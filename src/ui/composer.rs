//! Input box at the bottom of the screen. The draft lives here until a
//! submit hands it off, and edits are blocked while a request is in
//! flight.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

const CURSOR_MARK: char = '▌';

/// What a key press did to the composer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposerResult {
    /// Enter was pressed on a non-blank draft; the content is handed out.
    Submitted(String),
    /// The key was consumed (or ignored) without submitting.
    None,
}

pub struct Composer {
    content: String,
    /// Cursor position in characters, not bytes.
    cursor: usize,
    placeholder: String,
    waiting: bool,
}

impl Composer {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            cursor: 0,
            placeholder: placeholder.into(),
            waiting: false,
        }
    }

    /// Block edits while the agent is working; the draft is kept.
    pub fn set_waiting(&mut self, waiting: bool) {
        self.waiting = waiting;
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press || self.waiting {
            return ComposerResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.insert_char('\n');
                } else if !self.content.trim().is_empty() {
                    let content = std::mem::take(&mut self.content);
                    self.cursor = 0;
                    return ComposerResult::Submitted(content);
                }
                // A blank draft stays put; Enter does nothing with it.
            }
            KeyCode::Char(c) => self.insert_char(c),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.char_count()),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.char_count(),
            _ => {}
        }
        ComposerResult::None
    }

    /// Insert pasted text at the cursor.
    pub fn insert_text(&mut self, text: &str) {
        if self.waiting {
            return;
        }
        let at = self.byte_index();
        self.content.insert_str(at, text);
        self.cursor += text.chars().count();
    }

    fn byte_index(&self) -> usize {
        self.content
            .char_indices()
            .nth(self.cursor)
            .map(|(index, _)| index)
            .unwrap_or(self.content.len())
    }

    fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    fn insert_char(&mut self, c: char) {
        let at = self.byte_index();
        self.content.insert(at, c);
        self.cursor += 1;
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_index();
        self.content.remove(at);
    }

    fn delete(&mut self) {
        if self.cursor < self.char_count() {
            let at = self.byte_index();
            self.content.remove(at);
        }
    }

    /// Draft text with the cursor mark spliced in at the edit point.
    fn display_content(&self) -> String {
        let mut display = self.content.clone();
        display.insert(self.byte_index(), CURSOR_MARK);
        display
    }
}

impl Widget for &Composer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (title, border_style) = if self.waiting {
            ("⏳ Waiting", Style::default().fg(Color::DarkGray))
        } else {
            ("💬 Message", Style::default().fg(Color::Green))
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(border_style);
        let inner = block.inner(area);
        block.render(area, buf);
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let lines: Vec<Line> = if self.waiting {
            if self.content.is_empty() {
                vec![Line::from(Span::styled(
                    "Waiting for the agent to reply...",
                    Style::default().fg(Color::DarkGray),
                ))]
            } else {
                // Show the preserved draft dimmed, without a cursor.
                self.content
                    .split('\n')
                    .map(|part| {
                        Line::from(Span::styled(
                            part.to_string(),
                            Style::default().fg(Color::DarkGray),
                        ))
                    })
                    .collect()
            }
        } else if self.content.is_empty() {
            vec![Line::from(vec![
                Span::styled(
                    CURSOR_MARK.to_string(),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    self.placeholder.clone(),
                    Style::default().fg(Color::DarkGray),
                ),
            ])]
        } else {
            self.display_content()
                .split('\n')
                .map(|part| {
                    Line::from(Span::styled(
                        part.to_string(),
                        Style::default().fg(Color::White),
                    ))
                })
                .collect()
        };

        for (row, line) in lines.iter().take(inner.height as usize).enumerate() {
            buf.set_line(inner.x, inner.y + row as u16, line, inner.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(composer: &mut Composer, text: &str) {
        for c in text.chars() {
            composer.handle_key(press(KeyCode::Char(c)));
        }
    }

    #[test]
    fn typing_builds_the_draft() {
        let mut composer = Composer::new("hint");
        type_str(&mut composer, "rust");
        assert_eq!(composer.content, "rust");
    }

    #[test]
    fn enter_submits_and_clears() {
        let mut composer = Composer::new("hint");
        type_str(&mut composer, "rust");
        let result = composer.handle_key(press(KeyCode::Enter));
        assert_eq!(result, ComposerResult::Submitted("rust".to_string()));
        assert_eq!(composer.content, "");
    }

    #[test]
    fn blank_draft_does_not_submit() {
        let mut composer = Composer::new("hint");
        type_str(&mut composer, "   ");
        let result = composer.handle_key(press(KeyCode::Enter));
        assert_eq!(result, ComposerResult::None);
        assert_eq!(composer.content, "   ");
    }

    #[test]
    fn shift_enter_inserts_newline() {
        let mut composer = Composer::new("hint");
        type_str(&mut composer, "line one");
        let result = composer.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT));
        assert_eq!(result, ComposerResult::None);
        type_str(&mut composer, "line two");
        assert_eq!(composer.content, "line one\nline two");
    }

    #[test]
    fn waiting_blocks_edits_and_submit() {
        let mut composer = Composer::new("hint");
        type_str(&mut composer, "draft");
        composer.set_waiting(true);
        type_str(&mut composer, "more");
        assert_eq!(composer.handle_key(press(KeyCode::Enter)), ComposerResult::None);
        assert_eq!(composer.content, "draft");

        composer.set_waiting(false);
        let result = composer.handle_key(press(KeyCode::Enter));
        assert_eq!(result, ComposerResult::Submitted("draft".to_string()));
    }

    #[test]
    fn backspace_removes_before_cursor() {
        let mut composer = Composer::new("hint");
        type_str(&mut composer, "abc");
        composer.handle_key(press(KeyCode::Left));
        composer.handle_key(press(KeyCode::Backspace));
        assert_eq!(composer.content, "ac");
    }

    #[test]
    fn delete_removes_at_cursor() {
        let mut composer = Composer::new("hint");
        type_str(&mut composer, "abc");
        composer.handle_key(press(KeyCode::Home));
        composer.handle_key(press(KeyCode::Delete));
        assert_eq!(composer.content, "bc");
    }

    #[test]
    fn cursor_edits_are_char_boundary_safe() {
        let mut composer = Composer::new("hint");
        type_str(&mut composer, "héllo");
        composer.handle_key(press(KeyCode::Home));
        composer.handle_key(press(KeyCode::Right));
        composer.handle_key(press(KeyCode::Right));
        composer.handle_key(press(KeyCode::Backspace));
        assert_eq!(composer.content, "hllo");
        composer.handle_key(press(KeyCode::Char('é')));
        assert_eq!(composer.content, "héllo");
    }

    #[test]
    fn paste_lands_at_the_cursor() {
        let mut composer = Composer::new("hint");
        type_str(&mut composer, "ad");
        composer.handle_key(press(KeyCode::Left));
        composer.insert_text("bc");
        assert_eq!(composer.content, "abcd");
        composer.handle_key(press(KeyCode::End));
        composer.handle_key(press(KeyCode::Char('e')));
        assert_eq!(composer.content, "abcde");
    }

    #[test]
    fn end_and_home_move_to_extremes() {
        let mut composer = Composer::new("hint");
        type_str(&mut composer, "abc");
        composer.handle_key(press(KeyCode::Home));
        composer.handle_key(press(KeyCode::Char('x')));
        assert_eq!(composer.content, "xabc");
        composer.handle_key(press(KeyCode::End));
        composer.handle_key(press(KeyCode::Char('y')));
        assert_eq!(composer.content, "xabcy");
    }
}
