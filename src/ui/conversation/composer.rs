use crate::attachment;
use crate::ui::conversation::commands::{parse_slash_command, ParsedCommand};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Result returned when the user interacts with the conversation composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    /// Enter on ordinary text: the controller takes it from here
    Submit,
    Command(ParsedCommand),
    None,
}

/// Editable text with a cursor kept on a char boundary
#[derive(Debug, Clone, Default)]
pub struct TextAreaState {
    pub content: String,
    pub cursor: usize,
}

impl TextAreaState {
    fn insert_char(&mut self, c: char) {
        self.content.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    fn insert_str(&mut self, text: &str) {
        self.content.insert_str(self.cursor, text);
        self.cursor += text.len();
    }

    fn prev_boundary(&self) -> Option<usize> {
        self.content[..self.cursor].char_indices().next_back().map(|(i, _)| i)
    }

    fn next_boundary(&self) -> Option<usize> {
        self.content[self.cursor..]
            .chars()
            .next()
            .map(|c| self.cursor + c.len_utf8())
    }

    fn backspace(&mut self) {
        if let Some(prev) = self.prev_boundary() {
            self.content.replace_range(prev..self.cursor, "");
            self.cursor = prev;
        }
    }

    fn delete(&mut self) {
        if let Some(next) = self.next_boundary() {
            self.content.replace_range(self.cursor..next, "");
        }
    }

    fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
    }
}

/// Conversation composer for user input
#[derive(Debug, Clone)]
pub struct ConversationComposer {
    state: TextAreaState,
    placeholder: String,
    busy: bool,
    preview: Option<String>,
    frame: usize,
}

impl ConversationComposer {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            state: TextAreaState::default(),
            placeholder: placeholder.into(),
            busy: false,
            preview: None,
            frame: 0,
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) {
                    self.state.insert_char('\n');
                } else if let Some(command) = parse_slash_command(&self.state.content) {
                    self.state.clear();
                    return ComposerResult::Command(command);
                } else {
                    return ComposerResult::Submit;
                }
            }
            KeyCode::Char(c) => self.state.insert_char(c),
            KeyCode::Backspace => self.state.backspace(),
            KeyCode::Delete => self.state.delete(),
            KeyCode::Left => {
                if let Some(prev) = self.state.prev_boundary() {
                    self.state.cursor = prev;
                }
            }
            KeyCode::Right => {
                if let Some(next) = self.state.next_boundary() {
                    self.state.cursor = next;
                }
            }
            KeyCode::Home => self.state.cursor = 0,
            KeyCode::End => self.state.cursor = self.state.content.len(),
            _ => {}
        }

        ComposerResult::None
    }

    pub fn paste(&mut self, text: &str) {
        self.state.insert_str(&text.replace("\r\n", "\n"));
    }

    pub fn content(&self) -> &str {
        &self.state.content
    }

    pub fn clear(&mut self) {
        self.state.clear();
    }

    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn set_preview(&mut self, data_uri: Option<&str>) {
        self.preview = data_uri.map(attachment::describe);
    }

    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    pub fn tick(&mut self) {
        self.frame = self.frame.wrapping_add(1);
    }

    /// Rows the composer wants, borders and preview included, capped so the
    /// text area never grows past `max_lines`
    pub fn desired_height(&self, max_lines: u16) -> u16 {
        let text_lines = self.state.content.split('\n').count().max(1) as u16;
        let preview = u16::from(self.preview.is_some());
        text_lines.min(max_lines.max(1)) + preview + 2
    }

    fn title(&self) -> Line<'static> {
        if self.busy {
            Line::from(vec![
                Span::styled(
                    format!(" {} ", SPINNER[self.frame % SPINNER.len()]),
                    Style::default().fg(Color::Yellow),
                ),
                Span::styled("Waiting for reply ", Style::default().fg(Color::DarkGray)),
            ])
        } else {
            Line::from(vec![
                Span::styled(" ➤ ", Style::default().fg(Color::Green)),
                Span::styled("Enter to send · /help ", Style::default().fg(Color::DarkGray)),
            ])
        }
    }
}

impl Widget for &ConversationComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.busy {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Green)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(self.title())
            .border_style(border_style);

        let inner = block.inner(area);
        block.render(area, buf);
        if inner.height == 0 {
            return;
        }

        let mut y = inner.y;
        if let Some(label) = &self.preview {
            let line = Line::from(vec![
                Span::styled("🖼 ", Style::default().fg(Color::Magenta)),
                Span::styled(label.clone(), Style::default().fg(Color::Magenta)),
                Span::styled("  (Ctrl+R to remove)", Style::default().fg(Color::DarkGray)),
            ]);
            buf.set_line(inner.x, y, &line, inner.width);
            y += 1;
        }
        let rows = (inner.y + inner.height).saturating_sub(y) as usize;

        if self.state.content.is_empty() {
            let placeholder = Line::from(Span::styled(
                self.placeholder.clone(),
                Style::default().fg(Color::DarkGray),
            ));
            if rows > 0 {
                buf.set_line(inner.x, y, &placeholder, inner.width);
            }
            return;
        }

        let mut content = self.state.content.clone();
        content.insert(self.state.cursor.min(content.len()), '▌');

        // Keep the cursor line visible when the text outgrows the box.
        let lines: Vec<&str> = content.split('\n').collect();
        let cursor_line = content[..self.state.cursor].matches('\n').count();
        let first = (cursor_line + 1).saturating_sub(rows);

        for (row, text) in lines.iter().skip(first).take(rows).enumerate() {
            let style = if self.busy {
                Style::default().add_modifier(Modifier::DIM)
            } else {
                Style::default()
            };
            let line = Line::from(Span::styled(text.to_string(), style));
            buf.set_line(inner.x, y + row as u16, &line, inner.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(composer: &mut ConversationComposer, text: &str) {
        for c in text.chars() {
            composer.handle_key(press(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_enter_submits_without_clearing() {
        let mut composer = ConversationComposer::new("");
        type_str(&mut composer, "hello");
        assert_eq!(composer.handle_key(press(KeyCode::Enter)), ComposerResult::Submit);
        assert_eq!(composer.content(), "hello");
    }

    #[test]
    fn test_shift_enter_inserts_newline() {
        let mut composer = ConversationComposer::new("");
        type_str(&mut composer, "a");
        let result = composer.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT));
        assert_eq!(result, ComposerResult::None);
        type_str(&mut composer, "b");
        assert_eq!(composer.content(), "a\nb");
        assert_eq!(composer.desired_height(6), 4);
    }

    #[test]
    fn test_command_clears_input() {
        let mut composer = ConversationComposer::new("");
        type_str(&mut composer, "/image cat.png");
        match composer.handle_key(press(KeyCode::Enter)) {
            ComposerResult::Command(parsed) => assert_eq!(parsed.argument(), Some("cat.png")),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(composer.content(), "");
    }

    #[test]
    fn test_multibyte_editing() {
        let mut composer = ConversationComposer::new("");
        type_str(&mut composer, "héé");
        composer.handle_key(press(KeyCode::Left));
        composer.handle_key(press(KeyCode::Backspace));
        assert_eq!(composer.content(), "hé");
        composer.handle_key(press(KeyCode::Home));
        composer.handle_key(press(KeyCode::Delete));
        assert_eq!(composer.content(), "é");
        composer.handle_key(press(KeyCode::End));
        type_str(&mut composer, "👋");
        assert_eq!(composer.content(), "é👋");
    }

    #[test]
    fn test_height_is_capped() {
        let mut composer = ConversationComposer::new("");
        composer.paste("1\n2\n3\n4\n5\n6\n7\n8");
        assert_eq!(composer.desired_height(6), 8);
        composer.set_preview(Some("data:image/png;base64,YWJj"));
        assert_eq!(composer.desired_height(6), 9);
        assert_eq!(composer.preview(), Some("image/png, 3 B"));
    }
}
