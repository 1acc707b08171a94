//! Conversation history display component

use crate::attachment;
use crate::events::{Sender, Turn, TurnBody, TurnId};
use crate::markdown;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};
use std::collections::VecDeque;

/// Conversation history display component
#[derive(Debug)]
pub struct ConversationHistory {
    turns: VecDeque<Turn>,
    max_turns: usize,
    typing_indicator: bool,
    frame: usize,
    /// Lines scrolled up from the bottom
    scroll: usize,
    /// Rows shown by the last draw
    viewport: usize,
}

impl ConversationHistory {
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            max_turns: max_turns.max(1),
            typing_indicator: false,
            frame: 0,
            scroll: 0,
            viewport: 0,
        }
    }

    /// Append a turn and jump back to the newest line
    pub fn push(&mut self, turn: Turn) {
        self.scroll = 0;
        self.turns.push_back(turn);
        if self.turns.len() > self.max_turns {
            self.turns.pop_front();
        }
    }

    /// Returns false when no turn has this id (it may have scrolled out)
    pub fn update(&mut self, id: TurnId, body: TurnBody) -> bool {
        match self.turns.iter_mut().rev().find(|turn| turn.id == id) {
            Some(turn) => {
                turn.body = body;
                true
            }
            None => false,
        }
    }

    pub fn set_typing_indicator(&mut self, visible: bool) {
        self.typing_indicator = visible;
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn tick(&mut self) {
        self.frame = self.frame.wrapping_add(1);
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn page_up(&mut self) {
        self.scroll_up(self.page());
    }

    pub fn page_down(&mut self) {
        self.scroll_down(self.page());
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll
    }

    fn page(&self) -> usize {
        self.viewport.saturating_sub(1).max(1)
    }
}

/// Draws the newest lines unless scrolled. The offset is clamped to the
/// content so scrolling past the top stops there.
impl Widget for &mut ConversationHistory {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" 💬 Conversation ");

        let inner_area = block.inner(area);
        block.render(area, buf);

        self.viewport = inner_area.height as usize;

        if self.turns.is_empty() && !self.typing_indicator {
            let welcome_lines = [
                Line::from(Span::styled("Welcome! 👋", Style::default().fg(Color::Green))),
                Line::raw(""),
                Line::from(Span::styled(
                    "Ask anything below, or attach an image with /image <path>.",
                    Style::default().fg(Color::Gray),
                )),
            ];
            for (i, line) in welcome_lines.iter().enumerate() {
                if i < inner_area.height as usize {
                    buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
                }
            }
            return;
        }

        let width = inner_area.width.saturating_sub(2) as usize;
        let mut all_lines: Vec<Line> = Vec::new();
        for turn in &self.turns {
            all_lines.extend(render_turn(turn, width));
            all_lines.push(Line::raw(""));
        }
        if self.typing_indicator {
            all_lines.push(typing_dots(self.frame));
        }

        let height = inner_area.height as usize;
        let bottom = all_lines.len().saturating_sub(height);
        self.scroll = self.scroll.min(bottom);
        let start = bottom - self.scroll;
        for (i, line) in all_lines[start..].iter().take(height).enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

/// Render a single turn into lines
fn render_turn(turn: &Turn, width: usize) -> Vec<Line<'static>> {
    let (icon, color) = match turn.sender {
        Sender::User => ("👤", Color::Blue),
        Sender::Bot => ("🤖", Color::Green),
    };

    let mut lines = vec![Line::from(vec![
        Span::styled(
            format!("{} {} ", icon, turn.sender.display_name()),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            turn.timestamp.format("%H:%M:%S").to_string(),
            Style::default().fg(Color::DarkGray),
        ),
    ])];

    if turn.sender == Sender::User {
        if let Some(image) = &turn.image {
            let label = truncate(&attachment::describe(image), width.min(40));
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(format!("[🖼 {}]", label), Style::default().fg(Color::Magenta)),
            ]));
        }
    }

    match &turn.body {
        TurnBody::Literal(text) => {
            let style = match turn.sender {
                Sender::User => Style::default().fg(Color::Blue),
                Sender::Bot => Style::default().fg(Color::Green),
            };
            let content = wrap_text(text, width);
            let last = content.len().saturating_sub(1);
            for (i, text_line) in content.into_iter().enumerate() {
                let mut spans = vec![Span::raw("  "), Span::styled(text_line, style)];
                // A literal bot body is a reply still being typed.
                if turn.sender == Sender::Bot && i == last {
                    spans.push(Span::styled("▋", Style::default().fg(Color::Yellow)));
                }
                lines.push(Line::from(spans));
            }
        }
        TurnBody::Markdown { source, .. } => {
            for line in markdown::markdown_to_lines(source) {
                for wrapped in wrap_spans(&line.spans, width) {
                    let mut spans = vec![Span::raw("  ")];
                    spans.extend(wrapped.spans);
                    lines.push(Line::from(spans));
                }
            }
        }
    }

    lines
}

/// Three dots with one highlighted, moving every few ticks
fn typing_dots(frame: usize) -> Line<'static> {
    let lit = (frame / 4) % 3;
    let mut spans = vec![Span::styled("🤖 ", Style::default().fg(Color::Green))];
    for dot in 0..3 {
        let style = if dot == lit {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled("● ", style));
    }
    Line::from(spans)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// Wrap text to fit within `width` columns, keeping the author's line breaks
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_width = 0;
        for word in paragraph.split(' ') {
            let word_width = word.chars().count();
            if current_width > 0 && current_width + 1 + word_width > width {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            }
            if current_width > 0 {
                current.push(' ');
                current_width += 1;
            }
            current.push_str(word);
            current_width += word_width;
        }
        lines.push(current);
    }
    lines
}

/// Wrap styled spans to `width` columns, breaking at the last space that
/// fits and keeping every character's style
fn wrap_spans(spans: &[Span<'_>], width: usize) -> Vec<Line<'static>> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current: Vec<(char, Style)> = Vec::new();

    for span in spans {
        for ch in span.content.chars() {
            if current.len() >= width {
                if ch == ' ' {
                    lines.push(styled_line(&current));
                    current.clear();
                    continue;
                }
                match current.iter().rposition(|(c, _)| *c == ' ') {
                    Some(space) if space > 0 => {
                        let rest = current.split_off(space + 1);
                        current.pop();
                        lines.push(styled_line(&current));
                        current = rest;
                    }
                    _ => {
                        lines.push(styled_line(&current));
                        current.clear();
                    }
                }
            }
            current.push((ch, span.style));
        }
    }

    lines.push(styled_line(&current));
    lines
}

fn styled_line(chars: &[(char, Style)]) -> Line<'static> {
    let mut spans = Vec::new();
    let mut text = String::new();
    let mut run_style = Style::default();
    for &(ch, style) in chars {
        if style != run_style && !text.is_empty() {
            spans.push(Span::styled(std::mem::take(&mut text), run_style));
        }
        run_style = style;
        text.push(ch);
    }
    if !text.is_empty() {
        spans.push(Span::styled(text, run_style));
    }
    Line::from(spans)
}
