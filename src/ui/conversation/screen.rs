use std::sync::Mutex;

use crossterm::event::KeyEvent;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::chat::{AttachmentPreview, InputField, SendControl, TurnSurface};
use crate::config::UiConfig;
use crate::events::{Turn, TurnBody, TurnId};
use crate::lock;
use crate::ui::conversation::{ComposerResult, ConversationComposer, ConversationHistory};

struct ScreenState {
    history: ConversationHistory,
    composer: ConversationComposer,
    notice: Option<String>,
}

/// The terminal's conversation screen. The controller writes to it through
/// the element traits; the render loop reads it every tick.
pub struct ChatScreen {
    state: Mutex<ScreenState>,
    max_composer_lines: u16,
}

impl ChatScreen {
    pub fn new(ui: &UiConfig) -> Self {
        Self {
            state: Mutex::new(ScreenState {
                history: ConversationHistory::new(ui.history_limit),
                composer: ConversationComposer::new("Type a message…"),
                notice: None,
            }),
            max_composer_lines: ui.max_composer_lines,
        }
    }

    pub fn handle_key(&self, key: KeyEvent) -> ComposerResult {
        let mut state = lock(&self.state);
        state.notice = None;
        state.composer.handle_key(key)
    }

    pub fn paste(&self, text: &str) {
        lock(&self.state).composer.paste(text);
    }

    /// One-line message shown under the composer until the next key press
    pub fn set_notice(&self, notice: impl Into<String>) {
        lock(&self.state).notice = Some(notice.into());
    }

    pub fn tick(&self) {
        let mut state = lock(&self.state);
        state.history.tick();
        state.composer.tick();
    }

    /// Scroll the conversation one page towards older turns
    pub fn page_up(&self) {
        lock(&self.state).history.page_up();
    }

    pub fn page_down(&self) {
        lock(&self.state).history.page_down();
    }

    pub fn scroll_up(&self, lines: usize) {
        lock(&self.state).history.scroll_up(lines);
    }

    pub fn scroll_down(&self, lines: usize) {
        lock(&self.state).history.scroll_down(lines);
    }

    pub fn scroll_offset(&self) -> usize {
        lock(&self.state).history.scroll_offset()
    }

    pub fn render(&self, area: Rect, buf: &mut Buffer) {
        let mut guard = lock(&self.state);
        let state = &mut *guard;

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),
                Constraint::Length(state.composer.desired_height(self.max_composer_lines)),
                Constraint::Length(1),
            ])
            .split(area);

        state.history.render(chunks[0], buf);
        state.composer.render(chunks[1], buf);

        if let Some(notice) = &state.notice {
            let line = Line::from(Span::styled(notice.as_str(), Style::default().fg(Color::Yellow)));
            buf.set_line(chunks[2].x, chunks[2].y, &line, chunks[2].width);
        }
    }
}

impl InputField for ChatScreen {
    fn text(&self) -> String {
        lock(&self.state).composer.content().to_string()
    }

    fn clear(&self) {
        lock(&self.state).composer.clear();
    }
}

impl TurnSurface for ChatScreen {
    fn append_turn(&self, turn: Turn) {
        lock(&self.state).history.push(turn);
    }

    fn update_turn(&self, id: TurnId, body: TurnBody) {
        if !lock(&self.state).history.update(id, body) {
            tracing::trace!(%id, "update for a turn no longer on screen");
        }
    }

    fn show_typing_indicator(&self) {
        lock(&self.state).history.set_typing_indicator(true);
    }

    fn hide_typing_indicator(&self) {
        lock(&self.state).history.set_typing_indicator(false);
    }
}

impl SendControl for ChatScreen {
    fn set_busy(&self, busy: bool) {
        lock(&self.state).composer.set_busy(busy);
    }
}

impl AttachmentPreview for ChatScreen {
    fn show(&self, data_uri: &str) {
        lock(&self.state).composer.set_preview(Some(data_uri));
    }

    fn hide(&self) {
        lock(&self.state).composer.set_preview(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ChatReply;
    use crate::chat::fakes::ScriptedBackend;
    use crate::chat::{ChatController, ChatElements, SendOutcome, TypingDelay};
    use crate::events::Sender;
    use crossterm::event::{KeyCode, KeyModifiers};
    use std::sync::Arc;

    fn screen_text(screen: &ChatScreen, width: u16, height: u16) -> String {
        let area = Rect::new(0, 0, width, height);
        let mut buf = Buffer::empty(area);
        screen.render(area, &mut buf);
        let mut text = String::new();
        for y in 0..height {
            for x in 0..width {
                text.push_str(buf.get(x, y).symbol());
            }
            text.push('\n');
        }
        text
    }

    #[tokio::test]
    async fn test_controller_drives_screen() {
        let screen = Arc::new(ChatScreen::new(&UiConfig::default()));
        let backend = Arc::new(ScriptedBackend::replying(Ok(ChatReply::Text(
            "Hello **world**".to_string(),
        ))));
        let chat = ChatController::new(
            ChatElements::from_shared(screen.clone()),
            backend,
            TypingDelay::new(0, 0),
        );

        for c in "<script>".chars() {
            screen.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
        assert_eq!(screen.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)), ComposerResult::Submit);

        assert_eq!(chat.send_message().await, SendOutcome::Replied);
        chat.wait_for_animation().await;

        assert_eq!(screen.text(), "");
        let rendered = screen_text(&screen, 60, 20);
        assert!(rendered.contains("<script>"));
        assert!(rendered.contains("Hello world"));
        assert!(!rendered.contains("**"));
    }

    #[test]
    fn test_finished_reply_wraps_in_narrow_screen() {
        let screen = ChatScreen::new(&UiConfig::default());
        let turn = Turn::new(Sender::Bot, TurnBody::literal(""), None);
        let id = turn.id;
        screen.append_turn(turn);
        screen.update_turn(
            id,
            TurnBody::markdown("The quick brown fox jumps over the lazy dog and then ENDWORD"),
        );

        let rendered = screen_text(&screen, 30, 15);
        assert!(rendered.contains("The quick brown fox jumps"));
        assert!(rendered.contains("over the lazy dog and then"));
        assert!(rendered.contains("ENDWORD"));
    }

    #[test]
    fn test_page_up_reaches_start_of_long_reply() {
        let screen = ChatScreen::new(&UiConfig::default());
        let reply: Vec<String> = (0..40).map(|i| format!("- line{i}")).collect();
        screen.append_turn(Turn::new(Sender::Bot, TurnBody::markdown(reply.join("\n")), None));

        let bottom = screen_text(&screen, 40, 15);
        assert!(bottom.contains("line39"));
        assert!(!bottom.contains("line0 "));

        for _ in 0..10 {
            screen.page_up();
        }
        let top = screen_text(&screen, 40, 15);
        assert!(top.contains("line0 "));
        assert!(!top.contains("line39"));

        // A new turn brings the view back to the newest line.
        screen.append_turn(Turn::new(Sender::User, TurnBody::literal("more"), None));
        assert_eq!(screen.scroll_offset(), 0);
        assert!(screen_text(&screen, 40, 15).contains("more"));
    }

    #[test]
    fn test_typing_indicator_is_single_and_idempotent() {
        let screen = ChatScreen::new(&UiConfig::default());
        screen.show_typing_indicator();
        screen.show_typing_indicator();
        assert_eq!(screen_text(&screen, 40, 12).matches("● ● ●").count(), 1);

        screen.hide_typing_indicator();
        screen.hide_typing_indicator();
        assert_eq!(screen_text(&screen, 40, 12).matches("●").count(), 0);
    }

    #[test]
    fn test_busy_and_preview_show_in_composer() {
        let screen = ChatScreen::new(&UiConfig::default());
        screen.set_busy(true);
        AttachmentPreview::show(&screen, "data:image/png;base64,YWJj");
        let rendered = screen_text(&screen, 60, 12);
        assert!(rendered.contains("Waiting for reply"));
        assert!(rendered.contains("image/png, 3 B"));

        screen.set_busy(false);
        AttachmentPreview::hide(&screen);
        let rendered = screen_text(&screen, 60, 12);
        assert!(rendered.contains("Enter to send"));
        assert!(!rendered.contains("image/png"));
    }
}
