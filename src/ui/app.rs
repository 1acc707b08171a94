use anyhow::{Context, Result};
use crossterm::{
    event::{
        DisableBracketedPaste, EnableBracketedPaste, Event, EventStream, KeyCode, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::Duration;

use crate::backend::HttpChatBackend;
use crate::chat::{ChatController, ChatElements, IgnoreReason};
use crate::config::Config;
use crate::events::TuiEvent;
use crate::ui::conversation::{get_help_text, ChatScreen, ComposerResult, ParsedCommand, SlashCommand};

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// What the event loop should do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    None,
    Quit,
}

/// Run the chat TUI until the user quits
pub async fn run(config: Config) -> Result<()> {
    let backend = HttpChatBackend::from_config(&config).context("Failed to create chat backend")?;
    tracing::info!(url = backend.url(), "starting chat");

    let screen = Arc::new(ChatScreen::new(&config.ui));
    let controller = ChatController::new(
        ChatElements::from_shared(screen.clone()),
        Arc::new(backend),
        config.typing.into(),
    );

    let mut terminal = setup_terminal()?;
    let result = event_loop(&mut terminal, &screen, &controller, config.tick_rate()).await;
    restore_terminal(&mut terminal)?;

    tracing::info!("chat closed");
    result
}

fn setup_terminal() -> Result<Tui> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)
        .context("Failed to enter alternate screen")?;
    Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")
}

fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableBracketedPaste
    )
    .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

async fn event_loop(
    terminal: &mut Tui,
    screen: &ChatScreen,
    controller: &ChatController,
    tick_rate: Duration,
) -> Result<()> {
    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval(tick_rate);

    loop {
        terminal
            .draw(|frame| screen.render(frame.size(), frame.buffer_mut()))
            .context("Failed to draw")?;

        let event = tokio::select! {
            _ = ticker.tick() => Some(TuiEvent::Tick),
            next = events.next() => match next {
                Some(Ok(Event::Key(key))) => Some(TuiEvent::Key(key)),
                Some(Ok(Event::Paste(text))) => Some(TuiEvent::Paste(text)),
                Some(Ok(Event::Resize(width, height))) => Some(TuiEvent::Resize(width, height)),
                Some(Ok(_)) => None,
                Some(Err(e)) => return Err(e).context("Failed to read terminal event"),
                None => return Ok(()),
            },
        };
        let Some(event) = event else {
            continue;
        };

        if handle_event(event, screen, controller) == AppAction::Quit {
            return Ok(());
        }
    }
}

/// Apply one terminal event. Sends and attachments run as background tasks
/// so the screen keeps redrawing while they wait.
pub fn handle_event(event: TuiEvent, screen: &ChatScreen, controller: &ChatController) -> AppAction {
    match event {
        TuiEvent::Tick => screen.tick(),
        TuiEvent::Resize(width, height) => tracing::trace!(width, height, "terminal resized"),
        TuiEvent::Paste(text) => screen.paste(&text),
        TuiEvent::Key(key) => {
            if key.kind != KeyEventKind::Press {
                return AppAction::None;
            }

            let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
            let shift = key.modifiers.contains(KeyModifiers::SHIFT);
            match key.code {
                KeyCode::Esc => return AppAction::Quit,
                KeyCode::Char('c') if ctrl => return AppAction::Quit,
                KeyCode::Char('r') if ctrl => {
                    controller.remove_attachment();
                    return AppAction::None;
                }
                KeyCode::PageUp => {
                    screen.page_up();
                    return AppAction::None;
                }
                KeyCode::PageDown => {
                    screen.page_down();
                    return AppAction::None;
                }
                KeyCode::Up if shift => {
                    screen.scroll_up(1);
                    return AppAction::None;
                }
                KeyCode::Down if shift => {
                    screen.scroll_down(1);
                    return AppAction::None;
                }
                _ => {}
            }

            match screen.handle_key(key) {
                // The input is taken here, before any later key reaches it.
                ComposerResult::Submit => match controller.begin_send() {
                    Ok(pending) => {
                        tokio::spawn(pending.complete());
                    }
                    Err(IgnoreReason::Busy) => {
                        screen.set_notice("Still waiting for the previous reply…");
                    }
                    Err(IgnoreReason::Empty) => {}
                },
                ComposerResult::Command(command) => {
                    return handle_command(command, screen, controller);
                }
                ComposerResult::None => {}
            }
        }
    }

    AppAction::None
}

fn handle_command(command: ParsedCommand, screen: &ChatScreen, controller: &ChatController) -> AppAction {
    tracing::debug!(command = command.command.command(), "slash command");

    match command.command {
        SlashCommand::Image => {
            let Some(argument) = command.argument() else {
                screen.set_notice("Usage: /image <path>");
                return AppAction::None;
            };
            let path = expand_home(argument);
            let chat = controller.clone();
            tokio::spawn(async move {
                chat.attach_image(&path).await;
            });
        }
        SlashCommand::Remove => controller.remove_attachment(),
        SlashCommand::Help => screen.set_notice(get_help_text()),
        SlashCommand::Quit => return AppAction::Quit,
    }

    AppAction::None
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}
