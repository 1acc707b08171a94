//! Conversation UI components for the chat screen

pub mod commands;
pub mod composer;
pub mod history;
pub mod screen;

pub use commands::{get_help_text, parse_slash_command, ParsedCommand, SlashCommand};
pub use composer::{ComposerResult, ConversationComposer};
pub use history::ConversationHistory;
pub use screen::ChatScreen;
