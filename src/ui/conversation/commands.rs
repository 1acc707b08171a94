use std::str::FromStr;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be invoked by starting a message with a leading slash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Attach an image file to the next message
    Image,
    /// Drop the pending image
    Remove,
    /// Show help
    Help,
    /// Exit the application
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: SlashCommand,
    pub argument: Option<String>,
}

impl ParsedCommand {
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::Image => "attach an image to the next message: /image <path>",
            SlashCommand::Remove => "remove the pending image",
            SlashCommand::Help => "show available commands",
            SlashCommand::Quit => "exit the application",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }
}

/// Parse a slash command from user input
pub fn parse_slash_command(input: &str) -> Option<ParsedCommand> {
    let rest = input.trim().strip_prefix('/')?;

    let (head, argument) = match rest.split_once(char::is_whitespace) {
        Some((head, argument)) => (head, Some(argument.trim())),
        None => (rest, None),
    };

    let head = head.to_lowercase();
    let command = SlashCommand::from_str(&head).ok().or_else(|| match head.as_str() {
        "img" | "attach" => Some(SlashCommand::Image),
        "rm" | "detach" => Some(SlashCommand::Remove),
        "h" | "?" => Some(SlashCommand::Help),
        "q" | "exit" | "bye" => Some(SlashCommand::Quit),
        _ => None,
    })?;

    let argument = argument.filter(|arg| !arg.is_empty()).map(str::to_string);

    Some(ParsedCommand { command, argument })
}

/// Get help text for all available commands
pub fn get_help_text() -> String {
    let mut help = String::from("Commands: ");
    let entries: Vec<String> = SlashCommand::iter()
        .map(|command| format!("/{} - {}", command.command(), command.description()))
        .collect();
    help.push_str(&entries.join(" · "));
    help.push_str(" · Enter sends, Shift+Enter adds a line, Ctrl+R removes the image, Esc quits");
    help
}
