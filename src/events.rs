use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::markdown;

/// Who a turn is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    pub fn display_name(&self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Bot => "Gemini",
        }
    }
}

/// Stable identity of a rendered turn, used to address later updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnId(Uuid);

impl TurnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// What a turn displays
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnBody {
    /// Shown exactly as written, never interpreted as markup
    Literal(String),
    /// Markdown source together with its rendered HTML
    Markdown { source: String, html: String },
}

impl TurnBody {
    pub fn literal(text: impl Into<String>) -> Self {
        TurnBody::Literal(text.into())
    }

    pub fn markdown(source: impl Into<String>) -> Self {
        let source = source.into();
        let html = markdown::render_html(&source);
        TurnBody::Markdown { source, html }
    }

    /// The underlying text, without any rendering applied
    pub fn text(&self) -> &str {
        match self {
            TurnBody::Literal(text) => text,
            TurnBody::Markdown { source, .. } => source,
        }
    }

    /// HTML for this body. Literal text is escaped.
    pub fn to_html(&self) -> String {
        match self {
            TurnBody::Literal(text) => markdown::escape_html(text),
            TurnBody::Markdown { html, .. } => html.clone(),
        }
    }

    pub fn is_markdown(&self) -> bool {
        matches!(self, TurnBody::Markdown { .. })
    }
}

/// One rendered unit of conversation
#[derive(Debug, Clone)]
pub struct Turn {
    pub id: TurnId,
    pub sender: Sender,
    pub body: TurnBody,
    /// Data-URI of an attached image (user turns only)
    pub image: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(sender: Sender, body: TurnBody, image: Option<String>) -> Self {
        Self::with_id(TurnId::new(), sender, body, image)
    }

    pub fn with_id(id: TurnId, sender: Sender, body: TurnBody, image: Option<String>) -> Self {
        Self {
            id,
            sender,
            body,
            image,
            timestamp: Utc::now(),
        }
    }

    pub fn text(&self) -> &str {
        self.body.text()
    }
}

/// Terminal events fed to the application loop
#[derive(Debug, Clone)]
pub enum TuiEvent {
    /// Key press event
    Key(crossterm::event::KeyEvent),

    /// Bracketed paste
    Paste(String),

    /// Terminal resize
    Resize(u16, u16),

    /// Periodic redraw, drives the indicator and typing animation on screen
    Tick,
}
