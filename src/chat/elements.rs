//! Handles to the display elements the controller drives.

use std::sync::Arc;

use crate::events::{Turn, TurnBody, TurnId};

/// The text input the user composes messages in
pub trait InputField: Send + Sync {
    fn text(&self) -> String;
    fn clear(&self);
}

/// Append-only list of rendered turns plus the typing indicator
pub trait TurnSurface: Send + Sync {
    fn append_turn(&self, turn: Turn);

    /// Replace the body of an already rendered turn. Unknown ids are ignored.
    fn update_turn(&self, id: TurnId, body: TurnBody);

    /// Show the waiting placeholder. Showing it twice still leaves one.
    fn show_typing_indicator(&self);

    /// Remove the waiting placeholder if present
    fn hide_typing_indicator(&self);
}

/// The send affordance: disabled with a spinner while a request is in flight
pub trait SendControl: Send + Sync {
    fn set_busy(&self, busy: bool);
}

/// Preview of the pending image attachment
pub trait AttachmentPreview: Send + Sync {
    fn show(&self, data_uri: &str);
    fn hide(&self);
}

/// Everything a [`ChatController`](super::ChatController) renders into
#[derive(Clone)]
pub struct ChatElements {
    pub input: Arc<dyn InputField>,
    pub turns: Arc<dyn TurnSurface>,
    pub send_button: Arc<dyn SendControl>,
    pub preview: Arc<dyn AttachmentPreview>,
}

impl ChatElements {
    /// Use one object for every element
    pub fn from_shared<T>(view: Arc<T>) -> Self
    where
        T: InputField + TurnSurface + SendControl + AttachmentPreview + 'static,
    {
        Self {
            input: view.clone(),
            turns: view.clone(),
            send_button: view.clone(),
            preview: view,
        }
    }
}
