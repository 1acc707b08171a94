//! The chat controller and the element handles it renders into

pub mod controller;
pub mod elements;
pub mod typing;

#[cfg(test)]
pub(crate) mod fakes;

pub use controller::{
    ChatController, IgnoreReason, PendingSend, SendOutcome, NETWORK_ERROR_TEXT, SERVER_ERROR_PREFIX,
};
pub use elements::{AttachmentPreview, ChatElements, InputField, SendControl, TurnSurface};
pub use typing::{TypingAnimator, TypingDelay};
