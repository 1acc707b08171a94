use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::elements::ChatElements;
use super::typing::{TypingAnimator, TypingDelay};
use crate::attachment;
use crate::backend::{ChatBackend, ChatReply, ChatRequest};
use crate::events::{Sender, Turn, TurnBody, TurnId};
use crate::lock;

/// Shown before the backend's own message when it reports a failure
pub const SERVER_ERROR_PREFIX: &str = "Sorry, I encountered an error: ";

/// Shown when the request never produced a usable reply
pub const NETWORK_ERROR_TEXT: &str = "Sorry, I encountered a network error. Please try again.";

/// Which path a call to [`ChatController::send_message`] took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Ignored(IgnoreReason),
    /// The reply is being typed out
    Replied,
    ServerError,
    NetworkError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// No text and no attachment
    Empty,
    /// Another request is still in flight
    Busy,
}

/// Orchestrates the send, receive and render cycle against the backend
#[derive(Clone)]
pub struct ChatController {
    inner: Arc<Inner>,
}

struct Inner {
    elements: ChatElements,
    backend: Arc<dyn ChatBackend>,
    animator: TypingAnimator,
    loading: AtomicBool,
    attachment: Mutex<Option<String>>,
}

impl ChatController {
    pub fn new(elements: ChatElements, backend: Arc<dyn ChatBackend>, delay: TypingDelay) -> Self {
        let animator = TypingAnimator::new(elements.turns.clone(), delay);
        Self {
            inner: Arc::new(Inner {
                elements,
                backend,
                animator,
                loading: AtomicBool::new(false),
                attachment: Mutex::new(None),
            }),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::SeqCst)
    }

    pub fn pending_attachment(&self) -> Option<String> {
        lock(&self.inner.attachment).clone()
    }

    /// Read an image file and hold it for the next message. A file that
    /// cannot be read leaves the attachment unchanged.
    pub async fn attach_image(&self, path: &Path) {
        match attachment::load_data_uri(path).await {
            Ok(data_uri) => self.set_attachment(data_uri),
            Err(e) => tracing::debug!(error = %e, "image attachment skipped"),
        }
    }

    /// Hold already loaded image bytes for the next message
    pub fn attach_image_bytes(&self, bytes: &[u8]) {
        let mime = attachment::sniff_mime(bytes).unwrap_or("application/octet-stream");
        self.set_attachment(attachment::encode_data_uri(bytes, mime));
    }

    fn set_attachment(&self, data_uri: String) {
        self.inner.elements.preview.show(&data_uri);
        tracing::info!(image = %attachment::describe(&data_uri), "image attached");
        *lock(&self.inner.attachment) = Some(data_uri);
    }

    pub fn remove_attachment(&self) {
        self.inner.remove_attachment();
    }

    /// Send the composed text and pending attachment to the backend.
    pub async fn send_message(&self) -> SendOutcome {
        match self.begin_send() {
            Ok(pending) => pending.complete().await,
            Err(reason) => SendOutcome::Ignored(reason),
        }
    }

    /// The synchronous half of a send: check the input, take it, render the
    /// user's turn and mark the request in flight. Nothing is read from the
    /// input after this returns.
    pub fn begin_send(&self) -> Result<PendingSend, IgnoreReason> {
        let inner = &self.inner;
        let elements = &inner.elements;

        let message = elements.input.text().trim().to_string();
        let image = self.pending_attachment();

        if message.is_empty() && image.is_none() {
            return Err(IgnoreReason::Empty);
        }

        let Some(in_flight) = InFlight::acquire(inner) else {
            tracing::debug!("send ignored, request already in flight");
            return Err(IgnoreReason::Busy);
        };

        inner.render_turn(&message, Sender::User, image.as_deref());
        elements.input.clear();
        elements.turns.show_typing_indicator();
        elements.send_button.set_busy(true);

        Ok(PendingSend {
            inner: inner.clone(),
            request: ChatRequest { message, image },
            _in_flight: in_flight,
        })
    }

    /// Append a finished turn. Bot text is markdown; user text is shown as is.
    /// Images are only shown on user turns.
    pub fn render_turn(&self, text: &str, sender: Sender, image: Option<&str>) -> TurnId {
        self.inner.render_turn(text, sender, image)
    }

    pub fn is_animating(&self) -> bool {
        self.inner.animator.is_animating()
    }

    /// Wait until the reply currently being typed is fully rendered
    pub async fn wait_for_animation(&self) {
        self.inner.animator.wait_idle().await;
    }
}

/// A request whose user turn is already on screen, waiting on the backend
pub struct PendingSend {
    inner: Arc<Inner>,
    request: ChatRequest,
    _in_flight: InFlight,
}

impl PendingSend {
    pub fn request(&self) -> &ChatRequest {
        &self.request
    }

    /// Wait for the reply and render it. Loading and the attachment are reset
    /// when this returns.
    pub async fn complete(self) -> SendOutcome {
        let inner = &self.inner;
        let result = inner.backend.send(&self.request).await;

        inner.elements.turns.hide_typing_indicator();

        let outcome = match result {
            Ok(ChatReply::Text(text)) => {
                inner.animator.start(text);
                SendOutcome::Replied
            }
            Ok(ChatReply::Failure(error)) => {
                tracing::warn!(%error, "backend reported a failure");
                inner.render_turn(&format!("{SERVER_ERROR_PREFIX}{error}"), Sender::Bot, None);
                SendOutcome::ServerError
            }
            Err(e) => {
                tracing::error!(error = %e, network = e.is_network(), "chat request failed");
                inner.render_turn(NETWORK_ERROR_TEXT, Sender::Bot, None);
                SendOutcome::NetworkError
            }
        };

        tracing::debug!(?outcome, "send settled");
        outcome
    }
}

impl Inner {
    fn render_turn(&self, text: &str, sender: Sender, image: Option<&str>) -> TurnId {
        let turn = match sender {
            Sender::User => Turn::new(sender, TurnBody::literal(text), image.map(str::to_string)),
            Sender::Bot => Turn::new(sender, TurnBody::markdown(text), None),
        };
        let id = turn.id;
        self.elements.turns.append_turn(turn);
        id
    }

    fn remove_attachment(&self) {
        *lock(&self.attachment) = None;
        self.elements.preview.hide();
    }
}

/// Held for the duration of a request. Dropping it, on any path, clears the
/// loading flag, restores the send affordance and discards the attachment.
struct InFlight {
    inner: Arc<Inner>,
}

impl InFlight {
    fn acquire(inner: &Arc<Inner>) -> Option<Self> {
        inner
            .loading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self {
                inner: inner.clone(),
            })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.inner.loading.store(false, Ordering::SeqCst);
        self.inner.elements.send_button.set_busy(false);
        self.inner.remove_attachment();
    }
}
