//! In-memory doubles for the controller's collaborators.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use super::elements::{AttachmentPreview, InputField, SendControl, TurnSurface};
use crate::backend::{ChatBackend, ChatReply, ChatRequest};
use crate::error::ChatError;
use crate::events::{Sender, Turn, TurnBody, TurnId};
use crate::lock;

/// Everything the controller did to the view, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Append(TurnId, Sender),
    Update(TurnId),
    ShowIndicator,
    HideIndicator,
    Busy(bool),
    ClearInput,
    ShowPreview,
    HidePreview,
}

#[derive(Default)]
pub struct RecordingView {
    input: Mutex<String>,
    turns: Mutex<Vec<Turn>>,
    history: Mutex<Vec<(TurnId, TurnBody)>>,
    events: Mutex<Vec<ViewEvent>>,
    indicator: Mutex<bool>,
    busy: Mutex<bool>,
    preview: Mutex<Option<String>>,
}

impl RecordingView {
    pub fn type_text(&self, text: &str) {
        *lock(&self.input) = text.to_string();
    }

    pub fn input_text(&self) -> String {
        lock(&self.input).clone()
    }

    pub fn turns(&self) -> Vec<Turn> {
        lock(&self.turns).clone()
    }

    pub fn turn(&self, id: TurnId) -> Option<Turn> {
        lock(&self.turns).iter().find(|turn| turn.id == id).cloned()
    }

    pub fn last_turn(&self) -> Option<Turn> {
        lock(&self.turns).last().cloned()
    }

    /// Every body a turn has displayed, starting with the one it was appended with
    pub fn bodies_of(&self, id: TurnId) -> Vec<TurnBody> {
        lock(&self.history)
            .iter()
            .filter(|(turn, _)| *turn == id)
            .map(|(_, body)| body.clone())
            .collect()
    }

    pub fn events(&self) -> Vec<ViewEvent> {
        lock(&self.events).clone()
    }

    pub fn indicator_visible(&self) -> bool {
        *lock(&self.indicator)
    }

    pub fn is_busy(&self) -> bool {
        *lock(&self.busy)
    }

    pub fn preview(&self) -> Option<String> {
        lock(&self.preview).clone()
    }

    fn record(&self, event: ViewEvent) {
        lock(&self.events).push(event);
    }
}

impl InputField for RecordingView {
    fn text(&self) -> String {
        lock(&self.input).clone()
    }

    fn clear(&self) {
        lock(&self.input).clear();
        self.record(ViewEvent::ClearInput);
    }
}

impl TurnSurface for RecordingView {
    fn append_turn(&self, turn: Turn) {
        self.record(ViewEvent::Append(turn.id, turn.sender));
        lock(&self.history).push((turn.id, turn.body.clone()));
        lock(&self.turns).push(turn);
    }

    fn update_turn(&self, id: TurnId, body: TurnBody) {
        let mut turns = lock(&self.turns);
        if let Some(turn) = turns.iter_mut().find(|turn| turn.id == id) {
            self.record(ViewEvent::Update(id));
            lock(&self.history).push((id, body.clone()));
            turn.body = body;
        }
    }

    fn show_typing_indicator(&self) {
        *lock(&self.indicator) = true;
        self.record(ViewEvent::ShowIndicator);
    }

    fn hide_typing_indicator(&self) {
        *lock(&self.indicator) = false;
        self.record(ViewEvent::HideIndicator);
    }
}

impl SendControl for RecordingView {
    fn set_busy(&self, busy: bool) {
        *lock(&self.busy) = busy;
        self.record(ViewEvent::Busy(busy));
    }
}

impl AttachmentPreview for RecordingView {
    fn show(&self, data_uri: &str) {
        *lock(&self.preview) = Some(data_uri.to_string());
        self.record(ViewEvent::ShowPreview);
    }

    fn hide(&self) {
        *lock(&self.preview) = None;
        self.record(ViewEvent::HidePreview);
    }
}

/// Backend answering from a script of canned replies
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<ChatReply, ChatError>>>,
    requests: Mutex<Vec<ChatRequest>>,
    calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
    entered: Arc<Notify>,
}

impl ScriptedBackend {
    pub fn replying(reply: Result<ChatReply, ChatError>) -> Self {
        let backend = Self::default();
        backend.push(reply);
        backend
    }

    /// Hold every request until `gate` is notified
    pub fn gated(reply: Result<ChatReply, ChatError>, gate: Arc<Notify>) -> Self {
        let mut backend = Self::replying(reply);
        backend.gate = Some(gate);
        backend
    }

    pub fn push(&self, reply: Result<ChatReply, ChatError>) {
        lock(&self.replies).push_back(reply);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        lock(&self.requests).clone()
    }

    /// Resolves once a request has reached the backend
    pub async fn entered(&self) {
        self.entered.notified().await;
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, ChatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.requests).push(request.clone());
        self.entered.notify_one();

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| Err(ChatError::Malformed("no scripted reply".to_string())))
    }
}
