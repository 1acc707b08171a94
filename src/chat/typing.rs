//! Character-by-character reveal of an already complete bot reply.
//!
//! Only one reply types at a time. Starting a new one fast-forwards the
//! previous: its turn jumps straight to the final markdown rendering.

use rand::Rng;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};

use super::elements::TurnSurface;
use crate::config::TypingConfig;
use crate::events::{Sender, Turn, TurnBody, TurnId};
use crate::lock;

/// Uniform per-character delay in `[min, max)` milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingDelay {
    min_ms: u64,
    max_ms: u64,
}

impl TypingDelay {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min_ms: min_ms.min(max_ms),
            max_ms: max_ms.max(min_ms),
        }
    }

    pub fn sample(&self) -> Duration {
        if self.min_ms == self.max_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rand::thread_rng().gen_range(self.min_ms..self.max_ms))
    }
}

impl Default for TypingDelay {
    fn default() -> Self {
        TypingConfig::default().into()
    }
}

impl From<TypingConfig> for TypingDelay {
    fn from(config: TypingConfig) -> Self {
        Self::new(config.min_delay_ms, config.max_delay_ms)
    }
}

struct ActiveAnimation {
    turn: TurnId,
    skip: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

pub struct TypingAnimator {
    surface: Arc<dyn TurnSurface>,
    delay: TypingDelay,
    active: Mutex<Option<ActiveAnimation>>,
}

impl TypingAnimator {
    pub fn new(surface: Arc<dyn TurnSurface>, delay: TypingDelay) -> Self {
        Self {
            surface,
            delay,
            active: Mutex::new(None),
        }
    }

    /// Append an empty bot turn and start typing `text` into it.
    /// Must be called from within a tokio runtime.
    pub fn start(&self, text: String) -> TurnId {
        let id = TurnId::new();
        let (skip_tx, skip_rx) = oneshot::channel();

        let mut active = lock(&self.active);
        if let Some(previous) = active.take() {
            tracing::debug!(turn = %previous.turn, "fast-forwarding previous animation");
            let _ = previous.skip.send(());
        }

        self.surface
            .append_turn(Turn::with_id(id, Sender::Bot, TurnBody::literal(""), None));

        let task = tokio::spawn(type_out(
            self.surface.clone(),
            id,
            text,
            self.delay,
            skip_rx,
        ));

        *active = Some(ActiveAnimation {
            turn: id,
            skip: skip_tx,
            task,
        });

        id
    }

    pub fn is_animating(&self) -> bool {
        lock(&self.active)
            .as_ref()
            .is_some_and(|active| !active.task.is_finished())
    }

    /// Wait for the current animation, if any, to finish typing
    pub async fn wait_idle(&self) {
        let Some(active) = lock(&self.active).take() else {
            return;
        };
        let ActiveAnimation { turn, skip, task } = active;
        if let Err(e) = task.await {
            tracing::warn!(%turn, error = %e, "typing animation task failed");
        }
        drop(skip);
    }
}

async fn type_out(
    surface: Arc<dyn TurnSurface>,
    id: TurnId,
    text: String,
    delay: TypingDelay,
    mut skip: oneshot::Receiver<()>,
) {
    let mut shown = String::with_capacity(text.len());

    for ch in text.chars() {
        shown.push(ch);
        surface.update_turn(id, TurnBody::literal(shown.clone()));

        tokio::select! {
            _ = time::sleep(delay.sample()) => {}
            _ = &mut skip => break,
        }
    }

    // The markdown rendering replaces the raw text once, at the end.
    surface.update_turn(id, TurnBody::markdown(text));
}
