//! Terminal chat client: sends text and image prompts to a chat backend and
//! types the replies out into a conversation view.

pub mod attachment;
pub mod backend;
pub mod chat;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod markdown;
pub mod ui;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
