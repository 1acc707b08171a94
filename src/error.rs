use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while talking to the backend or loading attachments.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The request never completed (connection refused, timeout, body read).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("backend returned HTTP {0}")]
    Status(reqwest::StatusCode),

    /// The backend answered 2xx but the body was not a recognised reply.
    #[error("malformed reply: {0}")]
    Malformed(String),

    #[error("could not read image {}: {source}", path.display())]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not build HTTP client: {0}")]
    Client(String),
}

impl ChatError {
    /// Transport, status and shape problems are all shown to the user as a
    /// single generic network error.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            ChatError::Transport(_) | ChatError::Status(_) | ChatError::Malformed(_)
        )
    }
}
