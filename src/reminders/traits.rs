use async_trait::async_trait;
use thiserror::Error;

use std::time::Duration;

/// Failure delivering through one channel. These never leave the dispatcher;
/// they are logged and recorded as an undelivered channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("invalid email: {0}")]
    Email(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Reminder channel contract. New channels only need to implement this trait.
#[async_trait]
pub trait ReminderChannel: Send + Sync {
    /// Stable channel identifier (e.g. `email`, `telegram`).
    fn name(&self) -> &'static str;

    /// Attempts delivery. Returns `Ok(false)` without contacting anything
    /// when the channel is missing required settings.
    async fn send(&self, message: &str) -> Result<bool, ChannelError>;
}

pub async fn ensure_success(response: reqwest::Response) -> Result<(), ChannelError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    Err(ChannelError::Rejected {
        status: status.as_u16(),
        body,
    })
}

/// Returns the trimmed value when it is present and non-blank.
pub fn setting(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
