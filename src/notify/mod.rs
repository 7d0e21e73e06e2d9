//! Alert formatting and delivery.

pub mod format;
pub mod telegram;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

pub use format::{escape_markdown, format_alert, AlertKind};
pub use telegram::TelegramNotifier;

use crate::error::Result;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("notification request failed")]
    Request(#[source] reqwest::Error),
    #[error("notification rejected with status {status}: {description}")]
    Rejected {
        status: StatusCode,
        description: String,
    },
}

/// A channel that accepts one text message at a time.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `text`, returning once the channel has accepted or refused it.
    async fn send(&self, text: &str) -> Result<()>;
}
