//! Upstream streaming connections.

pub mod handler;
pub mod oauth;
pub mod producer;

use std::time::Duration;

use common::retry::BackoffPolicy;
use thiserror::Error;

pub use handler::{QueueHandler, StreamHandler};
pub use oauth::OAuthCredentials;
pub use producer::{Producer, ProducerState};

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Upstream rejected credentials (HTTP {0})")]
    InvalidCredentials(u16),

    #[error("Rate limited by upstream (HTTP {0})")]
    RateLimited(u16),

    #[error("Upstream returned HTTP {0}")]
    Http(u16),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("No data received for {0:?}")]
    IdleTimeout(Duration),

    #[error("Upstream closed the stream")]
    Eof,

    #[error("Upstream disconnect {code}: {reason}")]
    Disconnected { code: i64, reason: String },

    #[error("Failed to sign request: {0}")]
    Signing(String),

    #[error("Event queue closed")]
    QueueClosed,
}

impl StreamError {
    /// Classify a non-2xx response.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => StreamError::InvalidCredentials(status),
            420 | 429 => StreamError::RateLimited(status),
            _ => StreamError::Http(status),
        }
    }

    /// Errors that reconnecting cannot fix.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StreamError::InvalidCredentials(_) | StreamError::Signing(_) | StreamError::QueueClosed
        )
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        match self {
            StreamError::RateLimited(_) => BackoffPolicy::RATE_LIMITED,
            StreamError::Http(_) => BackoffPolicy::HTTP,
            _ => BackoffPolicy::NETWORK,
        }
    }
}

impl From<crate::queue::QueueClosed> for StreamError {
    fn from(_: crate::queue::QueueClosed) -> Self {
        StreamError::QueueClosed
    }
}
