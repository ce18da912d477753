use async_trait::async_trait;
use common::{Status, StreamMessage};
use tracing::{debug, info, warn};

use super::StreamError;
use crate::queue::QueueSender;

/// Receives everything a producer reads off the wire.
#[async_trait]
pub trait StreamHandler: Send + Sync {
    /// A decoded message. Returning an error ends the current connection.
    async fn on_event(&self, message: StreamMessage) -> Result<(), StreamError>;

    /// The connection failed; the producer decides whether to reconnect.
    async fn on_error(&self, _error: &StreamError) {}

    /// No bytes arrived within the idle timeout.
    async fn on_timeout(&self) {}
}

/// Forwards statuses into the event queue.
pub struct QueueHandler {
    sender: QueueSender<Box<Status>>,
}

impl QueueHandler {
    pub fn new(sender: QueueSender<Box<Status>>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl StreamHandler for QueueHandler {
    async fn on_event(&self, message: StreamMessage) -> Result<(), StreamError> {
        match message {
            StreamMessage::Status(status) => self.sender.send(status).await?,
            StreamMessage::Limit { track } => info!(track, "Upstream limit notice"),
            StreamMessage::Warning { code, message } => {
                warn!(code = %code, message = %message, "Upstream stall warning")
            }
            StreamMessage::Disconnect { code, reason } => {
                info!(code, reason = %reason, "Upstream disconnect notice")
            }
            StreamMessage::Delete => debug!("Ignoring delete notice"),
            StreamMessage::Other => debug!("Ignoring unrecognised message"),
        }
        Ok(())
    }

    async fn on_error(&self, error: &StreamError) {
        if error.is_fatal() {
            return;
        }
        debug!(error = %error, "Stream connection lost");
    }

    async fn on_timeout(&self) {
        info!("Stream idle, reconnecting");
    }
}
