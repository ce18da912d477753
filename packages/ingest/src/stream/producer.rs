use std::time::Duration;

use common::StreamMessage;
use common::config::StreamConfig;
use common::retry::Backoff;
use futures::StreamExt;
use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use super::oauth::{self, OAuthCredentials};
use super::{StreamError, StreamHandler};

/// Longest line kept while waiting for its newline.
const MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerState {
    Disconnected,
    Connecting,
    Streaming,
    /// Terminal.
    Closed,
}

/// Splits a byte stream into `\n`-terminated lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    /// Append a chunk and return every line it completed, without the
    /// terminator and any `\r` before it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        if self.buf.len() > MAX_LINE_BYTES {
            warn!(bytes = self.buf.len(), "Discarding oversized partial line");
            self.buf.clear();
        }
        lines
    }
}

/// One long-lived connection to the streaming endpoint.
pub struct Producer<H> {
    id: usize,
    client: Client,
    url: String,
    credentials: OAuthCredentials,
    idle_timeout: Duration,
    handler: H,
    state: watch::Sender<ProducerState>,
    cancel: CancellationToken,
}

impl<H: StreamHandler> Producer<H> {
    pub fn new(
        id: usize,
        config: &StreamConfig,
        credentials: OAuthCredentials,
        handler: H,
        cancel: CancellationToken,
    ) -> Result<Self, StreamError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;
        let (state, _) = watch::channel(ProducerState::Disconnected);
        Ok(Self {
            id,
            client,
            url: config.url.clone(),
            credentials,
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
            handler,
            state,
            cancel,
        })
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ProducerState> {
        self.state.subscribe()
    }

    fn set_state(&self, next: ProducerState) {
        self.state.send_replace(next);
    }

    /// Stream until cancelled. Returns an error only for failures that
    /// reconnecting cannot fix.
    pub async fn run(self) -> Result<(), StreamError> {
        let span = info_span!("producer", id = self.id);
        self.run_inner().instrument(span).await
    }

    async fn run_inner(&self) -> Result<(), StreamError> {
        let mut backoff = Backoff::new();

        while !self.cancel.is_cancelled() {
            self.set_state(ProducerState::Connecting);

            let error = tokio::select! {
                _ = self.cancel.cancelled() => break,
                e = self.session(&mut backoff) => e,
            };

            if error.is_fatal() {
                self.handler.on_error(&error).await;
                self.set_state(ProducerState::Closed);
                return Err(error);
            }

            match &error {
                StreamError::IdleTimeout(_) => self.handler.on_timeout().await,
                _ => self.handler.on_error(&error).await,
            }
            self.set_state(ProducerState::Disconnected);

            let delay = backoff.next_delay(error.backoff_policy());
            warn!(
                error = %error,
                attempt = backoff.attempt(),
                delay_ms = delay.as_millis() as u64,
                "Reconnecting to stream"
            );

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.set_state(ProducerState::Closed);
        info!("Producer closed");
        Ok(())
    }

    /// Connect and read until the connection fails, returning why it ended.
    async fn session(&self, backoff: &mut Backoff) -> StreamError {
        let header = match oauth::authorization_header(&self.credentials, "GET", &self.url, &[]) {
            Ok(h) => h,
            Err(e) => return e,
        };

        let response = match self
            .client
            .get(&self.url)
            .header(AUTHORIZATION, header)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return e.into(),
        };

        let status = response.status();
        if !status.is_success() {
            return StreamError::from_status(status.as_u16());
        }

        self.set_state(ProducerState::Streaming);
        info!(url = %self.url, "Connected to stream");

        let mut body = response.bytes_stream();
        let mut lines = LineBuffer::default();

        loop {
            let chunk = match tokio::time::timeout(self.idle_timeout, body.next()).await {
                Err(_) => return StreamError::IdleTimeout(self.idle_timeout),
                Ok(None) => return StreamError::Eof,
                Ok(Some(Err(e))) => return e.into(),
                Ok(Some(Ok(chunk))) => chunk,
            };

            for line in lines.push(&chunk) {
                backoff.reset();
                match StreamMessage::decode(&line) {
                    Ok(None) => {}
                    Ok(Some(StreamMessage::Disconnect { code, reason })) => {
                        return StreamError::Disconnected { code, reason };
                    }
                    Ok(Some(message)) => {
                        if let Err(e) = self.handler.on_event(message).await {
                            return e;
                        }
                    }
                    Err(e) => debug!(error = %e, "Skipping undecodable line"),
                }
            }
        }
    }
}
