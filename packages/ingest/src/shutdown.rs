//! Orderly stop: producers first, then drain the queue, then consumers.

use std::future::Future;
use std::time::Duration;

use common::Status;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::{IngestError, Result};
use crate::queue::EventQueue;
use crate::stream::StreamError;

const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
pub async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn termination_signal() {
    let ctrl_c = interrupt();

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

pub struct ShutdownCoordinator {
    token: CancellationToken,
    queue: EventQueue<Box<Status>>,
    producers: Vec<JoinHandle<std::result::Result<(), StreamError>>>,
    consumers: Vec<JoinHandle<Result<()>>>,
}

impl ShutdownCoordinator {
    /// `token` stops producers; anything that cancels it starts a shutdown.
    pub fn new(token: CancellationToken, queue: EventQueue<Box<Status>>) -> Self {
        Self {
            token,
            queue,
            producers: Vec::new(),
            consumers: Vec::new(),
        }
    }

    pub fn add_producer(&mut self, handle: JoinHandle<std::result::Result<(), StreamError>>) {
        self.producers.push(handle);
    }

    pub fn add_consumers(&mut self, handles: impl IntoIterator<Item = JoinHandle<Result<()>>>) {
        self.consumers.extend(handles);
    }

    /// Wait for a termination signal or an internal fatal error, then shut down.
    /// A second Ctrl-C while draining abandons the queue.
    pub async fn run_until_signal(self) -> Result<()> {
        tokio::select! {
            _ = termination_signal() => info!("Termination requested, shutting down"),
            _ = self.token.cancelled() => warn!("Fatal error reported, shutting down"),
        }
        self.drain(interrupt()).await
    }

    /// Shut down now, waiting for the queue to drain.
    pub async fn shutdown(self) -> Result<()> {
        self.drain(std::future::pending::<()>()).await
    }

    async fn drain<F: Future<Output = ()>>(self, force: F) -> Result<()> {
        let Self {
            token,
            queue,
            producers,
            consumers,
        } = self;

        token.cancel();

        let mut failure: Option<IngestError> = None;
        for handle in producers {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(error = %e, "Producer failed");
                    failure.get_or_insert(IngestError::Stream(e));
                }
                Err(e) => error!(error = %e, "Producer task panicked"),
            }
        }
        queue.close();
        info!(remaining = queue.unfinished(), "Producers stopped, draining queue");

        let all_consumers = futures::future::join_all(consumers);
        tokio::pin!(all_consumers);
        tokio::pin!(force);
        let mut progress = interval_at(Instant::now() + PROGRESS_INTERVAL, PROGRESS_INTERVAL);

        let results = loop {
            tokio::select! {
                _ = queue.wait_drained() => {
                    info!("Queue drained");
                    break (&mut all_consumers).await;
                }
                results = &mut all_consumers => break results,
                _ = progress.tick() => {
                    info!(remaining = queue.unfinished(), "Waiting for queue to drain");
                }
                _ = &mut force => {
                    let remaining = queue.unfinished();
                    error!(remaining, "Forced exit before the queue drained");
                    return Err(IngestError::Abandoned(remaining));
                }
            }
        };

        for result in results {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failure.get_or_insert(e);
                }
                Err(e) => error!(error = %e, "Consumer task panicked"),
            }
        }

        let remaining = queue.unfinished();
        if remaining > 0 {
            error!(remaining, "Consumers exited with events still queued");
            return Err(IngestError::Abandoned(remaining));
        }

        info!("Shutdown complete");
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
