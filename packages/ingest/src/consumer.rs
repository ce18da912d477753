//! Worker pool draining the event queue into the store.

use std::sync::Arc;
use std::time::Duration;

use common::config::{ConsumerConfig, DatabaseKind};
use common::{LanguageFilter, Status};
use sea_orm::DatabaseConnection;
use store::StoreError;
use store::persist::{self, UpsertOutcome};
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::config::AppConfig;
use crate::error::{IngestError, Result};
use crate::media::MediaFetcher;
use crate::queue::EventQueue;

/// What happened to one dequeued event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Rejected by the language filter.
    Filtered,
    Stored(UpsertOutcome),
}

/// Workers to run: the configured count, capped by CPUs and by how many
/// concurrent writers the backend tolerates.
pub fn pool_size(config: &ConsumerConfig, kind: DatabaseKind) -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let mut size = config.workers.max(1).min(cpus);
    if let Some(limit) = store::database::writer_limit(kind) {
        size = size.min(limit);
    }
    size
}

/// Filter, fetch media for, and persist one status.
///
/// `filter` is `None` for paths that persist unconditionally, like timeline backfill.
pub async fn handle_status(
    db: &DatabaseConnection,
    filter: Option<&LanguageFilter>,
    media: Option<&MediaFetcher>,
    status: &Status,
) -> std::result::Result<EventOutcome, StoreError> {
    if filter.is_some_and(|f| !f.accepts(status.lang.as_deref())) {
        return Ok(EventOutcome::Filtered);
    }

    let stored_media = match media {
        Some(fetcher) if !persist::tweet_exists(db, status.id).await? => {
            fetcher.fetch_all(status).await
        }
        _ => Vec::new(),
    };

    let outcome = persist::persist_event(db, status, &stored_media).await?;
    Ok(EventOutcome::Stored(outcome))
}

#[derive(Debug, Default)]
struct Throughput {
    observed: u64,
    accepted: u64,
}

pub struct Consumer {
    id: usize,
    queue: EventQueue<Box<Status>>,
    db: DatabaseConnection,
    filter: LanguageFilter,
    media: Option<Arc<MediaFetcher>>,
    log_interval: Duration,
    shutdown: CancellationToken,
}

impl Consumer {
    pub fn new(
        id: usize,
        queue: EventQueue<Box<Status>>,
        db: DatabaseConnection,
        filter: LanguageFilter,
        media: Option<Arc<MediaFetcher>>,
        log_interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            id,
            queue,
            db,
            filter,
            media,
            log_interval,
            shutdown,
        }
    }

    /// Run until the queue is closed and empty, or the store connection is lost.
    pub async fn run(self) -> Result<()> {
        let span = info_span!("consumer", id = self.id);
        self.run_inner().instrument(span).await
    }

    async fn run_inner(self) -> Result<()> {
        let period = self.log_interval.max(Duration::from_secs(1));
        let mut ticker = interval_at(Instant::now() + period, period);
        let mut window = Throughput::default();
        let mut window_start = Instant::now();

        loop {
            tokio::select! {
                delivery = self.queue.recv() => {
                    let Some(delivery) = delivery else { break };
                    window.observed += 1;

                    match handle_status(&self.db, Some(&self.filter), self.media.as_deref(), &delivery).await {
                        Ok(EventOutcome::Filtered) => {}
                        Ok(EventOutcome::Stored(outcome)) => {
                            window.accepted += 1;
                            debug!(tweet_id = delivery.id, ?outcome, "Stored event");
                        }
                        Err(e) if e.is_connection_lost() => {
                            error!(tweet_id = delivery.id, error = %e, "Lost store connection, stopping");
                            self.shutdown.cancel();
                            return Err(e.into());
                        }
                        Err(e) => {
                            warn!(tweet_id = delivery.id, error = %e, "Dropping event after store failure");
                        }
                    }
                }
                _ = ticker.tick() => {
                    let secs = window_start.elapsed().as_secs_f64().max(f64::EPSILON);
                    info!(
                        observed_per_sec = window.observed as f64 / secs,
                        accepted_per_sec = window.accepted as f64 / secs,
                        queue_depth = self.queue.len(),
                        "Throughput"
                    );
                    window = Throughput::default();
                    window_start = Instant::now();
                }
            }
        }

        info!("Consumer finished");
        Ok(())
    }
}

/// Open one session per worker and start them.
pub async fn spawn_pool(
    config: &AppConfig,
    queue: &EventQueue<Box<Status>>,
    shutdown: &CancellationToken,
) -> Result<Vec<JoinHandle<Result<()>>>> {
    let size = pool_size(&config.consumer, config.database.kind);
    if size < config.consumer.workers {
        info!(
            configured = config.consumer.workers,
            effective = size,
            "Consumer pool reduced"
        );
    }

    let filter = LanguageFilter::new(&config.stream.languages);
    let media = if config.media.enabled {
        Some(Arc::new(MediaFetcher::new(&config.media).await?))
    } else {
        None
    };
    let log_interval = Duration::from_secs(config.consumer.log_interval_secs);

    let mut handles = Vec::with_capacity(size);
    for id in 0..size {
        let db = store::database::open_session(&config.database)
            .await
            .map_err(IngestError::Db)?;
        let consumer = Consumer::new(
            id,
            queue.clone(),
            db,
            filter.clone(),
            media.clone(),
            log_interval,
            shutdown.clone(),
        );
        handles.push(tokio::spawn(consumer.run()));
    }

    info!(
        workers = size,
        media = config.media.enabled,
        any_language = filter.accepts_all(),
        "Consumer pool started"
    );
    Ok(handles)
}
