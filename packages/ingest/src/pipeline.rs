//! Wires producers, queue and consumers together for a streaming run.

use common::Status;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::consumer;
use crate::error::Result;
use crate::queue::EventQueue;
use crate::shutdown::ShutdownCoordinator;
use crate::stream::{OAuthCredentials, Producer, ProducerState, QueueHandler};

pub struct Pipeline {
    pub coordinator: ShutdownCoordinator,
    pub queue: EventQueue<Box<Status>>,
    pub producer_states: Vec<watch::Receiver<ProducerState>>,
    /// Cancelling this starts a shutdown.
    pub token: CancellationToken,
}

/// Ensure the schema exists, then start consumers and producers.
pub async fn start(config: &AppConfig) -> Result<Pipeline> {
    let db = store::database::init_db(&config.database).await?;
    drop(db);

    let token = CancellationToken::new();
    let queue = EventQueue::new(config.stream.queue_capacity);
    let mut coordinator = ShutdownCoordinator::new(token.clone(), queue.clone());

    coordinator.add_consumers(consumer::spawn_pool(config, &queue, &token).await?);

    let producers = config.stream.effective_producers();
    if producers != config.stream.producers {
        info!(
            configured = config.stream.producers,
            effective = producers,
            "Producer count clamped to the upstream session limit"
        );
    }

    let credentials = OAuthCredentials::from(&config.credentials);
    let mut producer_states = Vec::with_capacity(producers);
    for id in 0..producers {
        let handler = QueueHandler::new(queue.sender()?);
        let producer = Producer::new(
            id,
            &config.stream,
            credentials.clone(),
            handler,
            token.child_token(),
        )?;
        producer_states.push(producer.subscribe());

        let fatal = token.clone();
        coordinator.add_producer(tokio::spawn(async move {
            let result = producer.run().await;
            if let Err(e) = &result {
                error!(producer = id, error = %e, "Producer stopped on unrecoverable error");
                fatal.cancel();
            }
            result
        }));
    }

    info!(producers, capacity = queue.capacity(), "Pipeline started");
    Ok(Pipeline {
        coordinator,
        queue,
        producer_states,
        token,
    })
}
