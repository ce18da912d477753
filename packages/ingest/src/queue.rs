//! Bounded hand-off between producers and the consumer pool.

use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use thiserror::Error;
use tokio::sync::{Mutex, Notify, mpsc};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Event queue closed")]
pub struct QueueClosed;

impl From<QueueClosed> for crate::error::IngestError {
    fn from(_: QueueClosed) -> Self {
        crate::error::IngestError::QueueClosed
    }
}

#[derive(Debug, Default)]
struct Counters {
    /// Queued plus in flight.
    unfinished: AtomicUsize,
    in_flight: AtomicUsize,
    drained: Notify,
}

impl Counters {
    fn finish_one(&self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
        if self.unfinished.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.drained.notify_waiters();
        }
    }
}

/// Fixed-capacity FIFO shared by every consumer.
///
/// Cloning yields another handle onto the same queue.
pub struct EventQueue<T> {
    rx: Arc<Mutex<mpsc::Receiver<T>>>,
    tx: Arc<StdMutex<Option<mpsc::Sender<T>>>>,
    counters: Arc<Counters>,
    capacity: usize,
}

impl<T> Clone for EventQueue<T> {
    fn clone(&self) -> Self {
        Self {
            rx: Arc::clone(&self.rx),
            tx: Arc::clone(&self.tx),
            counters: Arc::clone(&self.counters),
            capacity: self.capacity,
        }
    }
}

impl<T> EventQueue<T> {
    /// `capacity` is raised to 1 if zero.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            rx: Arc::new(Mutex::new(rx)),
            tx: Arc::new(StdMutex::new(Some(tx))),
            counters: Arc::new(Counters::default()),
            capacity,
        }
    }

    /// A new producer handle, or `QueueClosed` after [`close`](Self::close).
    pub fn sender(&self) -> Result<QueueSender<T>, QueueClosed> {
        let guard = self.tx.lock().map_err(|_| QueueClosed)?;
        let tx = guard.as_ref().ok_or(QueueClosed)?.clone();
        Ok(QueueSender {
            tx,
            counters: Arc::clone(&self.counters),
        })
    }

    /// Stop handing out senders. Once every existing sender is dropped and the
    /// buffer is empty, [`recv`](Self::recv) returns `None`.
    pub fn close(&self) {
        if let Ok(mut guard) = self.tx.lock() {
            guard.take();
        }
    }

    /// Wait for the next item.
    pub async fn recv(&self) -> Option<Delivery<T>> {
        let item = self.rx.lock().await.recv().await?;
        self.counters.in_flight.fetch_add(1, Ordering::AcqRel);
        Some(Delivery {
            item,
            counters: Arc::clone(&self.counters),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items waiting in the buffer.
    pub fn len(&self) -> usize {
        let unfinished = self.counters.unfinished.load(Ordering::Acquire);
        let in_flight = self.counters.in_flight.load(Ordering::Acquire);
        unfinished.saturating_sub(in_flight)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items queued or still being processed.
    pub fn unfinished(&self) -> usize {
        self.counters.unfinished.load(Ordering::Acquire)
    }

    /// Resolve once every accepted item has been received and acknowledged.
    pub async fn wait_drained(&self) {
        loop {
            let notified = self.counters.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.unfinished() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Cloneable producer handle.
pub struct QueueSender<T> {
    tx: mpsc::Sender<T>,
    counters: Arc<Counters>,
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            counters: Arc::clone(&self.counters),
        }
    }
}

impl<T> QueueSender<T> {
    /// Enqueue, waiting while the buffer is full.
    ///
    /// Cancel-safe: if the future is dropped while waiting, nothing was accepted.
    pub async fn send(&self, item: T) -> Result<(), QueueClosed> {
        let permit = self.tx.reserve().await.map_err(|_| QueueClosed)?;
        self.counters.unfinished.fetch_add(1, Ordering::AcqRel);
        permit.send(item);
        Ok(())
    }
}

/// One received item. Dropping it acknowledges the item.
pub struct Delivery<T> {
    item: T,
    counters: Arc<Counters>,
}

impl<T> Deref for Delivery<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.item
    }
}

impl<T> Drop for Delivery<T> {
    fn drop(&mut self) {
        self.counters.finish_one();
    }
}
