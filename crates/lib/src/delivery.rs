//! Delivery queue: many HTTP handlers enqueue, one worker sends.
//!
//! The queue is an unbounded mpsc channel, so enqueue never waits. The worker alternates
//! between waiting on the channel and awaiting the chat sender, which keeps sends strictly
//! in enqueue order and never overlapping. The first failed send stops the worker; the
//! gateway treats that as fatal.

use crate::channels::{ChatSender, SendError};
use crate::routing::DeliveryPayload;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Counters shared by the queue handles and the worker.
#[derive(Debug, Default)]
pub struct QueueStats {
    pending: AtomicUsize,
    delivered: AtomicU64,
}

impl QueueStats {
    /// Payloads enqueued but not yet taken by the worker.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Payloads the chat sender accepted.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::SeqCst)
    }
}

/// Returned by [`DeliveryQueue::enqueue`] once the worker has stopped; carries the payload back.
#[derive(Debug, thiserror::Error)]
#[error("delivery queue closed")]
pub struct QueueClosed(pub DeliveryPayload);

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("error sending message to {team}#{channel}")]
    Send {
        team: String,
        channel: String,
        #[source]
        source: SendError,
    },
}

/// Producer handle. Cheap to clone; one per request handler is fine.
#[derive(Clone)]
pub struct DeliveryQueue {
    tx: mpsc::UnboundedSender<DeliveryPayload>,
    stats: Arc<QueueStats>,
}

/// The single consumer. Not cloneable: exactly one worker drains a queue.
pub struct DeliveryWorker {
    rx: mpsc::UnboundedReceiver<DeliveryPayload>,
    stats: Arc<QueueStats>,
}

/// Create a connected queue and worker.
pub fn delivery_queue() -> (DeliveryQueue, DeliveryWorker) {
    let (tx, rx) = mpsc::unbounded_channel();
    let stats = Arc::new(QueueStats::default());
    (
        DeliveryQueue {
            tx,
            stats: stats.clone(),
        },
        DeliveryWorker { rx, stats },
    )
}

impl DeliveryQueue {
    /// Append `payload` to the queue without waiting.
    pub fn enqueue(&self, payload: DeliveryPayload) -> Result<(), QueueClosed> {
        // Count before sending so the worker's decrement can never run first.
        self.stats.pending.fetch_add(1, Ordering::SeqCst);
        if let Err(mpsc::error::SendError(payload)) = self.tx.send(payload) {
            self.stats.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(QueueClosed(payload));
        }
        Ok(())
    }

    pub fn stats(&self) -> Arc<QueueStats> {
        self.stats.clone()
    }
}

impl DeliveryWorker {
    pub fn stats(&self) -> Arc<QueueStats> {
        self.stats.clone()
    }

    /// Deliver queued payloads one at a time until every [`DeliveryQueue`] handle is dropped
    /// (returns `Ok`) or the sender fails (returns the error; nothing further is dequeued).
    pub async fn run(mut self, sender: Arc<dyn ChatSender>) -> Result<(), DeliveryError> {
        log::debug!("delivery worker started (sender: {})", sender.id());
        while let Some(payload) = self.rx.recv().await {
            self.stats.pending.fetch_sub(1, Ordering::SeqCst);
            if let Err(source) = sender
                .send(&payload.team, &payload.text, &payload.channel)
                .await
            {
                log::error!(
                    "error sending message to {}#{}: {}",
                    payload.team,
                    payload.channel,
                    source
                );
                return Err(DeliveryError::Send {
                    team: payload.team,
                    channel: payload.channel,
                    source,
                });
            }
            self.stats.delivered.fetch_add(1, Ordering::SeqCst);
            log::debug!("delivered message to {}#{}", payload.team, payload.channel);
        }
        log::info!("delivery queue closed, worker stopping");
        Ok(())
    }
}
