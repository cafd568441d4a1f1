use std::sync::Arc;

use crossbeam_channel::Receiver;
use tracing::{debug, info, warn};

use crate::error::StorageResult;
use crate::forwarder::sink::DeliverySink;
use crate::message::Batch;
use crate::metrics::Metrics;
use crate::storage::Storage;

/// Where the worker loop currently is.
#[derive(Debug, PartialEq, Eq)]
pub enum WorkerState {
    AwaitingBatch,
    Delivering(Batch),
    /// Delivered; removing the batch from the store.
    Acknowledging(Batch),
    Stopped,
}

/// Delivers batches to a sink and removes them from the queue once the sink
/// confirms. A batch that fails delivery, or whose removal fails, stays
/// claimed; the selector picks it up again after the visibility timeout.
pub struct Worker {
    storage: Arc<dyn Storage>,
    queue: String,
    sink: Box<dyn DeliverySink>,
    metrics: Metrics,
}

impl Worker {
    pub fn new(
        storage: Arc<dyn Storage>,
        queue: impl Into<String>,
        sink: Box<dyn DeliverySink>,
    ) -> Self {
        Self {
            storage,
            queue: queue.into(),
            sink,
            metrics: Metrics::new(),
        }
    }

    /// Delete every message of `batch` in one transaction. Returns how many
    /// of them were still stored; the rest were already gone.
    pub fn acknowledge(&self, batch: &Batch) -> StorageResult<usize> {
        let mut txn = self.storage.begin(&self.queue)?;
        let mut removed = 0;
        for message in batch {
            if txn.get_message(message.id)?.is_some() {
                removed += 1;
            }
            txn.delete_message(message.id)?;
        }
        txn.commit()?;
        Ok(removed)
    }

    /// Advance the state machine by one transition.
    pub fn step(
        &mut self,
        state: WorkerState,
        batches: &Receiver<Batch>,
        shutdown: &Receiver<()>,
    ) -> WorkerState {
        match state {
            WorkerState::AwaitingBatch => crossbeam_channel::select! {
                recv(batches) -> batch => match batch {
                    Ok(batch) => WorkerState::Delivering(batch),
                    Err(_) => WorkerState::Stopped,
                },
                recv(shutdown) -> _ => WorkerState::Stopped,
            },
            WorkerState::Delivering(batch) => match self.sink.deliver(&batch) {
                Ok(()) => WorkerState::Acknowledging(batch),
                Err(e) => {
                    warn!(
                        queue = %self.queue,
                        batch_len = batch.len(),
                        error = %e,
                        "delivery failed, batch left for redelivery"
                    );
                    self.metrics.record_batch_failure(&self.queue, "delivery");
                    WorkerState::AwaitingBatch
                }
            },
            WorkerState::Acknowledging(batch) => {
                match self.acknowledge(&batch) {
                    Ok(removed) => {
                        if removed < batch.len() {
                            debug!(
                                queue = %self.queue,
                                missing = batch.len() - removed,
                                "some delivered messages were already removed"
                            );
                        }
                        debug!(queue = %self.queue, ids = ?batch.ids(), "batch delivered and removed");
                        self.metrics.record_delivered(&self.queue, removed);
                    }
                    Err(e) => {
                        warn!(
                            queue = %self.queue,
                            batch_len = batch.len(),
                            error = %e,
                            "failed to remove delivered batch, it will be redelivered"
                        );
                        self.metrics.record_batch_failure(&self.queue, "acknowledge");
                    }
                }
                WorkerState::AwaitingBatch
            }
            WorkerState::Stopped => WorkerState::Stopped,
        }
    }

    /// Drive the state machine until shutdown or until the selector goes away.
    pub fn run(&mut self, batches: &Receiver<Batch>, shutdown: &Receiver<()>) {
        info!(queue = %self.queue, "worker started");
        let mut state = WorkerState::AwaitingBatch;
        while state != WorkerState::Stopped {
            state = self.step(state, batches, shutdown);
        }
        info!(queue = %self.queue, "worker stopped");
    }
}
