use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::clock::{visibility_horizon, Clock};
use crate::error::StorageResult;
use crate::message::Message;
use crate::metrics::Metrics;
use crate::stats::QueueStats;
use crate::storage::Storage;

/// Handle to one named queue: the ingestion and inspection side of the
/// engine. Cheap to clone; clones share the same storage.
#[derive(Clone)]
pub struct Queue {
    storage: Arc<dyn Storage>,
    name: String,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
}

impl Queue {
    /// Open `name`, creating its table if this is the first time it is used.
    pub fn open(
        storage: Arc<dyn Storage>,
        name: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> StorageResult<Self> {
        let name = name.into();
        if storage.has_queue(&name) {
            debug!(queue = %name, "opened existing queue");
        } else {
            storage.create_queue(&name)?;
            info!(queue = %name, "created queue");
        }
        Ok(Self {
            storage,
            name,
            clock,
            metrics: Metrics::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Store `body` as a new, never-claimed message and return its id.
    #[tracing::instrument(skip_all, fields(queue = %self.name, len = body.len()))]
    pub fn enqueue(&self, body: Vec<u8>) -> StorageResult<u64> {
        let mut txn = self.storage.begin(&self.name)?;
        let id = txn.next_sequence()?;
        let message = Message::new(id, body, self.clock.now_ns());
        txn.put_message(&message)?;
        txn.commit()?;

        self.metrics.record_enqueue(&self.name);
        debug!(msg_id = id, "stored message");
        Ok(id)
    }

    /// Every stored message as `(id, body)`, in ascending id order.
    pub fn list_all(&self) -> StorageResult<Vec<(u64, Vec<u8>)>> {
        Ok(self
            .storage
            .list_messages(&self.name)?
            .into_iter()
            .map(|m| (m.id, m.body))
            .collect())
    }

    /// Counts for the queue as seen with the given visibility window.
    pub fn stats(&self, visibility_timeout: Duration) -> StorageResult<QueueStats> {
        let messages = self.storage.list_messages(&self.name)?;
        let horizon = visibility_horizon(self.clock.now_ns(), visibility_timeout);
        Ok(QueueStats::collect(&messages, horizon))
    }
}
