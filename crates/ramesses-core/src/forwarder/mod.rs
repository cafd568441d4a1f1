pub mod admission;
mod selector;
pub mod sink;
mod worker;

use std::sync::Arc;
use std::thread;

use crossbeam_channel::Sender;
use tracing::{info, warn};

use crate::config::ForwarderConfig;
use crate::error::{ForwarderError, ForwarderResult};
use crate::message::Batch;
use crate::queue::Queue;
use crate::storage::Storage;

pub use admission::{AdmissionPolicy, FixedAdmission};
pub use selector::{Selector, SelectorState};
pub use sink::{DeliverySink, LogSink};
pub use worker::{Worker, WorkerState};

/// Owns the selector and worker threads of one queue and the rendezvous
/// channel between them. The selector blocks on hand-off until the worker
/// has taken the previous batch, so at most one batch is in flight.
pub struct Forwarder {
    storage: Arc<dyn Storage>,
    /// Dropping this sender is the shutdown signal for both threads.
    shutdown_tx: Option<Sender<()>>,
    selector_thread: Option<thread::JoinHandle<()>>,
    worker_thread: Option<thread::JoinHandle<()>>,
}

impl Forwarder {
    /// Start forwarding `queue` to `sink` with a [`FixedAdmission`] policy
    /// built from `config`.
    pub fn start(
        queue: &Queue,
        config: &ForwarderConfig,
        sink: Box<dyn DeliverySink>,
    ) -> ForwarderResult<Self> {
        let selector = Selector::new(
            Arc::clone(queue.storage()),
            queue.name(),
            queue.clock(),
            config.visibility_timeout(),
            Box::new(FixedAdmission::from(config)),
        );
        let worker = Worker::new(Arc::clone(queue.storage()), queue.name(), sink);
        Self::spawn(Arc::clone(queue.storage()), selector, worker)
    }

    /// Spawn the two loops on dedicated OS threads.
    #[tracing::instrument(skip_all)]
    pub fn spawn(
        storage: Arc<dyn Storage>,
        mut selector: Selector,
        mut worker: Worker,
    ) -> ForwarderResult<Self> {
        let (batch_tx, batch_rx) = crossbeam_channel::bounded::<Batch>(0);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);

        let worker_shutdown = shutdown_rx.clone();
        let worker_thread = thread::Builder::new()
            .name("ramesses-worker".to_string())
            .spawn(move || worker.run(&batch_rx, &worker_shutdown))
            .map_err(|e| ForwarderError::Spawn(e.to_string()))?;

        let selector_thread = match thread::Builder::new()
            .name("ramesses-selector".to_string())
            .spawn(move || selector.run(&batch_tx, &shutdown_rx))
        {
            Ok(handle) => handle,
            Err(e) => {
                drop(shutdown_tx);
                if let Err(join_err) = join_thread(worker_thread, "worker") {
                    warn!(error = %join_err, "failed to join worker while aborting startup");
                }
                return Err(ForwarderError::Spawn(e.to_string()));
            }
        };

        info!("forwarder started");

        Ok(Self {
            storage,
            shutdown_tx: Some(shutdown_tx),
            selector_thread: Some(selector_thread),
            worker_thread: Some(worker_thread),
        })
    }

    /// Signal both loops to stop, wait for them, and flush the store.
    /// A batch that was in flight keeps its claims and is redelivered once
    /// they go stale.
    #[tracing::instrument(skip_all)]
    pub fn shutdown(mut self) -> ForwarderResult<()> {
        info!("initiating forwarder shutdown");
        self.stop_threads()?;

        if let Err(e) = self.storage.flush() {
            warn!(error = %e, "failed to flush WAL during shutdown");
        }

        info!("forwarder shutdown complete");
        Ok(())
    }

    fn stop_threads(&mut self) -> ForwarderResult<()> {
        self.shutdown_tx.take();

        let selector = self
            .selector_thread
            .take()
            .map_or(Ok(()), |h| join_thread(h, "selector"));
        let worker = self
            .worker_thread
            .take()
            .map_or(Ok(()), |h| join_thread(h, "worker"));
        selector.and(worker)
    }
}

/// Join a forwarder thread, turning a panic into [`ForwarderError::Panicked`].
fn join_thread(handle: thread::JoinHandle<()>, name: &'static str) -> ForwarderResult<()> {
    handle.join().map_err(|_| ForwarderError::Panicked(name))
}

impl Drop for Forwarder {
    fn drop(&mut self) {
        // If shutdown wasn't called explicitly, still stop and join the threads
        if self.selector_thread.is_some() || self.worker_thread.is_some() {
            let _ = self.stop_threads();
        }
    }
}

#[cfg(test)]
mod tests;
