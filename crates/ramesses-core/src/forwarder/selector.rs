use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use tracing::{debug, info, warn};

use crate::clock::{visibility_horizon, Clock};
use crate::error::{StorageError, StorageResult};
use crate::forwarder::admission::AdmissionPolicy;
use crate::message::Batch;
use crate::metrics::Metrics;
use crate::storage::Storage;

/// Where the selector loop currently is.
#[derive(Debug, PartialEq, Eq)]
pub enum SelectorState {
    /// Resting between passes.
    Idle { wait: Duration },
    /// About to run a claim pass.
    Claiming,
    /// Holding a claimed batch until the worker takes it.
    AwaitingHandoff(Batch),
    Stopped,
}

/// Turns unclaimed or stale messages into batches.
///
/// Each pass runs in one store transaction: walk the queue from the lowest
/// id, stamp every claimable message with the current time, and commit all
/// stamps together. A stamp younger than the visibility timeout hides the
/// message from later passes; an older one means the previous attempt is
/// presumed lost and the message is claimed again.
pub struct Selector {
    storage: Arc<dyn Storage>,
    queue: String,
    clock: Arc<dyn Clock>,
    visibility_timeout: Duration,
    policy: Box<dyn AdmissionPolicy>,
    metrics: Metrics,
}

impl Selector {
    pub fn new(
        storage: Arc<dyn Storage>,
        queue: impl Into<String>,
        clock: Arc<dyn Clock>,
        visibility_timeout: Duration,
        policy: Box<dyn AdmissionPolicy>,
    ) -> Self {
        Self {
            storage,
            queue: queue.into(),
            clock,
            visibility_timeout,
            policy,
            metrics: Metrics::new(),
        }
    }

    /// Run one claim pass and return the claimed batch, in ascending id
    /// order. On error nothing from this pass is committed.
    pub fn select_batch(&self) -> StorageResult<Batch> {
        let now = self.clock.now_ns();
        let horizon = visibility_horizon(now, self.visibility_timeout);
        let mut batch = Batch::with_capacity(self.policy.max_batch_size());

        let mut txn = self.storage.begin(&self.queue)?;
        for item in txn.cursor() {
            if batch.is_full() {
                break;
            }
            let mut message = match item {
                Ok(message) => message,
                Err(StorageError::CorruptRecord { key, reason }) => {
                    warn!(queue = %self.queue, ?key, %reason, "skipping undecodable record");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if !message.is_claimable(horizon) {
                continue;
            }
            message.attempted_at = Some(now);
            if batch.push(message).is_err() {
                break;
            }
        }

        for message in &batch {
            txn.put_message(message)?;
        }
        txn.commit()?;
        Ok(batch)
    }

    /// Advance the state machine by one transition.
    pub fn step(
        &mut self,
        state: SelectorState,
        batches: &Sender<Batch>,
        shutdown: &Receiver<()>,
    ) -> SelectorState {
        match state {
            SelectorState::Idle { wait } => match shutdown.recv_timeout(wait) {
                Err(RecvTimeoutError::Timeout) => SelectorState::Claiming,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => SelectorState::Stopped,
            },
            SelectorState::Claiming => {
                if shutdown_requested(shutdown) {
                    return SelectorState::Stopped;
                }
                match self.select_batch() {
                    Ok(batch) if batch.is_empty() => self.after_pass(0),
                    Ok(batch) => {
                        debug!(
                            queue = %self.queue,
                            batch_len = batch.len(),
                            capacity = batch.capacity(),
                            "claimed batch"
                        );
                        self.metrics.record_claims(&self.queue, batch.len());
                        SelectorState::AwaitingHandoff(batch)
                    }
                    Err(e) => {
                        warn!(queue = %self.queue, error = %e, "claim pass failed, will retry");
                        self.after_pass(0)
                    }
                }
            }
            SelectorState::AwaitingHandoff(batch) => {
                let selected = batch.len();
                crossbeam_channel::select! {
                    send(batches, batch) -> sent => match sent {
                        Ok(()) => self.after_pass(selected),
                        Err(_) => {
                            warn!(queue = %self.queue, "worker hung up, stopping selector");
                            SelectorState::Stopped
                        }
                    },
                    recv(shutdown) -> _ => SelectorState::Stopped,
                }
            }
            SelectorState::Stopped => SelectorState::Stopped,
        }
    }

    /// Drive the state machine until shutdown or until the worker goes away.
    pub fn run(&mut self, batches: &Sender<Batch>, shutdown: &Receiver<()>) {
        info!(queue = %self.queue, "selector started");
        let mut state = SelectorState::Claiming;
        while state != SelectorState::Stopped {
            state = self.step(state, batches, shutdown);
        }
        info!(queue = %self.queue, "selector stopped");
    }

    fn after_pass(&self, selected: usize) -> SelectorState {
        match self.policy.backoff(selected) {
            Some(wait) => SelectorState::Idle { wait },
            None => SelectorState::Claiming,
        }
    }
}

/// Non-blocking check of the shutdown channel. Shutdown is signalled by
/// dropping its sender.
fn shutdown_requested(shutdown: &Receiver<()>) -> bool {
    !matches!(shutdown.try_recv(), Err(TryRecvError::Empty))
}
