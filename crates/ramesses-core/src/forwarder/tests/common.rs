use super::*;
use std::sync::atomic::AtomicBool;

use crossbeam_channel::Receiver;

use crate::error::StorageResult;
use crate::storage::Transaction;

pub(super) const QUEUE: &str = "jobs";
pub(super) const START_NS: u64 = 1_000_000_000_000;
pub(super) const VISIBILITY: Duration = Duration::from_secs(60);

pub(super) fn test_setup() -> (Arc<RocksDbStorage>, Queue, ManualClock, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(RocksDbStorage::open(dir.path()).unwrap());
    let (queue, clock) = test_setup_with_storage(storage.clone());
    (storage, queue, clock, dir)
}

/// Helper: open the test queue on top of an existing storage.
pub(super) fn test_setup_with_storage(storage: Arc<dyn Storage>) -> (Queue, ManualClock) {
    let clock = ManualClock::new(START_NS);
    let queue = Queue::open(storage, QUEUE, Arc::new(clock.clone())).unwrap();
    (queue, clock)
}

pub(super) fn test_selector(queue: &Queue, max_batch_size: usize) -> Selector {
    test_selector_on(Arc::clone(queue.storage()), queue, max_batch_size)
}

/// Helper: a selector over `storage` that reads time from `queue`'s clock.
pub(super) fn test_selector_on(
    storage: Arc<dyn Storage>,
    queue: &Queue,
    max_batch_size: usize,
) -> Selector {
    Selector::new(
        storage,
        QUEUE,
        queue.clock(),
        VISIBILITY,
        Box::new(FixedAdmission::new(max_batch_size, Duration::from_millis(5))),
    )
}

pub(super) fn enqueue_n(queue: &Queue, n: usize) -> Vec<u64> {
    (0..n)
        .map(|i| queue.enqueue(format!("msg-{i}").into_bytes()).unwrap())
        .collect()
}

pub(super) fn stored(storage: &dyn Storage) -> Vec<Message> {
    storage.list_messages(QUEUE).unwrap()
}

pub(super) fn stored_ids(storage: &dyn Storage) -> Vec<u64> {
    stored(storage).into_iter().map(|m| m.id).collect()
}

/// Helper: a sink that reports the ids of every batch it accepts.
pub(super) fn recording_sink() -> (Box<dyn DeliverySink>, Receiver<Vec<u64>>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let sink = move |batch: &Batch| -> Result<(), DeliveryError> {
        let _ = tx.send(batch.ids());
        Ok(())
    };
    (Box::new(sink), rx)
}

/// Helper: a sink that rejects everything but still reports what it saw.
pub(super) fn rejecting_sink() -> (Box<dyn DeliverySink>, Receiver<Vec<u64>>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let sink = move |batch: &Batch| -> Result<(), DeliveryError> {
        let _ = tx.send(batch.ids());
        Err(DeliveryError::Unavailable("broker down".to_string()))
    };
    (Box::new(sink), rx)
}

/// Switches for [`FailingStorage`].
#[derive(Debug, Default)]
pub(super) struct Faults {
    pub put: AtomicBool,
    pub delete: AtomicBool,
    pub commit: AtomicBool,
}

impl Faults {
    fn check(flag: &AtomicBool, what: &str) -> StorageResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StorageError::RocksDb(format!("injected {what} failure")));
        }
        Ok(())
    }
}

/// Wraps a real storage and fails selected transaction operations on demand.
pub(super) struct FailingStorage {
    inner: Arc<dyn Storage>,
    pub faults: Arc<Faults>,
}

impl FailingStorage {
    pub(super) fn new(inner: Arc<dyn Storage>) -> Self {
        Self {
            inner,
            faults: Arc::new(Faults::default()),
        }
    }
}

impl Storage for FailingStorage {
    fn create_queue(&self, queue: &str) -> StorageResult<()> {
        self.inner.create_queue(queue)
    }

    fn has_queue(&self, queue: &str) -> bool {
        self.inner.has_queue(queue)
    }

    fn begin(&self, queue: &str) -> StorageResult<Box<dyn Transaction + '_>> {
        Ok(Box::new(FailingTransaction {
            inner: self.inner.begin(queue)?,
            faults: &self.faults,
        }))
    }

    fn list_messages(&self, queue: &str) -> StorageResult<Vec<Message>> {
        self.inner.list_messages(queue)
    }

    fn flush(&self) -> StorageResult<()> {
        self.inner.flush()
    }
}

struct FailingTransaction<'a> {
    inner: Box<dyn Transaction + 'a>,
    faults: &'a Faults,
}

impl Transaction for FailingTransaction<'_> {
    fn next_sequence(&mut self) -> StorageResult<u64> {
        self.inner.next_sequence()
    }

    fn get_message(&self, id: u64) -> StorageResult<Option<Message>> {
        self.inner.get_message(id)
    }

    fn cursor(&self) -> Box<dyn Iterator<Item = StorageResult<Message>> + '_> {
        self.inner.cursor()
    }

    fn put_message(&mut self, message: &Message) -> StorageResult<()> {
        Faults::check(&self.faults.put, "put")?;
        self.inner.put_message(message)
    }

    fn delete_message(&mut self, id: u64) -> StorageResult<()> {
        Faults::check(&self.faults.delete, "delete")?;
        self.inner.delete_message(id)
    }

    fn commit(self: Box<Self>) -> StorageResult<()> {
        let FailingTransaction { inner, faults } = *self;
        Faults::check(&faults.commit, "commit")?;
        inner.commit()
    }
}
