use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};
use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};
use crate::message::Message;
use crate::storage::keys;
use crate::storage::traits::{Storage, Transaction};

/// Per-queue sequence counters.
const CF_STATE: &str = "state";

const CF_DEFAULT: &str = "default";

type DB = DBWithThreadMode<MultiThreaded>;

/// RocksDB-backed storage implementation.
///
/// Each queue lives in its own column family. Read-write transactions take
/// the `writer` lock for their whole lifetime (single writer) and commit
/// through one `WriteBatch`, so concurrent readers, whose iterators work on
/// an implicit snapshot, never see half of a transaction.
pub struct RocksDbStorage {
    db: DB,
    writer: Mutex<()>,
}

impl RocksDbStorage {
    /// Open or create a RocksDB database at the given path, reopening every
    /// queue column family created by an earlier run.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let mut cf_names = if path.join("CURRENT").exists() {
            DB::list_cf(&db_opts, path)?
        } else {
            Vec::new()
        };
        cf_names.retain(|name| name != CF_DEFAULT);
        if !cf_names.iter().any(|name| name == CF_STATE) {
            cf_names.push(CF_STATE.to_string());
        }

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = cf_names
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;
        debug!(path = %path.display(), column_families = cf_names.len(), "storage opened");
        Ok(Self {
            db,
            writer: Mutex::new(()),
        })
    }

    fn messages_cf(&self, queue: &str) -> StorageResult<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(&keys::messages_cf(queue))
            .ok_or_else(|| StorageError::QueueNotFound(queue.to_string()))
    }

    fn state_cf(&self) -> StorageResult<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(CF_STATE)
            .ok_or_else(|| StorageError::RocksDb(format!("column family not found: {CF_STATE}")))
    }

    /// Write raw bytes under `key`, bypassing encoding. Lets tests plant
    /// records that do not decode.
    #[cfg(test)]
    pub(crate) fn put_raw(&self, queue: &str, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let cf = self.messages_cf(queue)?;
        self.db.put_cf(&cf, key, value)?;
        Ok(())
    }

    fn lock_writer(&self) -> MutexGuard<'_, ()> {
        // The guarded data is `()`, so a poisoned lock carries no broken state.
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Storage for RocksDbStorage {
    fn create_queue(&self, queue: &str) -> StorageResult<()> {
        let _writer = self.lock_writer();
        let cf_name = keys::messages_cf(queue);
        if self.db.cf_handle(&cf_name).is_none() {
            self.db.create_cf(&cf_name, &Options::default())?;
            debug!(%queue, "created queue column family");
        }
        Ok(())
    }

    fn has_queue(&self, queue: &str) -> bool {
        self.db.cf_handle(&keys::messages_cf(queue)).is_some()
    }

    fn begin(&self, queue: &str) -> StorageResult<Box<dyn Transaction + '_>> {
        let writer = self.lock_writer();
        let messages = self.messages_cf(queue)?;
        let state = self.state_cf()?;
        Ok(Box::new(RocksDbTransaction {
            db: &self.db,
            _writer: writer,
            queue: queue.to_string(),
            messages,
            state,
            batch: WriteBatch::default(),
            staged: BTreeMap::new(),
            sequence: None,
        }))
    }

    fn list_messages(&self, queue: &str) -> StorageResult<Vec<Message>> {
        let cf = self.messages_cf(queue)?;
        let mut results = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (key, value) = item?;
            match decode_message(&key, &value) {
                Ok(message) => results.push(message),
                Err(e) => warn!(%queue, error = %e, "skipping undecodable record"),
            }
        }
        Ok(results)
    }

    fn flush(&self) -> StorageResult<()> {
        self.db.flush_wal(true)?;
        Ok(())
    }
}

/// Decode a stored record, checking that the key and the record agree on the id.
fn decode_message(key: &[u8], value: &[u8]) -> StorageResult<Message> {
    let corrupt = |reason: String| StorageError::CorruptRecord {
        key: key.to_vec(),
        reason,
    };
    let id = keys::parse_message_key(key)
        .ok_or_else(|| corrupt("key is not an 8-byte message id".to_string()))?;
    let message: Message = serde_json::from_slice(value).map_err(|e| corrupt(e.to_string()))?;
    if message.id != id {
        return Err(corrupt(format!("record id {} does not match key", message.id)));
    }
    Ok(message)
}

struct RocksDbTransaction<'a> {
    db: &'a DB,
    _writer: MutexGuard<'a, ()>,
    queue: String,
    messages: Arc<BoundColumnFamily<'a>>,
    state: Arc<BoundColumnFamily<'a>>,
    batch: WriteBatch,
    /// Writes staged in `batch`, by id; `None` marks a delete.
    staged: BTreeMap<u64, Option<Message>>,
    /// Last id handed out by this transaction.
    sequence: Option<u64>,
}

impl Transaction for RocksDbTransaction<'_> {
    fn next_sequence(&mut self) -> StorageResult<u64> {
        let current = match self.sequence {
            Some(seq) => seq,
            None => {
                let key = keys::sequence_key(&self.queue);
                match self.db.get_cf(&self.state, &key)? {
                    Some(value) => keys::parse_sequence(&value).ok_or_else(|| {
                        StorageError::CorruptRecord {
                            key,
                            reason: "sequence counter is not a u64".to_string(),
                        }
                    })?,
                    None => 0,
                }
            }
        };
        let next = current
            .checked_add(1)
            .ok_or_else(|| StorageError::CorruptRecord {
                key: keys::sequence_key(&self.queue),
                reason: "sequence counter exhausted".to_string(),
            })?;
        self.batch
            .put_cf(&self.state, keys::sequence_key(&self.queue), next.to_be_bytes());
        self.sequence = Some(next);
        Ok(next)
    }

    fn get_message(&self, id: u64) -> StorageResult<Option<Message>> {
        if let Some(staged) = self.staged.get(&id) {
            return Ok(staged.clone());
        }
        let key = keys::message_key(id);
        match self.db.get_cf(&self.messages, key)? {
            Some(value) => decode_message(&key, &value).map(Some),
            None => Ok(None),
        }
    }

    fn cursor(&self) -> Box<dyn Iterator<Item = StorageResult<Message>> + '_> {
        let iter = self.db.iterator_cf(&self.messages, IteratorMode::Start);
        Box::new(iter.map(|item| {
            let (key, value) = item?;
            decode_message(&key, &value)
        }))
    }

    fn put_message(&mut self, message: &Message) -> StorageResult<()> {
        let value = serde_json::to_vec(message)?;
        self.batch.put_cf(&self.messages, message.key(), value);
        self.staged.insert(message.id, Some(message.clone()));
        Ok(())
    }

    fn delete_message(&mut self, id: u64) -> StorageResult<()> {
        self.batch.delete_cf(&self.messages, keys::message_key(id));
        self.staged.insert(id, None);
        Ok(())
    }

    fn commit(self: Box<Self>) -> StorageResult<()> {
        let txn = *self;
        // `txn._writer` is released only after the batch is applied.
        txn.db.write(txn.batch)?;
        Ok(())
    }
}
