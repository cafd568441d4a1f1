use crate::error::StorageResult;
use crate::message::Message;

/// Storage trait for all persistence operations. Implementations must be thread-safe.
///
/// Every mutation goes through a [`Transaction`]. Read-write transactions are
/// serialized against each other, and a transaction's writes become visible
/// all at once on commit or not at all.
pub trait Storage: Send + Sync {
    /// Create the table backing `queue` if it does not exist yet.
    fn create_queue(&self, queue: &str) -> StorageResult<()>;

    /// Whether a table exists for `queue`.
    fn has_queue(&self, queue: &str) -> bool;

    /// Begin a read-write transaction on `queue`'s table.
    fn begin(&self, queue: &str) -> StorageResult<Box<dyn Transaction + '_>>;

    /// Read-only scan of every message in `queue`, in ascending id order.
    fn list_messages(&self, queue: &str) -> StorageResult<Vec<Message>>;

    /// Flush the write-ahead log so committed writes survive a crash.
    fn flush(&self) -> StorageResult<()>;
}

/// A read-write transaction scoped to one queue's table.
///
/// Writes are staged until [`Transaction::commit`]. Dropping a transaction
/// without committing discards everything it staged.
pub trait Transaction {
    /// Next id from the queue's sequence. Strictly increasing across
    /// committed transactions; the advance is only persisted on commit.
    fn next_sequence(&mut self) -> StorageResult<u64>;

    /// Look up a message, including writes staged by this transaction.
    fn get_message(&self, id: u64) -> StorageResult<Option<Message>>;

    /// Committed messages in ascending id order. Staged writes of this
    /// transaction are not reflected.
    fn cursor(&self) -> Box<dyn Iterator<Item = StorageResult<Message>> + '_>;

    /// Insert or overwrite a message at its id-derived key.
    fn put_message(&mut self, message: &Message) -> StorageResult<()>;

    /// Remove a message by id. Removing a missing id is not an error.
    fn delete_message(&mut self, id: u64) -> StorageResult<()>;

    /// Atomically apply every staged write.
    fn commit(self: Box<Self>) -> StorageResult<()>;
}
