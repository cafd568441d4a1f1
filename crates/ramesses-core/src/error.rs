/// Low-level storage errors (RocksDB, serialization).
/// Any of these aborts the enclosing transaction: nothing it staged is written.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("rocksdb error: {0}")]
    RocksDb(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored record (key or value) that cannot be decoded. Fatal to that
    /// record only; scans skip it.
    #[error("corrupt record at key {key:02x?}: {reason}")]
    CorruptRecord { key: Vec<u8>, reason: String },

    #[error("queue not found: {0}")]
    QueueNotFound(String),
}

impl From<rocksdb::Error> for StorageError {
    fn from(err: rocksdb::Error) -> Self {
        StorageError::RocksDb(err.into_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// A delivery sink's verdict on a whole batch. There is no per-message
/// outcome: a failed batch is left claimed and redelivered once its claims
/// go stale.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DeliveryError {
    #[error("batch rejected by sink: {0}")]
    Rejected(String),

    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the forwarder's thread plumbing.
#[derive(Debug, thiserror::Error)]
pub enum ForwarderError {
    #[error("failed to spawn forwarder thread: {0}")]
    Spawn(String),

    #[error("{0} thread panicked")]
    Panicked(&'static str),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
pub type ForwarderResult<T> = std::result::Result<T, ForwarderError>;
