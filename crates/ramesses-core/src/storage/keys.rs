//! Key encoding for RocksDB column families.
//!
//! Message ids are stored as 8 big-endian bytes so that lexicographic key
//! order matches numeric id order, and a forward iterator walks a queue
//! oldest id first.

/// Prefix of the per-queue message column families: `messages.{queue}`.
const MESSAGES_CF_PREFIX: &str = "messages.";

/// Prefix of the per-queue sequence counter keys in the state CF.
const SEQUENCE_KEY_PREFIX: &str = "seq:";

/// Encode a message id as its storage key.
pub fn message_key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

/// Decode a storage key back into a message id. Returns `None` for keys that
/// are not exactly 8 bytes.
pub fn parse_message_key(key: &[u8]) -> Option<u64> {
    let bytes: [u8; 8] = key.try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}

/// Column family holding the messages of one queue.
pub fn messages_cf(queue: &str) -> String {
    format!("{MESSAGES_CF_PREFIX}{queue}")
}

/// Key of a queue's sequence counter in the state CF.
pub fn sequence_key(queue: &str) -> Vec<u8> {
    format!("{SEQUENCE_KEY_PREFIX}{queue}").into_bytes()
}

/// Decode a stored sequence counter value.
pub fn parse_sequence(value: &[u8]) -> Option<u64> {
    parse_message_key(value)
}
