use serde::{Deserialize, Serialize};

use crate::storage::keys;

/// One unit of work stored in a queue.
///
/// Timestamps are nanoseconds since the Unix epoch. `attempted_at` is the
/// claim stamp written by the selector: `None` means the message has never
/// been claimed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: u64,
    pub body: Vec<u8>,
    pub created_at: u64,
    pub attempted_at: Option<u64>,
    /// Persisted but not incremented anywhere yet.
    pub attempts: u32,
}

impl Message {
    pub fn new(id: u64, body: Vec<u8>, created_at: u64) -> Self {
        Self {
            id,
            body,
            created_at,
            attempted_at: None,
            attempts: 0,
        }
    }

    /// The storage key for this message: its id in big-endian bytes.
    pub fn key(&self) -> [u8; 8] {
        keys::message_key(self.id)
    }

    /// Whether the message may be claimed by a pass whose visibility horizon
    /// is `horizon`. Never-claimed messages are always eligible; claimed ones
    /// only once their claim is older than the horizon. A missing horizon
    /// (clock earlier than one visibility window) makes every claim fresh.
    pub fn is_claimable(&self, horizon: Option<u64>) -> bool {
        match (self.attempted_at, horizon) {
            (None, _) => true,
            (Some(claimed), Some(horizon)) => claimed < horizon,
            (Some(_), None) => false,
        }
    }
}

/// An ordered, capacity-bounded group of messages handed from the selector
/// to the worker. Lives only in memory for one dispatch cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    messages: Vec<Message>,
    capacity: usize,
}

impl Batch {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            messages: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a message. Returns it back if the batch is already full.
    pub fn push(&mut self, message: Message) -> Result<(), Message> {
        if self.is_full() {
            return Err(message);
        }
        self.messages.push(message);
        Ok(())
    }

    pub fn is_full(&self) -> bool {
        self.messages.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ids(&self) -> Vec<u64> {
        self.messages.iter().map(|m| m.id).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
