use serde::Serialize;

use crate::message::Message;

/// Point-in-time counts for a single queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Messages stored, claimed or not.
    pub depth: u64,
    /// Messages whose claim is still inside the visibility window.
    pub in_flight: u64,
    /// Messages no selector pass has claimed yet.
    pub never_attempted: u64,
    /// Lowest stored id, i.e. the next message in FIFO order.
    pub oldest_id: Option<u64>,
}

impl QueueStats {
    /// Tally `messages` against a visibility horizon (see [`Message::is_claimable`]).
    pub fn collect<'a>(messages: impl IntoIterator<Item = &'a Message>, horizon: Option<u64>) -> Self {
        let mut stats = Self::default();
        for message in messages {
            stats.depth += 1;
            if message.attempted_at.is_none() {
                stats.never_attempted += 1;
            } else if !message.is_claimable(horizon) {
                stats.in_flight += 1;
            }
            stats.oldest_id = Some(stats.oldest_id.map_or(message.id, |id| id.min(message.id)));
        }
        stats
    }
}
