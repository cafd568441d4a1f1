use tracing::info;

use crate::error::DeliveryError;
use crate::message::Batch;

/// Downstream destination for batches. A batch either succeeds as a whole
/// and is removed from the queue, or fails as a whole and is left claimed
/// for redelivery.
pub trait DeliverySink: Send {
    fn deliver(&mut self, batch: &Batch) -> Result<(), DeliveryError>;
}

impl<F> DeliverySink for F
where
    F: FnMut(&Batch) -> Result<(), DeliveryError> + Send,
{
    fn deliver(&mut self, batch: &Batch) -> Result<(), DeliveryError> {
        self(batch)
    }
}

/// Sink that records each message in the log and always succeeds. Stands in
/// for a real broker producer.
#[derive(Debug, Default)]
pub struct LogSink;

impl DeliverySink for LogSink {
    fn deliver(&mut self, batch: &Batch) -> Result<(), DeliveryError> {
        info!(batch_len = batch.len(), "delivering batch");
        for message in batch {
            info!(
                msg_id = message.id,
                body = %String::from_utf8_lossy(&message.body),
                "delivered message"
            );
        }
        Ok(())
    }
}
