use opentelemetry::metrics::{Counter, Gauge, Meter};
use opentelemetry::KeyValue;

/// OTel instruments for the queue engine. Built from the global meter
/// provider; when none is installed every instrument is a no-op.
#[derive(Clone)]
pub struct Metrics {
    pub messages_enqueued: Counter<u64>,
    pub messages_claimed: Counter<u64>,
    pub messages_delivered: Counter<u64>,
    pub batches_failed: Counter<u64>,
    pub batch_size: Gauge<u64>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let meter = opentelemetry::global::meter("ramesses");
        Self::from_meter(&meter)
    }

    pub fn from_meter(meter: &Meter) -> Self {
        Self {
            messages_enqueued: meter
                .u64_counter("ramesses.messages.enqueued")
                .with_description("Total messages enqueued")
                .build(),
            messages_claimed: meter
                .u64_counter("ramesses.messages.claimed")
                .with_description("Total claims written by selector passes, redeliveries included")
                .build(),
            messages_delivered: meter
                .u64_counter("ramesses.messages.delivered")
                .with_description("Messages delivered and removed from the store")
                .build(),
            batches_failed: meter
                .u64_counter("ramesses.batches.failed")
                .with_description("Batches left for redelivery after a sink or store failure")
                .build(),
            batch_size: meter
                .u64_gauge("ramesses.batch.size")
                .with_description("Size of the most recent selected batch")
                .build(),
        }
    }

    pub fn record_enqueue(&self, queue: &str) {
        self.messages_enqueued.add(1, &[queue_label(queue)]);
    }

    pub fn record_claims(&self, queue: &str, count: usize) {
        let labels = [queue_label(queue)];
        self.messages_claimed.add(count as u64, &labels);
        self.batch_size.record(count as u64, &labels);
    }

    pub fn record_delivered(&self, queue: &str, count: usize) {
        self.messages_delivered.add(count as u64, &[queue_label(queue)]);
    }

    pub fn record_batch_failure(&self, queue: &str, reason: &'static str) {
        self.batches_failed.add(
            1,
            &[queue_label(queue), KeyValue::new("reason", reason)],
        );
    }
}

fn queue_label(queue: &str) -> KeyValue {
    KeyValue::new("queue", queue.to_string())
}
