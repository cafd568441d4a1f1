pub mod clock;
pub mod config;
pub mod error;
pub mod forwarder;
pub mod message;
pub mod metrics;
pub mod queue;
pub mod stats;
pub mod storage;
pub mod telemetry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, ForwarderConfig, ServerConfig, StorageConfig};
pub use error::{DeliveryError, ForwarderError, StorageError, StorageResult};
pub use forwarder::{DeliverySink, Forwarder, LogSink};
pub use message::{Batch, Message};
pub use queue::Queue;
pub use stats::QueueStats;
pub use storage::{RocksDbStorage, Storage};
