use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration, deserializable from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub forwarder: ForwarderConfig,
}

/// HTTP ingestion listener.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
}

/// Where the queue lives on disk and which queue the process serves.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
    pub queue: String,
}

/// Selector and worker tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ForwarderConfig {
    /// How long a claim hides a message from later passes. Once it elapses
    /// without the message being deleted, the message is selected again.
    pub visibility_timeout_ms: u64,
    /// Upper bound on messages per batch.
    pub max_batch_size: usize,
    /// Pause after a pass that did not fill a batch.
    pub poll_interval_ms: u64,
}

impl ForwarderConfig {
    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_millis(self.visibility_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:5050".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "jobs.db".to_string(),
            queue: "messages".to_string(),
        }
    }
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            visibility_timeout_ms: 60_000,
            max_batch_size: 20,
            poll_interval_ms: 250,
        }
    }
}
