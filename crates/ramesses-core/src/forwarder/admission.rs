use std::time::Duration;

use crate::config::ForwarderConfig;

/// Decides how much a selector pass may claim and how long the selector
/// rests between passes.
pub trait AdmissionPolicy: Send {
    /// Most messages a single pass may claim. Must be at least 1.
    fn max_batch_size(&self) -> usize;

    /// Pause before the next pass, given how many messages the last one
    /// claimed. `None` runs the next pass immediately.
    fn backoff(&self, selected: usize) -> Option<Duration>;
}

/// Fixed batch cap and fixed poll interval: poll again right away after a
/// full batch, otherwise wait `poll_interval`.
#[derive(Debug, Clone)]
pub struct FixedAdmission {
    max_batch_size: usize,
    poll_interval: Duration,
}

impl FixedAdmission {
    pub const DEFAULT_MAX_BATCH_SIZE: usize = 20;
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

    /// A zero batch size is raised to 1, or the selector would never make progress.
    pub fn new(max_batch_size: usize, poll_interval: Duration) -> Self {
        Self {
            max_batch_size: max_batch_size.max(1),
            poll_interval,
        }
    }
}

impl Default for FixedAdmission {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_BATCH_SIZE, Self::DEFAULT_POLL_INTERVAL)
    }
}

impl From<&ForwarderConfig> for FixedAdmission {
    fn from(config: &ForwarderConfig) -> Self {
        Self::new(config.max_batch_size, config.poll_interval())
    }
}

impl AdmissionPolicy for FixedAdmission {
    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    fn backoff(&self, selected: usize) -> Option<Duration> {
        (selected < self.max_batch_size).then_some(self.poll_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_config_defaults() {
        let from_config = FixedAdmission::from(&ForwarderConfig::default());
        let default = FixedAdmission::default();
        assert_eq!(from_config.max_batch_size(), default.max_batch_size());
        assert_eq!(from_config.backoff(0), default.backoff(0));
        assert_eq!(default.max_batch_size(), 20);
    }

    #[test]
    fn full_batch_polls_immediately() {
        let policy = FixedAdmission::new(3, Duration::from_millis(100));
        assert_eq!(policy.backoff(3), None);
        assert_eq!(policy.backoff(2), Some(Duration::from_millis(100)));
        assert_eq!(policy.backoff(0), Some(Duration::from_millis(100)));
    }

    #[test]
    fn zero_batch_size_is_raised() {
        let policy = FixedAdmission::new(0, Duration::ZERO);
        assert_eq!(policy.max_batch_size(), 1);
    }
}
