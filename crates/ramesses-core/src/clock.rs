//! Wall-clock abstraction so visibility windows can be tested without
//! sleeping through them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of timestamps, in nanoseconds since the Unix epoch.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now_ns(&self) -> u64;
}

/// Production clock backed by `SystemTime`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ns(&self) -> u64 {
        unix_nanos(SystemTime::now())
    }
}

/// Convert a `SystemTime` to nanoseconds since the epoch, saturating at the
/// ends of the `u64` range.
pub fn unix_nanos(time: SystemTime) -> u64 {
    let since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or_default();
    u64::try_from(since_epoch.as_nanos()).unwrap_or(u64::MAX)
}

/// Convert a duration to nanoseconds, saturating.
pub fn duration_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

/// The visibility horizon for a pass at `now_ns`: claims stamped before it
/// are stale. `None` while less than one window has elapsed since the epoch.
pub fn visibility_horizon(now_ns: u64, window: Duration) -> Option<u64> {
    now_ns.checked_sub(duration_nanos(window))
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now_ns: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ns: u64) -> Self {
        Self {
            now_ns: Arc::new(AtomicU64::new(start_ns)),
        }
    }

    pub fn advance(&self, duration: Duration) {
        self.now_ns
            .fetch_add(duration_nanos(duration), Ordering::AcqRel);
    }

    pub fn set(&self, now_ns: u64) {
        self.now_ns.store(now_ns, Ordering::Release);
    }
}

impl Clock for ManualClock {
    fn now_ns(&self) -> u64 {
        self.now_ns.load(Ordering::Acquire)
    }
}
