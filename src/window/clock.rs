use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source driving decay deadlines.
pub trait MonotonicClock: Send + Sync {
    /// Returns the current monotonic timestamp in nanoseconds.
    fn now_ns(&self) -> u128;
}

/// System clock implementation backed by `Instant`.
#[derive(Debug, Clone)]
pub struct SystemMonotonicClock {
    start: Instant,
}

impl Default for SystemMonotonicClock {
    fn default() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl SystemMonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MonotonicClock for SystemMonotonicClock {
    fn now_ns(&self) -> u128 {
        self.start.elapsed().as_nanos()
    }
}

/// Manually advanced clock; clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ns: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let delta = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.now_ns.fetch_add(delta, Ordering::SeqCst);
    }

    /// Current reading as a duration since the clock was created.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.now_ns.load(Ordering::SeqCst))
    }
}

impl MonotonicClock for ManualClock {
    fn now_ns(&self) -> u128 {
        u128::from(self.now_ns.load(Ordering::SeqCst))
    }
}
