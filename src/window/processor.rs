use super::clock::{MonotonicClock, SystemMonotonicClock};
use super::schedule::DecayScheduler;
use super::store::PriorityStore;
use crate::config::{ConfigError, WindowConfig};
use crate::emit::Emitter;
use crate::event_model::{AttributeValue, KeyState, PriorityWidth, SnapshotCause};
use crate::observability::{FilterReason, WindowEvent, WindowLog, WindowMetrics};
use std::fmt;
use std::hash::Hash;
use std::time::Duration;
use thiserror::Error;

const NANOS_PER_MS: u128 = 1_000_000;

/// Errors raised while constructing a window.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("decay period must be positive, got {period_ms} ms")]
    InvalidPeriod { period_ms: u64 },
    #[error("invalid window config: {reason}")]
    InvalidConfig { reason: String },
    #[error("failed to spawn decay driver: {reason}")]
    DriverSpawn { reason: String },
}

/// Single-writer priority window: merges arrivals, drives unit decay, emits snapshots.
///
/// Every mutation of a key runs to completion (merge or decrement, clamp,
/// arm or cancel, emit) before the next one starts, so callers sharing a
/// processor across threads only need to wrap it in one lock. See
/// [`crate::window::WindowRuntime`].
pub struct WindowProcessor<K, E, C = SystemMonotonicClock> {
    window_id: String,
    clock: C,
    store: PriorityStore<K>,
    scheduler: DecayScheduler<K>,
    emitter: E,
    event_log: WindowLog,
    metrics: WindowMetrics,
    torn_down: bool,
}

impl<K, E> WindowProcessor<K, E, SystemMonotonicClock>
where
    K: Eq + Hash + Clone + fmt::Display,
    E: Emitter<K>,
{
    /// Builds a window driven by the system monotonic clock.
    pub fn new(config: &WindowConfig, emitter: E) -> Result<Self, WindowError> {
        Self::with_clock(config, emitter, SystemMonotonicClock::new())
    }
}

impl<K, E, C> WindowProcessor<K, E, C>
where
    K: Eq + Hash + Clone + fmt::Display,
    E: Emitter<K>,
    C: MonotonicClock,
{
    /// Builds a window reading time from `clock`; fails on a config that does not validate.
    pub fn with_clock(config: &WindowConfig, emitter: E, clock: C) -> Result<Self, WindowError> {
        config.validate().map_err(|err| match err {
            ConfigError::InvalidPeriod { period_ms } => WindowError::InvalidPeriod { period_ms },
            other => WindowError::InvalidConfig {
                reason: other.to_string(),
            },
        })?;
        let event_log = WindowLog::new(
            config.window_id.clone(),
            config.log_level,
            config.log_rotation,
        );
        let mut processor = Self {
            window_id: config.window_id.clone(),
            clock,
            store: PriorityStore::new(config.width),
            scheduler: DecayScheduler::new(config.period()),
            emitter,
            event_log,
            metrics: WindowMetrics::default(),
            torn_down: false,
        };
        processor.record(WindowEvent::Started {
            period_ms: config.period_ms,
            width: config.width,
        });
        Ok(processor)
    }

    /// Ingests one event and returns the emitted score.
    ///
    /// A missing key or priority value filters the event: nothing is emitted
    /// and no state changes. Otherwise the key's score is created or merged,
    /// a snapshot is emitted before returning, and the decay task is armed
    /// while the score is positive or cancelled once it reaches zero.
    pub fn on_event(
        &mut self,
        key: Option<K>,
        delta: Option<i64>,
        passthrough: Vec<AttributeValue>,
    ) -> Option<i64> {
        if self.torn_down {
            self.record(WindowEvent::Discarded);
            return None;
        }
        let (key, delta) = match (key, delta) {
            (Some(key), Some(delta)) => (key, delta),
            (key, _) => {
                self.metrics.events_filtered_total += 1;
                let reason = if key.is_none() {
                    FilterReason::MissingKey
                } else {
                    FilterReason::MissingPriority
                };
                self.record(WindowEvent::Filtered {
                    key: key.as_ref(),
                    reason,
                });
                return None;
            }
        };
        let now_ns = self.clock.now_ns();
        self.metrics.events_ingested_total += 1;
        let score = self.store.merge(key.clone(), delta, passthrough).score();
        if score > 0 {
            if self.scheduler.arm(&key, now_ns) {
                self.metrics.decay_tasks_armed_total += 1;
                self.record(WindowEvent::DecayArmed(&key));
            }
        } else if self.scheduler.cancel(&key) {
            self.metrics.decay_tasks_cancelled_total += 1;
            self.record(WindowEvent::DecayCancelled(&key));
        }
        let armed = self.scheduler.is_armed(&key);
        if let Some(state) = self.store.get_mut(&key) {
            state.set_scheduled(armed);
            let snapshot = state.snapshot(SnapshotCause::Arrival, millis(now_ns));
            self.metrics.arrival_snapshots_total += 1;
            self.emitter.emit(snapshot);
        }
        Some(score)
    }

    /// Fires every decay tick due at the current clock reading; returns how many fired.
    pub fn fire_due(&mut self) -> usize {
        if self.torn_down {
            return 0;
        }
        let now_ns = self.clock.now_ns();
        let mut fired = 0;
        while let Some(key) = self.scheduler.pop_due(now_ns) {
            fired += 1;
            let Some(state) = self.store.decay(&key) else {
                self.scheduler.cancel(&key);
                continue;
            };
            let score = state.score();
            if score == 0 {
                state.set_scheduled(false);
            }
            let snapshot = state.snapshot(SnapshotCause::Decay, millis(now_ns));
            self.metrics.decay_snapshots_total += 1;
            self.emitter.emit(snapshot);
            if score == 0 {
                self.scheduler.cancel(&key);
                self.metrics.decay_tasks_completed_total += 1;
                self.record(WindowEvent::DecayFinished(&key));
            }
        }
        fired
    }

    /// Cancels every decay task; no tick or emission happens afterwards.
    pub fn teardown(&mut self) -> usize {
        if self.torn_down {
            return 0;
        }
        let cancelled = self.scheduler.cancel_all();
        self.metrics.decay_tasks_cancelled_total += cancelled as u64;
        for key in self.store.keys().cloned().collect::<Vec<_>>() {
            if let Some(state) = self.store.get_mut(&key) {
                state.set_scheduled(false);
            }
        }
        self.torn_down = true;
        self.record(WindowEvent::TornDown { cancelled });
        cancelled
    }

    /// Time until the earliest pending tick; `None` when nothing is armed.
    pub fn time_to_next_tick(&self) -> Option<Duration> {
        let deadline = self.scheduler.next_deadline_ns()?;
        let remaining = deadline.saturating_sub(self.clock.now_ns());
        Some(Duration::from_nanos(
            u64::try_from(remaining).unwrap_or(u64::MAX),
        ))
    }

    pub fn score(&self, key: &K) -> Option<i64> {
        self.store.get(key).map(KeyState::score)
    }

    pub fn key_state(&self, key: &K) -> Option<&KeyState<K>> {
        self.store.get(key)
    }

    pub fn is_armed(&self, key: &K) -> bool {
        self.scheduler.is_armed(key)
    }

    pub fn active_tasks(&self) -> usize {
        self.scheduler.active()
    }

    pub fn tracked_keys(&self) -> usize {
        self.store.len()
    }

    pub fn width(&self) -> PriorityWidth {
        self.store.width()
    }

    pub fn period(&self) -> Duration {
        self.scheduler.period()
    }

    pub fn window_id(&self) -> &str {
        &self.window_id
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn emitter(&self) -> &E {
        &self.emitter
    }

    pub fn event_log(&self) -> &WindowLog {
        &self.event_log
    }

    pub fn metrics(&self) -> WindowMetrics {
        let mut metrics = self.metrics.clone();
        metrics.active_decay_tasks = self.scheduler.active() as u64;
        metrics.tracked_keys = self.store.len() as u64;
        metrics
    }

    fn record(&mut self, event: WindowEvent<'_, K>) {
        let ts = millis(self.clock.now_ns());
        // Logging is best effort and never affects emission.
        let _ = self.event_log.record(ts, &event);
    }
}

impl<K, E, C> fmt::Debug for WindowProcessor<K, E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowProcessor")
            .field("window_id", &self.window_id)
            .field("torn_down", &self.torn_down)
            .field("metrics", &self.metrics)
            .finish()
    }
}

fn millis(nanos: u128) -> u64 {
    u64::try_from(nanos / NANOS_PER_MS).unwrap_or(u64::MAX)
}
