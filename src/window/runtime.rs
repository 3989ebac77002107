use super::clock::{MonotonicClock, SystemMonotonicClock};
use super::processor::{WindowError, WindowProcessor};
use crate::config::WindowConfig;
use crate::emit::Emitter;
use crate::event_model::AttributeValue;
use crate::observability::WindowMetrics;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Upper bound on a single idle poll in [`WindowRuntime::wait_idle`].
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(5);

struct Shared<P> {
    processor: Mutex<P>,
    wakeup: Condvar,
}

impl<P> Shared<P> {
    fn lock(&self) -> MutexGuard<'_, P> {
        self.processor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Runs a [`WindowProcessor`] with a dedicated decay driver thread.
///
/// Ingestion and decay ticks go through one mutex, so every key's
/// read-merge-clamp-schedule-emit sequence is atomic and snapshots reach the
/// emitter in wall-clock mutation order. The driver sleeps on a condition
/// variable until the earliest pending tick and is woken whenever an arrival
/// may have armed an earlier one.
pub struct WindowRuntime<K, E, C = SystemMonotonicClock>
where
    K: Eq + Hash + Clone + fmt::Display + Send + 'static,
    E: Emitter<K> + 'static,
    C: MonotonicClock + 'static,
{
    shared: Arc<Shared<WindowProcessor<K, E, C>>>,
    driver: Mutex<Option<thread::JoinHandle<()>>>,
    shutdown: AtomicBool,
}

impl<K, E> WindowRuntime<K, E, SystemMonotonicClock>
where
    K: Eq + Hash + Clone + fmt::Display + Send + 'static,
    E: Emitter<K> + 'static,
{
    /// Starts a runtime on the system monotonic clock.
    pub fn start(config: &WindowConfig, emitter: E) -> Result<Self, WindowError> {
        Self::start_with_clock(config, emitter, SystemMonotonicClock::new())
    }
}

impl<K, E, C> WindowRuntime<K, E, C>
where
    K: Eq + Hash + Clone + fmt::Display + Send + 'static,
    E: Emitter<K> + 'static,
    C: MonotonicClock + 'static,
{
    /// Starts a runtime reading time from `clock`.
    pub fn start_with_clock(
        config: &WindowConfig,
        emitter: E,
        clock: C,
    ) -> Result<Self, WindowError> {
        let processor = WindowProcessor::with_clock(config, emitter, clock)?;
        let shared = Arc::new(Shared {
            processor: Mutex::new(processor),
            wakeup: Condvar::new(),
        });
        let driver_shared = shared.clone();
        let join = thread::Builder::new()
            .name(format!("{}_decay", config.window_id))
            .spawn(move || drive(&driver_shared))
            .map_err(|err| WindowError::DriverSpawn {
                reason: err.to_string(),
            })?;
        Ok(Self {
            shared,
            driver: Mutex::new(Some(join)),
            shutdown: AtomicBool::new(false),
        })
    }

    /// Ingests one event; see [`WindowProcessor::on_event`].
    pub fn on_event(
        &self,
        key: Option<K>,
        delta: Option<i64>,
        passthrough: Vec<AttributeValue>,
    ) -> Option<i64> {
        let score = self.shared.lock().on_event(key, delta, passthrough);
        if score.is_some() {
            self.shared.wakeup.notify_one();
        }
        score
    }

    /// Runs `f` against the processor while holding the window lock.
    pub fn inspect<R>(&self, f: impl FnOnce(&WindowProcessor<K, E, C>) -> R) -> R {
        let guard = self.shared.lock();
        f(&*guard)
    }

    pub fn score(&self, key: &K) -> Option<i64> {
        self.inspect(|processor| processor.score(key))
    }

    pub fn active_tasks(&self) -> usize {
        self.inspect(WindowProcessor::active_tasks)
    }

    pub fn metrics(&self) -> WindowMetrics {
        self.inspect(WindowProcessor::metrics)
    }

    /// Blocks until no decay task is armed or `timeout` elapses; returns whether idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.active_tasks() == 0 {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep(IDLE_POLL_INTERVAL.min(deadline - now));
        }
    }

    /// Cancels all decay tasks and stops the driver; idempotent.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.lock().teardown();
        self.shared.wakeup.notify_all();
        let handle = self
            .driver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

impl<K, E, C> Drop for WindowRuntime<K, E, C>
where
    K: Eq + Hash + Clone + fmt::Display + Send + 'static,
    E: Emitter<K> + 'static,
    C: MonotonicClock + 'static,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn drive<K, E, C>(shared: &Shared<WindowProcessor<K, E, C>>)
where
    K: Eq + Hash + Clone + fmt::Display,
    E: Emitter<K>,
    C: MonotonicClock,
{
    let mut guard = shared.lock();
    loop {
        if guard.is_torn_down() {
            break;
        }
        guard.fire_due();
        let next_tick = guard.time_to_next_tick();
        guard = match next_tick {
            Some(wait) => match shared.wakeup.wait_timeout(guard, wait) {
                Ok((next, _)) => next,
                Err(poisoned) => poisoned.into_inner().0,
            },
            None => shared
                .wakeup
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner),
        };
    }
}
