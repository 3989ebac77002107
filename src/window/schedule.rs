use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::time::Duration;

/// Recurring decay timer registered for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecayTask {
    /// Unique arm sequence; a re-armed key never reuses an epoch.
    pub epoch: u64,
    /// Monotonic instant (ns) at which the next tick is due.
    pub next_due_ns: u128,
}

/// Pool of per-key recurring timers sharing one fixed period.
///
/// Each key's schedule is anchored to the instant it was armed: ticks fall at
/// `armed_at + n * period` and are never re-phased while the task stays
/// armed. Arming an armed key and cancelling an idle key are both no-ops.
#[derive(Debug, Clone)]
pub struct DecayScheduler<K> {
    period_ns: u128,
    next_epoch: u64,
    tasks: HashMap<K, DecayTask>,
    deadlines: BTreeMap<(u128, u64), K>,
}

impl<K> DecayScheduler<K>
where
    K: Eq + Hash + Clone,
{
    /// Builds a scheduler; callers guarantee `period` is non-zero.
    pub(crate) fn new(period: Duration) -> Self {
        Self {
            period_ns: period.as_nanos(),
            next_epoch: 0,
            tasks: HashMap::new(),
            deadlines: BTreeMap::new(),
        }
    }

    pub fn period(&self) -> Duration {
        let nanos = u64::try_from(self.period_ns).unwrap_or(u64::MAX);
        Duration::from_nanos(nanos)
    }

    /// Arms a recurring task for `key` with its first tick one period after `now_ns`.
    ///
    /// Returns `false` when the key already has an active task.
    pub fn arm(&mut self, key: &K, now_ns: u128) -> bool {
        if self.tasks.contains_key(key) {
            return false;
        }
        self.next_epoch += 1;
        let task = DecayTask {
            epoch: self.next_epoch,
            next_due_ns: now_ns.saturating_add(self.period_ns),
        };
        self.deadlines
            .insert((task.next_due_ns, task.epoch), key.clone());
        self.tasks.insert(key.clone(), task);
        true
    }

    /// Cancels the key's task, returning `false` when none was active.
    pub fn cancel(&mut self, key: &K) -> bool {
        match self.tasks.remove(key) {
            Some(task) => {
                self.deadlines.remove(&(task.next_due_ns, task.epoch));
                true
            }
            None => false,
        }
    }

    /// Cancels every task and returns how many were active.
    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.tasks.len();
        self.tasks.clear();
        self.deadlines.clear();
        cancelled
    }

    pub fn is_armed(&self, key: &K) -> bool {
        self.tasks.contains_key(key)
    }

    pub fn task(&self, key: &K) -> Option<&DecayTask> {
        self.tasks.get(key)
    }

    /// Number of keys with an active task.
    pub fn active(&self) -> usize {
        self.tasks.len()
    }

    /// Earliest pending tick across all keys.
    pub fn next_deadline_ns(&self) -> Option<u128> {
        self.deadlines.keys().next().map(|(due, _)| *due)
    }

    /// Pops the earliest tick due at or before `now_ns` and schedules that key's
    /// following tick one period later.
    pub fn pop_due(&mut self, now_ns: u128) -> Option<K> {
        let (&(due, epoch), _) = self.deadlines.iter().next()?;
        if due > now_ns {
            return None;
        }
        let key = self.deadlines.remove(&(due, epoch))?;
        let next_due_ns = due.saturating_add(self.period_ns);
        if let Some(task) = self.tasks.get_mut(&key) {
            task.next_due_ns = next_due_ns;
            self.deadlines.insert((next_due_ns, epoch), key.clone());
        }
        Some(key)
    }
}
