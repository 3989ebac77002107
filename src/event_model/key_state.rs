use super::attribute::{AttributeValue, PriorityWidth};
use serde::Serialize;

/// Live per-group record owned by the priority store.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyState<K> {
    key: K,
    score: i64,
    passthrough: Vec<AttributeValue>,
    scheduled: bool,
}

impl<K: Clone> KeyState<K> {
    /// Creates the state for a previously unseen key.
    pub(crate) fn new(
        key: K,
        delta: i64,
        passthrough: Vec<AttributeValue>,
        width: PriorityWidth,
    ) -> Self {
        Self {
            key,
            score: width.clamp(delta),
            passthrough,
            scheduled: false,
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    /// Attributes of the most recent event seen for the key.
    pub fn passthrough(&self) -> &[AttributeValue] {
        &self.passthrough
    }

    /// Whether a decay task is currently armed for the key.
    pub fn scheduled(&self) -> bool {
        self.scheduled
    }

    /// Accumulates the delta and replaces the pass-through attributes.
    pub(crate) fn merge(
        &mut self,
        delta: i64,
        passthrough: Vec<AttributeValue>,
        width: PriorityWidth,
    ) {
        self.score = width.clamp(self.score.saturating_add(delta));
        self.passthrough = passthrough;
    }

    /// Applies one unit decay step; a floored score stays at zero.
    pub(crate) fn decrement(&mut self, width: PriorityWidth) {
        self.score = width.clamp(self.score.saturating_sub(1));
    }

    pub(crate) fn set_scheduled(&mut self, scheduled: bool) {
        self.scheduled = scheduled;
    }

    /// Copies the state into an immutable snapshot.
    pub(crate) fn snapshot(&self, cause: SnapshotCause, emitted_at_ms: u64) -> Snapshot<K> {
        Snapshot {
            key: self.key.clone(),
            score: self.score,
            passthrough: self.passthrough.clone(),
            cause,
            emitted_at_ms,
        }
    }
}

/// Reason a snapshot was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotCause {
    Arrival,
    Decay,
}

/// Immutable copy of one key's state at the moment of emission.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<K> {
    pub key: K,
    pub score: i64,
    pub passthrough: Vec<AttributeValue>,
    pub cause: SnapshotCause,
    /// Milliseconds since the window was constructed.
    pub emitted_at_ms: u64,
}

impl<K> Snapshot<K> {
    /// Output row: pass-through attributes, the key attribute, then the current priority.
    pub fn to_row(&self, key: AttributeValue, width: PriorityWidth) -> Vec<AttributeValue> {
        let mut row = Vec::with_capacity(self.passthrough.len() + 2);
        row.extend(self.passthrough.iter().cloned());
        row.push(key);
        row.push(width.to_attribute(self.score));
        row
    }
}
