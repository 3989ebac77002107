//! Structured lifecycle log for one priority window.
//!
//! Every entry is a single JSON object describing one window transition:
//! start, decay armed, cancelled or finished, filtered input, discarded input
//! and teardown. Entries are buffered in memory in size-bounded segments and
//! the oldest segment is dropped once `max_files` segments are held.

use crate::event_model::PriorityWidth;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

/// Minimum severity recorded by a [`WindowLog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
}

/// Segment budget; `max_files` counts the active segment too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogRotationPolicy {
    pub max_bytes: usize,
    pub max_files: usize,
}

impl Default for LogRotationPolicy {
    fn default() -> Self {
        Self {
            max_bytes: 1 << 20,
            max_files: 4,
        }
    }
}

/// Why an arrival never reached the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterReason {
    MissingKey,
    MissingPriority,
}

/// A window transition worth recording.
#[derive(Debug)]
pub enum WindowEvent<'a, K> {
    Started { period_ms: u64, width: PriorityWidth },
    DecayArmed(&'a K),
    DecayCancelled(&'a K),
    DecayFinished(&'a K),
    Filtered { key: Option<&'a K>, reason: FilterReason },
    Discarded,
    TornDown { cancelled: usize },
}

impl<K: fmt::Display> WindowEvent<'_, K> {
    pub fn level(&self) -> LogLevel {
        match self {
            WindowEvent::Started { .. } | WindowEvent::TornDown { .. } => LogLevel::Info,
            WindowEvent::Discarded => LogLevel::Warn,
            _ => LogLevel::Debug,
        }
    }

    /// Stable tag written as the `event` field.
    pub fn kind(&self) -> &'static str {
        match self {
            WindowEvent::Started { .. } => "started",
            WindowEvent::DecayArmed(_) => "decay_armed",
            WindowEvent::DecayCancelled(_) => "decay_cancelled",
            WindowEvent::DecayFinished(_) => "decay_finished",
            WindowEvent::Filtered { .. } => "filtered",
            WindowEvent::Discarded => "discarded",
            WindowEvent::TornDown { .. } => "torn_down",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            WindowEvent::Started { .. } => "priority window started",
            WindowEvent::DecayArmed(_) => "decay armed",
            WindowEvent::DecayCancelled(_) => "decay cancelled at floor",
            WindowEvent::DecayFinished(_) => "decay finished at floor",
            WindowEvent::Filtered {
                reason: FilterReason::MissingKey,
                ..
            } => "event filtered: missing group key",
            WindowEvent::Filtered {
                reason: FilterReason::MissingPriority,
                ..
            } => "event filtered: missing priority value",
            WindowEvent::Discarded => "event discarded after teardown",
            WindowEvent::TornDown { .. } => "priority window torn down",
        }
    }

    fn key(&self) -> Option<String> {
        match self {
            WindowEvent::DecayArmed(key)
            | WindowEvent::DecayCancelled(key)
            | WindowEvent::DecayFinished(key) => Some(key.to_string()),
            WindowEvent::Filtered { key, .. } => key.map(ToString::to_string),
            _ => None,
        }
    }
}

/// Lines written into one segment.
#[derive(Debug, Default, Clone)]
pub struct LogSegment {
    lines: Vec<String>,
    bytes: usize,
}

impl LogSegment {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

/// JSON-line log bound to a single window.
#[derive(Debug, Clone)]
pub struct WindowLog {
    window_id: String,
    threshold: LogLevel,
    policy: LogRotationPolicy,
    segments: VecDeque<LogSegment>,
    segments_dropped: u64,
}

impl WindowLog {
    pub fn new(window_id: impl Into<String>, threshold: LogLevel, policy: LogRotationPolicy) -> Self {
        Self {
            window_id: window_id.into(),
            threshold,
            policy,
            segments: VecDeque::new(),
            segments_dropped: 0,
        }
    }

    pub fn window_id(&self) -> &str {
        &self.window_id
    }

    pub fn threshold(&self) -> LogLevel {
        self.threshold
    }

    /// Records `event` at `ts_ms`; returns whether it passed the threshold.
    pub fn record<K: fmt::Display>(
        &mut self,
        ts_ms: u64,
        event: &WindowEvent<'_, K>,
    ) -> Result<bool, LoggingError> {
        let level = event.level();
        if level < self.threshold {
            return Ok(false);
        }
        let mut entry = LogRecord {
            ts: ts_ms,
            level,
            window: &self.window_id,
            event: event.kind(),
            key: event.key(),
            period_ms: None,
            width: None,
            reason: None,
            cancelled: None,
            message: event.message(),
        };
        match *event {
            WindowEvent::Started { period_ms, width } => {
                entry.period_ms = Some(period_ms);
                entry.width = Some(width);
            }
            WindowEvent::Filtered { reason, .. } => entry.reason = Some(reason),
            WindowEvent::TornDown { cancelled } => entry.cancelled = Some(cancelled),
            _ => {}
        }
        let line = serde_json::to_string(&entry)?;
        self.append(line);
        Ok(true)
    }

    /// Retained segments, oldest first; the last one is active.
    pub fn segments(&self) -> impl Iterator<Item = &LogSegment> {
        self.segments.iter()
    }

    /// Retained lines, oldest first.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.segments
            .iter()
            .flat_map(|segment| segment.lines.iter().map(String::as_str))
    }

    pub fn segments_dropped(&self) -> u64 {
        self.segments_dropped
    }

    fn append(&mut self, line: String) {
        let len = line.len();
        let open_segment = match self.segments.back() {
            Some(active) => !active.lines.is_empty() && active.bytes + len > self.policy.max_bytes,
            None => true,
        };
        if open_segment {
            self.segments.push_back(LogSegment::default());
            while self.segments.len() > self.policy.max_files.max(1) {
                self.segments.pop_front();
                self.segments_dropped += 1;
            }
        }
        if let Some(active) = self.segments.back_mut() {
            active.bytes += len;
            active.lines.push(line);
        }
    }
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to serialize window log entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct LogRecord<'a> {
    ts: u64,
    level: LogLevel,
    window: &'a str,
    event: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    period_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<PriorityWidth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<FilterReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cancelled: Option<usize>,
    message: &'static str,
}
