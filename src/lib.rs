//! Keyed priority window for event streams.
//!
//! Each event carries a group key and a signed priority value. The first
//! event for a key starts its score, later events add to it, and the score is
//! floored at zero. Once positive, a key's score decays by one every period
//! until it reaches zero. A snapshot of the key is emitted on every arrival
//! and on every decay tick.

pub mod app;
pub mod config;
pub mod definition;
pub mod emit;
pub mod event_model;
pub mod observability;
pub mod window;

pub use config::{ConfigError, WindowConfig, DEFAULT_WINDOW_ID};
pub use definition::{
    BoundWindow, DefinitionError, ExtractedEvent, StreamSchema, WindowParameter,
    CURRENT_PRIORITY_ATTRIBUTE, PRIORITY_KEY_ATTRIBUTE,
};
pub use emit::{
    ChannelEmitter, CollectingEmitter, Emitter, QueueEmitter, TokioEmitter, EMIT_QUEUE_CAPACITY,
};
pub use event_model::{
    AttributeType, AttributeValue, GroupKey, KeyState, PriorityWidth, Snapshot, SnapshotCause,
};
pub use observability::{
    FilterReason, LogLevel, LogRotationPolicy, LogSegment, LoggingError, WindowEvent, WindowLog,
    WindowMetrics,
};
pub use window::{
    DecayScheduler, DecayTask, ManualClock, MonotonicClock, PriorityStore, SystemMonotonicClock,
    WindowError, WindowProcessor, WindowRuntime,
};
