//! Keyed priority window: per-key state, the decay timer pool, the
//! single-writer processor and its threaded runtime.

pub mod clock;
pub mod processor;
pub mod runtime;
pub mod schedule;
pub mod store;

pub use clock::{ManualClock, MonotonicClock, SystemMonotonicClock};
pub use processor::{WindowError, WindowProcessor};
pub use runtime::WindowRuntime;
pub use schedule::{DecayScheduler, DecayTask};
pub use store::PriorityStore;
