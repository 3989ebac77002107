//! Event model primitives shared by the window: attribute values, group keys,
//! per-key state and emitted snapshots.

pub mod attribute;
pub mod key_state;

pub use attribute::{AttributeType, AttributeValue, GroupKey, PriorityWidth};
pub use key_state::{KeyState, Snapshot, SnapshotCause};
