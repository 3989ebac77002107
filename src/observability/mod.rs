pub mod logging;
pub mod telemetry;

pub use logging::{
    FilterReason, LogLevel, LogRotationPolicy, LogSegment, LoggingError, WindowEvent, WindowLog,
};
pub use telemetry::WindowMetrics;
