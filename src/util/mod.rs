//! Shared utilities: time sources and tracing setup.

pub mod clock;
pub mod telemetry;

pub use clock::{millis_since_epoch, now_ms, Clock, ManualClock, SystemClock};
pub use telemetry::init_tracing;
