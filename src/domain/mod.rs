// Domain layer - Pure telemetry computations, no I/O
pub mod error;
pub mod metrics;
pub mod narration;
pub mod reading;
pub mod statistics;
pub mod time_window;
