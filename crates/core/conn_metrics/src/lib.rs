//! Sliding-window event counters and the per-connection registry that aggregates them into the
//! snapshots returned by `RetrieveConnectionMetrics`.
//!
//! [SlidingWindowCounter] is the unit of measurement; [MetricsRegistry] is the concurrent map of
//! `(connection, metric, direction, address) -> SlidingWindowCounter` that every client,
//! consumer and publisher records against.

#![forbid(unsafe_code)]

mod registry;
mod sliding_window_counter;

pub use registry::MetricsRegistry;
pub use sliding_window_counter::Measurement;
pub use sliding_window_counter::SlidingWindowCounter;
pub use sliding_window_counter::WindowSpec;
pub use sliding_window_counter::DEFAULT_WINDOWS;
