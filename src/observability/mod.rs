//! Observability for the query client
//!
//! - Structured JSON logging to stderr with a severity threshold
//! - Typed lifecycle events
//! - Atomic counters with serializable snapshots
//!
//! Observability never affects query results and never fails a query.
//!
//! # Usage
//!
//! ```ignore
//! use kite::observability::{log_event, Event, Logger, Severity};
//!
//! Logger::set_threshold(Severity::Info);
//! log_event(Event::QuerySubmit, &[("query_id", id.as_str()), ("fragments", "4")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{ClientMetrics, MetricsSnapshot};

/// Logs `event` at its default severity.
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
