//! Observability subsystem
//!
//! - Structured logging (JSON lines)
//! - Typed lifecycle events
//! - Scope-based begin/complete tracing
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on execution
//! 3. No background threads
//! 4. Deterministic output
//!
//! Loggers are passed to components explicitly. There is no process-wide
//! logger; `Logger::default()` is a stdout handle for convenience only.
//!
//! ```ignore
//! let logger = Logger::default();
//! log_event_with_fields(&logger, Event::FetchComplete, &[("records", "250")]);
//!
//! let scope = ObservationScope::new(&logger, "SNAPSHOT_COMMIT");
//! // ... do work ...
//! scope.complete();
//! ```

mod events;
mod logger;
mod scope;

pub use events::Event;
pub use logger::{LogCapture, Logger, Severity};
pub use scope::{ObservationScope, Timer};

/// Log a lifecycle event
pub fn log_event(logger: &Logger, event: Event) {
    log_event_with_fields(logger, event, &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(logger: &Logger, event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_abort() {
        Severity::Error
    } else {
        Severity::Info
    };
    logger.log(severity, event.as_str(), fields);
}
