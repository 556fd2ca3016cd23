//! Structured load and access events.
//!
//! Components never write log output themselves; they hand an [`Event`] to
//! an [`EventReporter`]. [`TracingReporter`] forwards events to the `tracing`
//! facade, and whatever subscriber the application installed decides where
//! they end up. [`CapturingReporter`] keeps them in memory for assertions.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use lodestar_config::{CapturingReporter, ConfigLoader, EventKind, MemorySource, Schema};
//!
//! let reporter = Arc::new(CapturingReporter::new());
//! let loader = ConfigLoader::new(Schema::default()).with_reporter(reporter.clone());
//!
//! let outcome = loader.load_source(&MemorySource::json("inline", "{}"));
//! assert!(outcome.is_success());
//! assert_eq!(
//!     reporter.kinds(),
//!     vec![EventKind::LoadAttempted, EventKind::LoadSucceeded]
//! );
//! ```

use parking_lot::Mutex;

use crate::{AccessError, LoadFailure, ReadFailure};

/// One observable outcome of a load or access.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A load started.
    LoadAttempted {
        /// Source name (usually the path).
        source: String,
    },
    /// The document repeated an object key; the last occurrence was kept.
    DuplicateKey {
        /// Source name.
        source: String,
        /// Path of the repeated key.
        path: String,
    },
    /// A configuration was produced.
    LoadSucceeded {
        /// Source name.
        source: String,
        /// Paths that received a schema default.
        defaulted: Vec<String>,
    },
    /// The load failed. `failure` is the exact value handed back to the caller.
    LoadFailed {
        /// Source name.
        source: String,
        /// Why the load failed.
        failure: LoadFailure,
    },
    /// A typed accessor was used with the wrong type.
    AccessorTypeMismatch {
        /// The error returned to the caller.
        error: AccessError,
    },
}

/// Discriminant of an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// See [`Event::LoadAttempted`].
    LoadAttempted,
    /// See [`Event::DuplicateKey`].
    DuplicateKey,
    /// See [`Event::LoadSucceeded`].
    LoadSucceeded,
    /// See [`Event::LoadFailed`].
    LoadFailed,
    /// See [`Event::AccessorTypeMismatch`].
    AccessorTypeMismatch,
}

impl Event {
    /// Returns the discriminant.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::LoadAttempted { .. } => EventKind::LoadAttempted,
            Self::DuplicateKey { .. } => EventKind::DuplicateKey,
            Self::LoadSucceeded { .. } => EventKind::LoadSucceeded,
            Self::LoadFailed { .. } => EventKind::LoadFailed,
            Self::AccessorTypeMismatch { .. } => EventKind::AccessorTypeMismatch,
        }
    }
}

/// Sink for [`Event`]s.
///
/// Implementations are shared across threads and may be called from several
/// loads at once; any serialization they need is their own business.
pub trait EventReporter: Send + Sync {
    /// Records one event.
    fn report(&self, event: &Event);
}

/// Forwards events to the `tracing` facade.
///
/// Holds no state. Attempts and successes log at info, duplicate keys at warn,
/// failures and accessor mismatches at error. Each validation error gets its
/// own record so the full set is visible in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl EventReporter for TracingReporter {
    fn report(&self, event: &Event) {
        match event {
            Event::LoadAttempted { source } => {
                tracing::info!(source = %source, "Configuration load attempted");
            }
            Event::DuplicateKey { source, path } => {
                tracing::warn!(
                    source = %source,
                    path = %path,
                    "Duplicate configuration key, last value wins"
                );
            }
            Event::LoadSucceeded { source, defaulted } => {
                tracing::info!(
                    source = %source,
                    defaulted = defaulted.len(),
                    "Configuration loaded"
                );
            }
            Event::LoadFailed {
                source,
                failure: LoadFailure::Read(failure),
            } => {
                if let ReadFailure::MalformedSyntax { line, column, .. } = failure {
                    tracing::error!(
                        source = %source,
                        failure = "read",
                        line = *line,
                        column = *column,
                        error = %failure,
                        "Configuration load failed"
                    );
                } else {
                    tracing::error!(
                        source = %source,
                        failure = "read",
                        error = %failure,
                        "Configuration load failed"
                    );
                }
            }
            Event::LoadFailed {
                source,
                failure: LoadFailure::Validation(errors),
            } => {
                tracing::error!(
                    source = %source,
                    failure = "validation",
                    error_count = errors.len(),
                    "Configuration load failed"
                );
                for err in errors {
                    tracing::error!(
                        source = %source,
                        path = %err.path,
                        violation = err.violation.as_str(),
                        expected = err.expected.as_str(),
                        actual = err.actual_name(),
                        "{}",
                        err.message
                    );
                }
            }
            Event::AccessorTypeMismatch { error } => {
                let AccessError::TypeMismatch {
                    path,
                    requested,
                    actual,
                } = error;
                tracing::error!(
                    path = %path,
                    expected = requested.as_str(),
                    actual = actual.as_str(),
                    "Configuration accessor type mismatch"
                );
            }
        }
    }
}

/// Records every event in memory.
///
/// # Example
///
/// ```
/// use lodestar_config::{CapturingReporter, Event, EventKind, EventReporter};
///
/// let reporter = CapturingReporter::new();
/// reporter.report(&Event::LoadAttempted { source: "app.json".to_string() });
/// assert_eq!(reporter.kinds(), vec![EventKind::LoadAttempted]);
/// ```
#[derive(Debug, Default)]
pub struct CapturingReporter {
    events: Mutex<Vec<Event>>,
}

impl CapturingReporter {
    /// Creates an empty reporter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all recorded events.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Returns the kinds of all recorded events, in order.
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().iter().map(Event::kind).collect()
    }

    /// Removes and returns all recorded events.
    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventReporter for CapturingReporter {
    fn report(&self, event: &Event) {
        self.events.lock().push(event.clone());
    }
}
