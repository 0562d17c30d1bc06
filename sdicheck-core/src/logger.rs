//! Explicitly injected logging sink.
//!
//! Engine components never log through an implicit global subscriber. Each one holds a
//! [`Logger`] handed to it at construction time and emits its `tracing` events inside
//! [`Logger::in_scope`]. The default logger discards everything.

use tracing::Dispatch;
use tracing::dispatcher;

/// A cloneable handle on a `tracing` dispatcher.
#[derive(Clone, Debug)]
pub struct Logger(Dispatch);

impl Logger {
    /// A logger that drops every event.
    #[must_use]
    pub fn none() -> Self {
        Self(Dispatch::none())
    }

    /// Captures the dispatcher that is the default at the time of the call,
    /// usually the global subscriber installed by the binary.
    #[must_use]
    pub fn current() -> Self {
        Self(dispatcher::get_default(Dispatch::clone))
    }

    /// Runs `f` with this logger as the active dispatcher, so that every event
    /// emitted inside `f` is routed to it.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        dispatcher::with_default(&self.0, f)
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::none()
    }
}

impl From<Dispatch> for Logger {
    fn from(dispatch: Dispatch) -> Self {
        Self(dispatch)
    }
}
