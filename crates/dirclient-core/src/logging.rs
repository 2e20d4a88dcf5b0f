//! Logging interface consumed by directory connections.
//!
//! Connections receive a logger explicitly when they are dialed; there is no process-wide
//! logger. [`TracingLogger`] is the default and forwards to `tracing`.

use std::fmt;

/// Sink for connection diagnostics.
pub trait Logger: Send + Sync {
    /// Records a debug-level message.
    fn debug(&self, message: &str);

    /// Records an error-level message.
    fn error(&self, message: &str);
}

/// Logger that forwards to the `tracing` facade under the `dirclient` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(target: "dirclient", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "dirclient", "{message}");
    }
}

/// Logger that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn debug(&self, _message: &str) {}

    fn error(&self, _message: &str) {}
}

impl fmt::Debug for dyn Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Logger")
    }
}
