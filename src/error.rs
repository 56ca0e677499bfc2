//! Unified error type.

use std::fmt;

/// The error type returned by pulse's fallible operations.
///
/// An unhealthy probe result is *not* an error — it is the signal this crate
/// exists to report, and it travels as an HTTP 500, never as an `Error`.
/// This type surfaces the two setup-time failures:
///
/// - [`Error::Config`] — the address string handed over by the configuration
///   layer is malformed. Raised by [`Config::new`](crate::Config::new),
///   before any listener exists.
/// - [`Error::Bind`] — the listener could not be bound (port held by another
///   process without reuse support, permission denied). Raised by
///   [`HealthService::on_start`](crate::HealthService::on_start) and fatal to
///   startup: there is no partial-listening state.
#[derive(Debug)]
pub enum Error {
    /// Malformed configuration value, with a description of what was wrong.
    Config(String),
    /// The listener could not be bound.
    Bind(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Bind(e) => write!(f, "bind: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(_) => None,
            Self::Bind(e) => Some(e),
        }
    }
}
