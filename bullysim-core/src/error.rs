//! Common error type for simulator operations.

use thiserror::Error;

/// Errors that can occur while setting up or running a simulation.
///
/// Configuration problems that have a sensible default are *not* errors:
/// they are logged as warnings and the default is applied. Only conditions
/// the simulator cannot proceed from surface here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// An output sink could not be opened. Fatal before the first tick.
    #[error("cannot open sink '{path}': {reason}")]
    SinkOpen {
        /// Path of the sink that failed to open.
        path: String,
        /// Underlying I/O error text.
        reason: String,
    },
    /// The configuration is unusable (e.g. zero peers, empty weight table).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// An I/O error occurred while writing an output stream.
    #[error("I/O error: {0}")]
    Io(String),
}

/// A type alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;

impl From<std::io::Error> for SimError {
    fn from(err: std::io::Error) -> Self {
        SimError::Io(err.to_string())
    }
}
