//! Logging setup error types.

use thiserror::Error;

/// Errors that can occur while building or installing the logger.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The log file could not be opened for appending.
    #[error("Failed to open log file '{path}': {source}")]
    LogFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A process-wide logger was already installed.
    #[error("A global logger is already installed: {0}")]
    AlreadyInstalled(#[from] tracing::dispatcher::SetGlobalDefaultError),
}
