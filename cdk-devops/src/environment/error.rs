//! Environment loading error types.

use thiserror::Error;

/// Errors that can occur while loading an environment configuration.
#[derive(Debug, Error)]
pub enum EnvironmentError {
    /// No configuration file exists for the requested environment.
    #[error("No configuration for environment '{environment}' at '{path}'")]
    NotFound { environment: String, path: String },

    /// The configuration file is not valid JSON or lacks a required field.
    #[error("Failed to parse configuration '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Failed to read a file or directory.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
