//! Pull request comment error types.

use crate::devops::DevOpsError;
use crate::templates::TemplateError;
use thiserror::Error;

/// Errors reading the pipeline's pull request context from the environment.
#[derive(Debug, Error)]
pub enum ContextError {
    /// A required pipeline variable is unset or empty.
    #[error("Missing pipeline variable {name}")]
    MissingVariable { name: &'static str },

    /// A pipeline variable holds an unusable value.
    #[error("Invalid value for {name}: {message}")]
    InvalidVariable { name: &'static str, message: String },
}

/// Errors that can occur while posting pull request comments.
#[derive(Debug, Error)]
pub enum CommentError {
    /// The token was rejected or lacks permission.
    #[error("Authentication failed: {source}")]
    Auth {
        #[source]
        source: DevOpsError,
    },

    /// The pull request does not exist.
    #[error("Pull request {pr_id} not found")]
    PrNotFound { pr_id: u64 },

    /// Any other API failure.
    #[error("Azure DevOps API error: {0}")]
    Api(#[source] DevOpsError),

    /// A reply was requested without a thread to reply to.
    #[error("Cannot reply on pull request {pr_id}: no thread id given")]
    MissingThread { pr_id: u64 },

    /// A file to publish does not exist.
    #[error("File does not exist: {path}")]
    MissingFile { path: String },

    /// Failed to read a file.
    #[error("Failed to read file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a validation report.
    #[error("Failed to parse CSV report '{path}': {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// Comment body rendering failed.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// The pipeline context is incomplete.
    #[error(transparent)]
    Context(#[from] ContextError),
}

impl CommentError {
    /// Classifies an API error raised while talking to pull request `pr_id`.
    pub(crate) fn from_api(error: DevOpsError, pr_id: u64) -> Self {
        if error.is_auth() {
            return Self::Auth { source: error };
        }
        match error {
            DevOpsError::NotFound { .. } => Self::PrNotFound { pr_id },
            other => Self::Api(other),
        }
    }

    /// Returns true for failures that will repeat for every comment of a run.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Auth { .. } | Self::PrNotFound { .. } | Self::Context(_)
        )
    }
}
