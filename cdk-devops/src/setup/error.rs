//! Repository setup error types.

use super::SetupStep;
use crate::devops::DevOpsError;
use thiserror::Error;

/// Why a single setup step failed.
#[derive(Debug, Error)]
pub enum StepFailure {
    /// An Azure DevOps call failed.
    #[error(transparent)]
    Api(#[from] DevOpsError),

    /// A git command failed.
    #[error("{message}")]
    Git { message: String },

    /// A local file operation failed.
    #[error("Failed to write '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur while setting up a repository.
#[derive(Debug, Error)]
pub enum SetupError {
    /// A setup step failed. Steps after it were not run.
    #[error("Setup step '{step}' failed: {cause}")]
    Step {
        step: SetupStep,
        #[source]
        cause: StepFailure,
    },

    /// The project settings cannot produce a service URL.
    #[error("Invalid Azure DevOps URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

impl SetupError {
    /// Returns the step that failed, if any.
    #[must_use]
    pub fn step(&self) -> Option<SetupStep> {
        match self {
            Self::Step { step, .. } => Some(*step),
            Self::InvalidUrl { .. } => None,
        }
    }
}
