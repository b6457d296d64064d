//! Azure DevOps client error types.

use thiserror::Error;

/// Errors returned by [`DevOpsClient`](super::DevOpsClient) calls.
#[derive(Debug, Error)]
pub enum DevOpsError {
    /// The request never produced a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The credential was rejected.
    ///
    /// Azure DevOps answers an invalid PAT with `203` and a sign-in page
    /// instead of `401`, so both statuses land here.
    #[error("Authentication rejected by Azure DevOps (HTTP {status})")]
    Unauthorized { status: u16 },

    /// The credential lacks permission for the call.
    #[error("Permission denied: {message}")]
    Forbidden { message: String },

    /// The addressed resource does not exist.
    #[error("Resource not found: {message}")]
    NotFound { message: String },

    /// The resource already exists.
    #[error("Resource already exists: {message}")]
    Conflict { message: String },

    /// Any other non-success status.
    #[error("Azure DevOps returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    /// A request URL could not be built from the given base.
    #[error("Cannot build a request URL from '{url}'")]
    InvalidUrl { url: String },
}

impl DevOpsError {
    /// Returns true if the credential was rejected or lacks permission.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized { .. } | Self::Forbidden { .. })
    }

    /// Returns the HTTP status behind this error, if there was a response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { status } | Self::Status { status, .. } => Some(*status),
            Self::Forbidden { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::Conflict { .. } => Some(409),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Decode(_) | Self::InvalidUrl { .. } => None,
        }
    }
}
