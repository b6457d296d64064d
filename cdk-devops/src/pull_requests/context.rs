//! Pull request coordinates taken from Azure Pipelines predefined variables.

use super::ContextError;
use crate::devops::join_segments;
use url::Url;

pub const COLLECTION_URI_VAR: &str = "SYSTEM_COLLECTIONURI";
pub const TEAM_PROJECT_VAR: &str = "SYSTEM_TEAMPROJECT";
pub const REPOSITORY_ID_VAR: &str = "BUILD_REPOSITORY_ID";
pub const ACCESS_TOKEN_VAR: &str = "SYSTEM_ACCESSTOKEN";
pub const SOURCE_VERSION_VAR: &str = "BUILD_SOURCEVERSION";
pub const PULL_REQUEST_ID_VAR: &str = "SYSTEM_PULLREQUEST_PULLREQUESTID";

/// Length of the commit prefix used to name uploaded attachments.
const COMMIT_PREFIX_LEN: usize = 5;

/// Where the pull requests of the current build live, and how to reach them.
#[derive(Clone)]
pub struct PullRequestContext {
    /// Organization URL, e.g. `https://dev.azure.com/fabrikam/`.
    pub collection_uri: Url,
    /// Project name.
    pub team_project: String,
    /// Repository GUID.
    pub repository_id: String,
    /// Commit being built, when known.
    pub source_version: Option<String>,
    access_token: String,
}

impl std::fmt::Debug for PullRequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PullRequestContext")
            .field("collection_uri", &self.collection_uri.as_str())
            .field("team_project", &self.team_project)
            .field("repository_id", &self.repository_id)
            .field("source_version", &self.source_version)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

impl PullRequestContext {
    /// Creates a context from explicit values.
    pub fn new(
        collection_uri: Url,
        team_project: impl Into<String>,
        repository_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            collection_uri,
            team_project: team_project.into(),
            repository_id: repository_id.into(),
            source_version: None,
            access_token: access_token.into(),
        }
    }

    /// Sets the commit being built.
    #[must_use]
    pub fn with_source_version(mut self, source_version: impl Into<String>) -> Self {
        self.source_version = Some(source_version.into());
        self
    }

    /// Reads the context from the pipeline's predefined variables.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError`] if a required variable is unset, empty or
    /// the collection URI does not parse.
    pub fn from_env() -> Result<Self, ContextError> {
        let raw_uri = required_var(COLLECTION_URI_VAR)?;
        let collection_uri = Url::parse(&raw_uri).map_err(|e| ContextError::InvalidVariable {
            name: COLLECTION_URI_VAR,
            message: e.to_string(),
        })?;

        let context = Self::new(
            collection_uri,
            required_var(TEAM_PROJECT_VAR)?,
            required_var(REPOSITORY_ID_VAR)?,
            required_var(ACCESS_TOKEN_VAR)?,
        );

        Ok(match optional_var(SOURCE_VERSION_VAR) {
            Some(version) => context.with_source_version(version),
            None => context,
        })
    }

    /// Returns the token used to authenticate comment calls.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Returns the first characters of the commit being built.
    pub fn commit_prefix(&self) -> Option<&str> {
        let version = self.source_version.as_deref()?;
        let end = version
            .char_indices()
            .nth(COMMIT_PREFIX_LEN)
            .map_or(version.len(), |(i, _)| i);
        Some(&version[..end])
    }

    /// Returns the URL of the build repository's git API.
    ///
    /// # Errors
    ///
    /// Fails if the collection URI cannot carry a path.
    pub fn repository_url(&self) -> Result<Url, ContextError> {
        join_segments(
            &self.collection_uri,
            &[
                &self.team_project,
                "_apis",
                "git",
                "repositories",
                &self.repository_id,
            ],
        )
        .map_err(|e| ContextError::InvalidVariable {
            name: COLLECTION_URI_VAR,
            message: e.to_string(),
        })
    }
}

fn required_var(name: &'static str) -> Result<String, ContextError> {
    optional_var(name).ok_or(ContextError::MissingVariable { name })
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
