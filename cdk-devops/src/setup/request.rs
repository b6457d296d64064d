//! Setup request type.

use std::path::PathBuf;

/// A request to onboard one repository.
#[derive(Clone)]
pub struct SetupRequest {
    pat: String,
    /// Name of the repository to create.
    pub repo_name: String,
    /// Git work tree whose branches are pushed and where the hook goes.
    pub workdir: PathBuf,
}

impl SetupRequest {
    /// Creates a request that pushes the current directory.
    pub fn new(pat: impl Into<String>, repo_name: impl Into<String>) -> Self {
        Self {
            pat: pat.into(),
            repo_name: repo_name.into(),
            workdir: PathBuf::from("."),
        }
    }

    /// Sets the git work tree to push from.
    #[must_use]
    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }

    /// Returns the personal access token.
    pub fn pat(&self) -> &str {
        &self.pat
    }
}

impl std::fmt::Debug for SetupRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetupRequest")
            .field("pat", &"[REDACTED]")
            .field("repo_name", &self.repo_name)
            .field("workdir", &self.workdir)
            .finish()
    }
}
