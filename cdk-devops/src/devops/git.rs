//! Repository endpoints.

use super::models::{CreateRepository, GitRepository, ProjectReference};
use super::{endpoint, DevOpsClient, DevOpsError};
use url::Url;

impl DevOpsClient {
    /// Creates a repository in a project.
    ///
    /// Fails with [`DevOpsError::Conflict`] when the name is taken.
    pub async fn create_repository(
        &self,
        organization: &Url,
        project_id: &str,
        name: &str,
        api_version: &str,
    ) -> Result<GitRepository, DevOpsError> {
        let url = endpoint(organization, &["_apis", "git", "repositories"], api_version)?;
        let body = CreateRepository {
            name,
            project: ProjectReference { id: project_id },
        };
        self.post_json(url, &body).await
    }

    /// Looks up a repository by name or id.
    pub async fn get_repository(
        &self,
        organization: &Url,
        project: &str,
        name: &str,
        api_version: &str,
    ) -> Result<GitRepository, DevOpsError> {
        let url = endpoint(
            organization,
            &[project, "_apis", "git", "repositories", name],
            api_version,
        )?;
        self.get_json(url).await
    }
}
