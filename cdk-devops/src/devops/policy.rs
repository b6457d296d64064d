//! Branch policy endpoints.

use super::models::{CreatePolicyConfiguration, ListResponse, PolicyConfiguration};
use super::{endpoint, DevOpsClient, DevOpsError};
use url::Url;

impl DevOpsClient {
    /// Lists the policy configurations scoped to a repository branch.
    pub async fn list_policy_configurations(
        &self,
        organization: &Url,
        project: &str,
        repository_id: &str,
        ref_name: &str,
        api_version: &str,
    ) -> Result<Vec<PolicyConfiguration>, DevOpsError> {
        let mut url = endpoint(
            organization,
            &[project, "_apis", "git", "policy", "configurations"],
            api_version,
        )?;
        url.query_pairs_mut()
            .append_pair("repositoryId", repository_id)
            .append_pair("refName", ref_name);

        let list: ListResponse<PolicyConfiguration> = self.get_json(url).await?;
        Ok(list.value)
    }

    /// Creates a policy configuration in a project.
    pub async fn create_policy_configuration(
        &self,
        organization: &Url,
        project: &str,
        policy: &CreatePolicyConfiguration,
        api_version: &str,
    ) -> Result<PolicyConfiguration, DevOpsError> {
        let url = endpoint(
            organization,
            &[project, "_apis", "policy", "configurations"],
            api_version,
        )?;
        self.post_json(url, policy).await
    }
}
