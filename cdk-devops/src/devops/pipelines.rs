//! Pipeline endpoints.

use super::models::{CreatePipeline, ListResponse, Pipeline};
use super::{endpoint, DevOpsClient, DevOpsError};
use url::Url;

impl DevOpsClient {
    /// Lists the pipelines of a project.
    pub async fn list_pipelines(
        &self,
        organization: &Url,
        project: &str,
        api_version: &str,
    ) -> Result<Vec<Pipeline>, DevOpsError> {
        let url = endpoint(organization, &[project, "_apis", "pipelines"], api_version)?;
        let list: ListResponse<Pipeline> = self.get_json(url).await?;
        Ok(list.value)
    }

    /// Creates a pipeline in a project.
    pub async fn create_pipeline(
        &self,
        organization: &Url,
        project: &str,
        pipeline: &CreatePipeline,
        api_version: &str,
    ) -> Result<Pipeline, DevOpsError> {
        let url = endpoint(organization, &[project, "_apis", "pipelines"], api_version)?;
        self.post_json(url, pipeline).await
    }
}
