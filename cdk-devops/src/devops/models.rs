//! Request and response bodies of the Azure DevOps REST API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope of every list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

/// A git repository.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitRepository {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub ssh_url: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateRepository<'a> {
    pub name: &'a str,
    pub project: ProjectReference<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProjectReference<'a> {
    pub id: &'a str,
}

/// A pipeline definition.
#[derive(Debug, Clone, Deserialize)]
pub struct Pipeline {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub folder: Option<String>,
}

/// Body of a YAML pipeline creation request.
#[derive(Debug, Clone, Serialize)]
pub struct CreatePipeline {
    pub name: String,
    pub folder: String,
    pub configuration: PipelineConfiguration,
}

impl CreatePipeline {
    /// Describes a YAML pipeline backed by a file in an Azure Repos repository.
    pub fn yaml(
        name: String,
        folder: String,
        path: String,
        repository_id: &str,
        repository_name: &str,
    ) -> Self {
        Self {
            name,
            folder,
            configuration: PipelineConfiguration {
                path,
                repository: PipelineRepository {
                    id: repository_id.to_string(),
                    name: repository_name.to_string(),
                    kind: "azureReposGit",
                },
                kind: "yaml",
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineConfiguration {
    pub path: String,
    pub repository: PipelineRepository,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineRepository {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

/// An existing branch policy configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyConfiguration {
    pub id: u64,
    #[serde(rename = "type")]
    pub policy_type: PolicyTypeReference,
    #[serde(default)]
    pub is_enabled: bool,
    #[serde(default)]
    pub settings: Value,
}

/// Body of a policy configuration creation request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePolicyConfiguration {
    pub is_enabled: bool,
    pub is_blocking: bool,
    #[serde(rename = "type")]
    pub policy_type: PolicyTypeReference,
    pub settings: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTypeReference {
    pub id: String,
}

/// A discussion thread on a pull request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThread {
    pub id: u64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl CommentThread {
    /// Returns true while the thread still needs attention.
    ///
    /// System threads carry no status, so those count as open too.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.is_deleted
            && matches!(
                self.status.as_deref(),
                None | Some("active") | Some("pending") | Some("unknown")
            )
    }

    /// Returns the comment that started the thread.
    #[must_use]
    pub fn root_comment(&self) -> Option<&Comment> {
        self.comments
            .iter()
            .filter(|c| !c.is_deleted)
            .min_by_key(|c| c.id)
    }
}

/// A single comment in a thread.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: u64,
    #[serde(default)]
    pub parent_comment_id: u64,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewThread<'a> {
    pub comments: [NewComment<'a>; 1],
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewComment<'a> {
    pub parent_comment_id: u64,
    pub content: &'a str,
    pub comment_type: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CommentUpdate<'a> {
    pub content: &'a str,
}

/// An uploaded pull request attachment.
#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    pub url: String,
    #[serde(default)]
    pub id: Option<u64>,
}
