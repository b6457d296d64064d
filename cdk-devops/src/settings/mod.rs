//! Azure DevOps project settings.
//!
//! Setup needs to know which organization and project new repositories land
//! in, which API version to speak and how pipelines are named. These come
//! from a `devops.toml` file:
//!
//! ```toml
//! organization = "contoso"
//! project-id = "26546064-040a-41ae-949a-c8f35fa94a9b"
//! project-name = "cdk-projects"
//! # optional
//! default-branch = "refs/heads/master"
//! pipeline-stages = ["development", "pull-request", "release"]
//! ```

mod error;

pub use error::SettingsError;

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;
use url::Url;

/// Stage whose pipeline validates pull requests.
pub const PULL_REQUEST_STAGE: &str = "pull-request";

/// Stage whose pipeline definition lives in `azure-pipelines.yml`.
const DEVELOPMENT_STAGE: &str = "development";

/// Settings describing the Azure DevOps project repositories are created in.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectSettings {
    /// Organization name, as in `https://dev.azure.com/{organization}`.
    pub organization: String,

    /// Project GUID new repositories and pipelines belong to.
    pub project_id: String,

    /// Project name, used in the ssh remote.
    pub project_name: String,

    /// Service root (defaults to `https://dev.azure.com`).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// REST API version sent with every setup request.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Branch protected by the pull request policies.
    #[serde(default = "default_branch")]
    pub default_branch: String,

    /// Pipelines created for every repository, one per stage.
    #[serde(default = "default_pipeline_stages")]
    pub pipeline_stages: Vec<String>,

    /// Host of the ssh remote the sample content is pushed to.
    #[serde(default = "default_ssh_host")]
    pub ssh_host: String,

    /// Approvals required before a pull request can complete.
    #[serde(default = "default_minimum_reviewers")]
    pub minimum_reviewers: u32,

    /// How long a successful validation build stays valid, in minutes.
    #[serde(default = "default_build_validation_minutes")]
    pub build_validation_minutes: u32,
}

fn default_base_url() -> String {
    "https://dev.azure.com".to_string()
}

fn default_api_version() -> String {
    "7.0".to_string()
}

fn default_branch() -> String {
    "refs/heads/master".to_string()
}

fn default_pipeline_stages() -> Vec<String> {
    vec![
        DEVELOPMENT_STAGE.to_string(),
        PULL_REQUEST_STAGE.to_string(),
        "release".to_string(),
    ]
}

fn default_ssh_host() -> String {
    "ssh.dev.azure.com".to_string()
}

fn default_minimum_reviewers() -> u32 {
    1
}

fn default_build_validation_minutes() -> u32 {
    720
}

impl ProjectSettings {
    /// Creates settings for a project with every optional value defaulted.
    pub fn new(
        organization: impl Into<String>,
        project_id: impl Into<String>,
        project_name: impl Into<String>,
    ) -> Self {
        Self {
            organization: organization.into(),
            project_id: project_id.into(),
            project_name: project_name.into(),
            base_url: default_base_url(),
            api_version: default_api_version(),
            default_branch: default_branch(),
            pipeline_stages: default_pipeline_stages(),
            ssh_host: default_ssh_host(),
            minimum_reviewers: default_minimum_reviewers(),
            build_validation_minutes: default_build_validation_minutes(),
        }
    }

    /// Loads and validates settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if the file is missing, malformed, or fails
    /// validation.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        debug!(path = %path.display(), "Loading project settings");

        let content = std::fs::read_to_string(path).map_err(|e| SettingsError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        let settings: Self = toml::from_str(&content).map_err(|e| SettingsError::TomlError {
            path: path.display().to_string(),
            source: e,
        })?;

        settings.validate(path)?;
        Ok(settings)
    }

    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::ValidationError`] naming the first problem.
    pub fn validate(&self, path: &Path) -> Result<(), SettingsError> {
        let fail = |message: String| {
            Err(SettingsError::ValidationError {
                path: path.display().to_string(),
                message,
            })
        };

        for (key, value) in [
            ("organization", &self.organization),
            ("project-id", &self.project_id),
            ("project-name", &self.project_name),
            ("api-version", &self.api_version),
            ("ssh-host", &self.ssh_host),
        ] {
            if value.trim().is_empty() {
                return fail(format!("{key} must not be empty"));
            }
        }

        if Url::parse(&self.base_url).is_err() {
            return fail(format!("base-url is not a valid URL: {}", self.base_url));
        }

        if !self.default_branch.starts_with("refs/heads/")
            || self.default_branch.len() == "refs/heads/".len()
        {
            return fail(format!(
                "default-branch must be a full ref like refs/heads/main: {}",
                self.default_branch
            ));
        }

        if self.pipeline_stages.is_empty() {
            return fail("pipeline-stages must name at least one stage".to_string());
        }

        let mut seen = HashSet::new();
        for stage in &self.pipeline_stages {
            if stage.trim().is_empty() || stage.contains(['/', '\\']) {
                return fail(format!("pipeline stage is not a valid name: '{stage}'"));
            }
            if !seen.insert(stage.as_str()) {
                return fail(format!("pipeline stage listed twice: {stage}"));
            }
        }

        if self.minimum_reviewers == 0 {
            return fail("minimum-reviewers must be at least 1".to_string());
        }

        Ok(())
    }

    /// Returns the service root as a URL.
    ///
    /// # Errors
    ///
    /// Fails if `base_url` does not parse; [`validate`](Self::validate)
    /// rejects such settings up front.
    pub fn service_root(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.base_url)
    }

    /// Returns the YAML file a stage's pipeline is defined in.
    #[must_use]
    pub fn pipeline_yaml_path(stage: &str) -> String {
        if stage == DEVELOPMENT_STAGE {
            "/azure-pipelines.yml".to_string()
        } else {
            format!("/azure-pipelines-{stage}.yml")
        }
    }

    /// Returns the pipeline name for a repository stage.
    #[must_use]
    pub fn pipeline_name(repo_name: &str, stage: &str) -> String {
        format!("{repo_name}-{stage}")
    }

    /// Returns the pipeline folder grouping a repository's pipelines.
    #[must_use]
    pub fn pipeline_folder(repo_name: &str) -> String {
        format!("\\{repo_name}")
    }

    /// Returns the ssh remote of a repository in this project.
    #[must_use]
    pub fn ssh_remote(&self, repo_name: &str) -> String {
        format!(
            "git@{}:v3/{}/{}/{}",
            self.ssh_host, self.organization, self.project_name, repo_name
        )
    }
}
