//! Onboarding a repository into the Azure DevOps project.
//!
//! [`RepoSetup::setup_repo`] runs five steps in order: create the repository,
//! push the local sources to it, create one pipeline per stage, protect the
//! default branch and install the pre-commit hook. Each step checks what
//! already exists first, so running setup again for the same repository only
//! fills in what is missing. A failing step stops the run; earlier changes
//! are kept.

mod error;
mod hook;
mod publisher;
mod request;
mod result;

pub use error::{SetupError, StepFailure};
pub use hook::{hook_path, install_pre_commit_hook};
pub use publisher::{GitPublisher, SourcePublisher};
pub use request::SetupRequest;
pub use result::{SetupResult, SetupStep, StepOutcome, StepReport};

use crate::devops::models::{CreatePipeline, CreatePolicyConfiguration, PolicyTypeReference};
use crate::devops::{join_segments, Credential, DevOpsClient, DevOpsError};
use crate::settings::{ProjectSettings, PULL_REQUEST_STAGE};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{debug, error, info, info_span, Instrument};
use url::Url;

/// Policy type requiring a minimum number of reviewers.
pub const MINIMUM_REVIEWERS_POLICY: &str = "fa4e907d-c16b-4a4c-9dfa-4906e5d171dd";

/// Policy type requiring a successful build before merging.
pub const BUILD_VALIDATION_POLICY: &str = "0609b952-1397-4640-95ec-e00a01b2c241";

/// Creates and configures repositories in one Azure DevOps project.
#[derive(Debug)]
pub struct RepoSetup<P = GitPublisher> {
    client: DevOpsClient,
    settings: ProjectSettings,
    organization: Url,
    publisher: P,
}

impl RepoSetup<GitPublisher> {
    /// Creates a setup that pushes sources with the `git` command line.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::InvalidUrl`] if the settings do not describe a
    /// usable organization URL.
    pub fn new(client: DevOpsClient, settings: ProjectSettings) -> Result<Self, SetupError> {
        Self::with_publisher(client, settings, GitPublisher)
    }
}

impl<P: SourcePublisher> RepoSetup<P> {
    /// Creates a setup that pushes sources through `publisher`.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::InvalidUrl`] if the settings do not describe a
    /// usable organization URL.
    pub fn with_publisher(
        client: DevOpsClient,
        settings: ProjectSettings,
        publisher: P,
    ) -> Result<Self, SetupError> {
        let invalid = |message: String| SetupError::InvalidUrl {
            url: settings.base_url.clone(),
            message,
        };
        let root = settings.service_root().map_err(|e| invalid(e.to_string()))?;
        let organization = join_segments(&root, &[&settings.organization])
            .map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            client,
            settings,
            organization,
            publisher,
        })
    }

    /// Returns the organization URL requests are sent to.
    pub fn organization(&self) -> &Url {
        &self.organization
    }

    /// Runs every setup step for `request`.
    ///
    /// Requests authenticate with the personal access token carried by
    /// `request`, not with the credential the client was built with.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::Step`] naming the first step that failed. An
    /// existing repository is not an error.
    pub async fn setup_repo(&self, request: &SetupRequest) -> Result<SetupResult, SetupError> {
        let span = info_span!(
            "setup_repo",
            repo = %request.repo_name,
            project = %self.settings.project_name
        );

        async {
            info!("Setting up repository");
            let client = self
                .client
                .with_credential(Credential::Basic(request.pat().to_string()));
            let mut result = SetupResult::default();

            let (repository_id, outcome) = self
                .create_repository(&client, &request.repo_name)
                .instrument(step_span(SetupStep::CreateRepository))
                .await
                .map_err(|cause| step_failed(SetupStep::CreateRepository, cause))?;
            result.repository_id = repository_id;
            result.record(SetupStep::CreateRepository, outcome);

            let remote = self.settings.ssh_remote(&request.repo_name);
            self.publisher
                .publish(&request.workdir, &remote)
                .instrument(step_span(SetupStep::PushContent))
                .await
                .map_err(|cause| step_failed(SetupStep::PushContent, cause))?;
            result.record(SetupStep::PushContent, StepOutcome::Completed);

            let (pipelines, outcome) = self
                .create_pipelines(&client, &request.repo_name, &result.repository_id)
                .instrument(step_span(SetupStep::CreatePipelines))
                .await
                .map_err(|cause| step_failed(SetupStep::CreatePipelines, cause))?;
            result.pipelines = pipelines;
            result.record(SetupStep::CreatePipelines, outcome);

            let outcome = self
                .create_branch_policies(
                    &client,
                    &result.repository_id,
                    result.pipelines.get(PULL_REQUEST_STAGE).copied(),
                )
                .instrument(step_span(SetupStep::BranchPolicy))
                .await
                .map_err(|cause| step_failed(SetupStep::BranchPolicy, cause))?;
            result.record(SetupStep::BranchPolicy, outcome);

            let outcome = install_pre_commit_hook(&request.workdir)
                .instrument(step_span(SetupStep::PreCommitHook))
                .await
                .map_err(|cause| step_failed(SetupStep::PreCommitHook, cause))?;
            result.record(SetupStep::PreCommitHook, outcome);

            info!(repository_id = %result.repository_id, "Repository setup complete");
            Ok(result)
        }
        .instrument(span)
        .await
    }

    /// Creates the repository, or finds it if the name is already taken.
    async fn create_repository(
        &self,
        client: &DevOpsClient,
        repo_name: &str,
    ) -> Result<(String, StepOutcome), StepFailure> {
        let api_version = &self.settings.api_version;

        match client
            .create_repository(&self.organization, &self.settings.project_id, repo_name, api_version)
            .await
        {
            Ok(repository) => {
                info!(repository_id = %repository.id, "Repository created");
                Ok((repository.id, StepOutcome::Completed))
            }
            Err(DevOpsError::Conflict { message }) => {
                info!(reason = %message, "Repository already exists, retrieving its id");
                let repository = client
                    .get_repository(&self.organization, &self.settings.project_id, repo_name, api_version)
                    .await?;
                Ok((
                    repository.id,
                    StepOutcome::skipped("repository already exists"),
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Creates the pipeline of every configured stage that does not exist yet.
    async fn create_pipelines(
        &self,
        client: &DevOpsClient,
        repo_name: &str,
        repository_id: &str,
    ) -> Result<(BTreeMap<String, u64>, StepOutcome), StepFailure> {
        let project = &self.settings.project_id;
        let api_version = &self.settings.api_version;

        let existing = client
            .list_pipelines(&self.organization, project, api_version)
            .await?;
        debug!(count = existing.len(), "Fetched existing pipelines");

        let mut pipelines = BTreeMap::new();
        let mut created = 0usize;

        for stage in &self.settings.pipeline_stages {
            let name = ProjectSettings::pipeline_name(repo_name, stage);

            if let Some(pipeline) = existing.iter().find(|p| p.name == name) {
                info!(pipeline = %name, id = pipeline.id, "Pipeline already exists");
                pipelines.insert(stage.clone(), pipeline.id);
                continue;
            }

            let definition = CreatePipeline::yaml(
                name.clone(),
                ProjectSettings::pipeline_folder(repo_name),
                ProjectSettings::pipeline_yaml_path(stage),
                repository_id,
                repo_name,
            );
            let pipeline = client
                .create_pipeline(&self.organization, project, &definition, api_version)
                .await?;
            info!(pipeline = %name, id = pipeline.id, "Pipeline created");
            pipelines.insert(stage.clone(), pipeline.id);
            created += 1;
        }

        let outcome = if created == 0 {
            StepOutcome::skipped("all pipelines already exist")
        } else {
            StepOutcome::Completed
        };
        Ok((pipelines, outcome))
    }

    /// Protects the default branch with review and build validation policies.
    async fn create_branch_policies(
        &self,
        client: &DevOpsClient,
        repository_id: &str,
        pull_request_pipeline: Option<u64>,
    ) -> Result<StepOutcome, StepFailure> {
        let project = &self.settings.project_id;
        let api_version = &self.settings.api_version;
        let branch = &self.settings.default_branch;

        let existing = client
            .list_policy_configurations(&self.organization, project, repository_id, branch, api_version)
            .await?;
        let has_policy = |type_id: &str| existing.iter().any(|p| p.policy_type.id == type_id);

        let scope = json!([{
            "repositoryId": repository_id,
            "refName": branch,
            "matchKind": "exact",
        }]);

        let mut wanted = Vec::new();
        if !has_policy(MINIMUM_REVIEWERS_POLICY) {
            wanted.push(CreatePolicyConfiguration {
                is_enabled: true,
                is_blocking: true,
                policy_type: PolicyTypeReference {
                    id: MINIMUM_REVIEWERS_POLICY.to_string(),
                },
                settings: json!({
                    "minimumApproverCount": self.settings.minimum_reviewers,
                    "creatorVoteCounts": false,
                    "allowDownvotes": false,
                    "resetOnSourcePush": true,
                    "scope": scope,
                }),
            });
        }

        match pull_request_pipeline {
            Some(_) if has_policy(BUILD_VALIDATION_POLICY) => {}
            Some(pipeline_id) => wanted.push(CreatePolicyConfiguration {
                is_enabled: true,
                is_blocking: true,
                policy_type: PolicyTypeReference {
                    id: BUILD_VALIDATION_POLICY.to_string(),
                },
                settings: json!({
                    "buildDefinitionId": pipeline_id,
                    "manualQueueOnly": false,
                    "queueOnSourceUpdateOnly": true,
                    "scope": scope,
                    "validDuration": f64::from(self.settings.build_validation_minutes),
                }),
            }),
            None => info!(
                stage = PULL_REQUEST_STAGE,
                "No pull request pipeline configured, skipping build validation"
            ),
        }

        if wanted.is_empty() {
            info!("Branch policies already configured");
            return Ok(StepOutcome::skipped("branch policies already exist"));
        }

        for policy in &wanted {
            let created = client
                .create_policy_configuration(&self.organization, project, policy, api_version)
                .await?;
            info!(
                policy_id = created.id,
                policy_type = %policy.policy_type.id,
                "Branch policy created"
            );
        }
        Ok(StepOutcome::Completed)
    }
}

fn step_span(step: SetupStep) -> tracing::Span {
    info_span!("setup_step", step = %step)
}

fn step_failed(step: SetupStep, cause: StepFailure) -> SetupError {
    error!(step = %step, error = %cause, "Setup step failed");
    SetupError::Step { step, cause }
}
