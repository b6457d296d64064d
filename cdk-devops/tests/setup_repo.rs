use std::path::Path;
use std::sync::{Arc, Mutex};

use cdk_devops::setup::{hook_path, BUILD_VALIDATION_POLICY, MINIMUM_REVIEWERS_POLICY};
use cdk_devops::{
    Credential, DevOpsClient, DevOpsError, LoggingOptions, ProjectSettings, RepoSetup, SetupError,
    SetupRequest, SetupStep, SourcePublisher, StepFailure, StepOutcome,
};
use mockito::{Matcher, Mock, Server};
use serde_json::json;
use tempfile::TempDir;
use tracing::instrument::WithSubscriber;

const REPOSITORY_ID: &str = "5febef5a-833d-4e14-b9c0-14cb638f91e6";

/// Records pushes instead of running git.
#[derive(Clone, Default)]
struct RecordingPublisher {
    remotes: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl RecordingPublisher {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn remotes(&self) -> Vec<String> {
        self.remotes.lock().unwrap().clone()
    }
}

impl SourcePublisher for RecordingPublisher {
    async fn publish(&self, _workdir: &Path, remote: &str) -> Result<(), StepFailure> {
        self.remotes.lock().unwrap().push(remote.to_string());
        if self.fail {
            return Err(StepFailure::Git {
                message: "git push -u origin --all failed: permission denied".to_string(),
            });
        }
        Ok(())
    }
}

fn setup(
    server: &Server,
    publisher: RecordingPublisher,
) -> RepoSetup<RecordingPublisher> {
    let mut settings = ProjectSettings::new("contoso", "p1", "cdk-projects");
    settings.base_url = server.url();
    let client = DevOpsClient::new(Credential::Basic("pat".to_string())).unwrap();
    RepoSetup::with_publisher(client, settings, publisher).unwrap()
}

fn work_tree() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join(".git")).unwrap();
    dir
}

fn request(dir: &TempDir) -> SetupRequest {
    SetupRequest::new("pat", "demo").with_workdir(dir.path())
}

fn api_version() -> Matcher {
    Matcher::UrlEncoded("api-version".into(), "7.0".into())
}

async fn mock_existing_repository(server: &mut Server) -> (Mock, Mock) {
    let create = server
        .mock("POST", "/contoso/_apis/git/repositories")
        .match_query(api_version())
        .with_status(409)
        .with_body(json!({"message": "TF400948: A Git repository with the name demo already exists."}).to_string())
        .create_async()
        .await;
    let get = server
        .mock("GET", "/contoso/p1/_apis/git/repositories/demo")
        .match_query(api_version())
        .with_status(200)
        .with_body(json!({"id": REPOSITORY_ID, "name": "demo"}).to_string())
        .expect(1)
        .create_async()
        .await;
    (create, get)
}

async fn mock_created_repository(server: &mut Server) -> Mock {
    server
        .mock("POST", "/contoso/_apis/git/repositories")
        .match_query(api_version())
        .match_body(Matcher::Json(json!({"name": "demo", "project": {"id": "p1"}})))
        .with_status(201)
        .with_body(json!({"id": REPOSITORY_ID, "name": "demo"}).to_string())
        .expect(1)
        .create_async()
        .await
}

async fn mock_pipeline_list(server: &mut Server, pipelines: serde_json::Value) -> Mock {
    server
        .mock("GET", "/contoso/p1/_apis/pipelines")
        .match_query(api_version())
        .with_status(200)
        .with_body(json!({ "value": pipelines }).to_string())
        .create_async()
        .await
}

async fn mock_policy_list(server: &mut Server, policies: serde_json::Value) -> Mock {
    server
        .mock("GET", "/contoso/p1/_apis/git/policy/configurations")
        .match_query(Matcher::AllOf(vec![
            api_version(),
            Matcher::UrlEncoded("repositoryId".into(), REPOSITORY_ID.into()),
            Matcher::UrlEncoded("refName".into(), "refs/heads/master".into()),
        ]))
        .with_status(200)
        .with_body(json!({ "value": policies }).to_string())
        .create_async()
        .await
}

#[tokio::test]
async fn existing_repository_is_skipped_and_setup_continues() {
    let mut server = Server::new_async().await;
    let publisher = RecordingPublisher::default();
    let dir = work_tree();
    let log_dir = tempfile::tempdir().unwrap();
    let log_file = log_dir.path().join("setup.log");
    let logger = LoggingOptions {
        console_output: false,
        ..LoggingOptions::default()
    }
    .with_log_file(&log_file)
    .build()
    .unwrap();

    let (_create, get) = mock_existing_repository(&mut server).await;
    let _mock = mock_pipeline_list(
        &mut server,
        json!([
            {"id": 1, "name": "demo-development", "folder": "\\demo"},
            {"id": 2, "name": "demo-pull-request", "folder": "\\demo"},
            {"id": 3, "name": "demo-release", "folder": "\\demo"}
        ]),
    )
    .await;
    let _mock = mock_policy_list(
        &mut server,
        json!([
            {"id": 10, "type": {"id": MINIMUM_REVIEWERS_POLICY}, "isEnabled": true, "settings": {}},
            {"id": 11, "type": {"id": BUILD_VALIDATION_POLICY}, "isEnabled": true, "settings": {}}
        ]),
    )
    .await;
    let create_pipeline = server
        .mock("POST", "/contoso/p1/_apis/pipelines")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let create_policy = server
        .mock("POST", "/contoso/p1/_apis/policy/configurations")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let result = setup(&server, publisher.clone())
        .setup_repo(&request(&dir))
        .with_subscriber(logger.dispatch().clone())
        .await
        .unwrap();

    assert_eq!(result.repository_id, REPOSITORY_ID);
    assert!(matches!(
        result.outcome(SetupStep::CreateRepository),
        Some(StepOutcome::Skipped { .. })
    ));
    assert!(matches!(
        result.outcome(SetupStep::CreatePipelines),
        Some(StepOutcome::Skipped { .. })
    ));
    assert!(matches!(
        result.outcome(SetupStep::BranchPolicy),
        Some(StepOutcome::Skipped { .. })
    ));
    assert_eq!(result.pipelines["pull-request"], 2);
    assert_eq!(
        publisher.remotes(),
        ["git@ssh.dev.azure.com:v3/contoso/cdk-projects/demo"]
    );
    assert!(hook_path(dir.path()).is_file());
    get.assert_async().await;
    create_pipeline.assert_async().await;
    create_policy.assert_async().await;

    let log = std::fs::read_to_string(&log_file).unwrap();
    assert!(log.contains("Repository already exists"));
    assert!(log.contains("A Git repository with the name demo already exists"));
}

#[tokio::test]
async fn new_repository_gets_pipelines_and_policies() {
    let mut server = Server::new_async().await;
    let publisher = RecordingPublisher::default();
    let dir = work_tree();

    let create_repository = mock_created_repository(&mut server).await;
    let _mock = mock_pipeline_list(&mut server, json!([])).await;
    let create_pipeline = server
        .mock("POST", "/contoso/p1/_apis/pipelines")
        .match_query(api_version())
        .match_body(Matcher::PartialJson(json!({
            "folder": "\\demo",
            "configuration": {
                "type": "yaml",
                "repository": {"id": REPOSITORY_ID, "name": "demo", "type": "azureReposGit"}
            }
        })))
        .with_status(200)
        .with_body(json!({"id": 42, "name": "demo-pipeline"}).to_string())
        .expect(3)
        .create_async()
        .await;
    let _mock = mock_policy_list(&mut server, json!([])).await;
    let build_validation = server
        .mock("POST", "/contoso/p1/_apis/policy/configurations")
        .match_query(api_version())
        .match_body(Matcher::PartialJson(json!({
            "isEnabled": true,
            "isBlocking": true,
            "type": {"id": BUILD_VALIDATION_POLICY},
            "settings": {
                "buildDefinitionId": 42,
                "validDuration": 720.0,
                "scope": [{"repositoryId": REPOSITORY_ID, "refName": "refs/heads/master", "matchKind": "exact"}]
            }
        })))
        .with_status(200)
        .with_body(json!({"id": 100, "type": {"id": BUILD_VALIDATION_POLICY}}).to_string())
        .expect(1)
        .create_async()
        .await;
    let reviewers = server
        .mock("POST", "/contoso/p1/_apis/policy/configurations")
        .match_query(api_version())
        .match_body(Matcher::PartialJson(json!({
            "type": {"id": MINIMUM_REVIEWERS_POLICY},
            "settings": {"minimumApproverCount": 1}
        })))
        .with_status(200)
        .with_body(json!({"id": 101, "type": {"id": MINIMUM_REVIEWERS_POLICY}}).to_string())
        .expect(1)
        .create_async()
        .await;

    let result = setup(&server, publisher.clone())
        .setup_repo(&request(&dir))
        .await
        .unwrap();

    assert_eq!(result.steps.len(), SetupStep::ALL.len());
    assert!(result
        .steps
        .iter()
        .all(|report| report.outcome == StepOutcome::Completed));
    assert_eq!(result.pipelines.len(), 3);
    create_repository.assert_async().await;
    create_pipeline.assert_async().await;
    build_validation.assert_async().await;
    reviewers.assert_async().await;
}

#[tokio::test]
async fn existing_pipelines_are_not_recreated() {
    let mut server = Server::new_async().await;
    let dir = work_tree();

    let _mock = mock_created_repository(&mut server).await;
    let _mock = mock_pipeline_list(
        &mut server,
        json!([{"id": 7, "name": "demo-development"}, {"id": 8, "name": "other-release"}]),
    )
    .await;
    let create_pipeline = server
        .mock("POST", "/contoso/p1/_apis/pipelines")
        .match_query(api_version())
        .match_body(Matcher::Regex("demo-(pull-request|release)".into()))
        .with_status(200)
        .with_body(json!({"id": 9, "name": "demo-pipeline"}).to_string())
        .expect(2)
        .create_async()
        .await;
    let _mock = mock_policy_list(
        &mut server,
        json!([
            {"id": 10, "type": {"id": MINIMUM_REVIEWERS_POLICY}},
            {"id": 11, "type": {"id": BUILD_VALIDATION_POLICY}}
        ]),
    )
    .await;

    let result = setup(&server, RecordingPublisher::default())
        .setup_repo(&request(&dir))
        .await
        .unwrap();

    assert_eq!(result.pipelines["development"], 7);
    assert_eq!(result.pipelines["release"], 9);
    create_pipeline.assert_async().await;
}

#[tokio::test]
async fn pipeline_failure_stops_setup_with_step_error() {
    let mut server = Server::new_async().await;
    let dir = work_tree();

    let _mock = mock_created_repository(&mut server).await;
    let _mock = mock_pipeline_list(&mut server, json!([])).await;
    let _mock = server
        .mock("POST", "/contoso/p1/_apis/pipelines")
        .match_query(api_version())
        .with_status(500)
        .with_body(json!({"message": "Internal error"}).to_string())
        .create_async()
        .await;
    let list_policies = server
        .mock("GET", "/contoso/p1/_apis/git/policy/configurations")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let result = setup(&server, RecordingPublisher::default())
        .setup_repo(&request(&dir))
        .await;

    match result {
        Err(SetupError::Step {
            step: SetupStep::CreatePipelines,
            cause: StepFailure::Api(DevOpsError::Status { status: 500, .. }),
        }) => {}
        other => panic!("expected pipeline step error, got {other:?}"),
    }
    assert!(!hook_path(dir.path()).exists());
    list_policies.assert_async().await;
}

#[tokio::test]
async fn rejected_pat_fails_first_step() {
    let mut server = Server::new_async().await;
    let publisher = RecordingPublisher::default();
    let dir = work_tree();

    let _mock = server
        .mock("POST", "/contoso/_apis/git/repositories")
        .match_query(api_version())
        .with_status(401)
        .create_async()
        .await;

    let result = setup(&server, publisher.clone())
        .setup_repo(&request(&dir))
        .await;

    let error = result.unwrap_err();
    assert_eq!(error.step(), Some(SetupStep::CreateRepository));
    assert!(matches!(
        error,
        SetupError::Step {
            cause: StepFailure::Api(DevOpsError::Unauthorized { .. }),
            ..
        }
    ));
    assert!(publisher.remotes().is_empty());
}

#[tokio::test]
async fn push_failure_stops_before_pipelines() {
    let mut server = Server::new_async().await;
    let dir = work_tree();

    let _mock = mock_created_repository(&mut server).await;
    let list_pipelines = server
        .mock("GET", "/contoso/p1/_apis/pipelines")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let result = setup(&server, RecordingPublisher::failing())
        .setup_repo(&request(&dir))
        .await;

    assert!(matches!(
        result,
        Err(SetupError::Step {
            step: SetupStep::PushContent,
            cause: StepFailure::Git { .. },
        })
    ));
    list_pipelines.assert_async().await;
}

#[tokio::test]
async fn requests_authenticate_with_the_request_pat() {
    let mut server = Server::new_async().await;
    let dir = work_tree();

    let mut settings = ProjectSettings::new("contoso", "p1", "cdk-projects");
    settings.base_url = server.url();
    let client = DevOpsClient::new(Credential::Basic("client-pat".to_string())).unwrap();
    let setup = RepoSetup::with_publisher(client, settings, RecordingPublisher::failing()).unwrap();

    // base64 of ":request-pat"
    let create = server
        .mock("POST", "/contoso/_apis/git/repositories")
        .match_query(api_version())
        .match_header("authorization", "Basic OnJlcXVlc3QtcGF0")
        .with_status(201)
        .with_body(json!({"id": REPOSITORY_ID, "name": "demo"}).to_string())
        .expect(1)
        .create_async()
        .await;

    let request = SetupRequest::new("request-pat", "demo").with_workdir(dir.path());
    let result = setup.setup_repo(&request).await;

    assert!(matches!(
        result,
        Err(SetupError::Step {
            step: SetupStep::PushContent,
            ..
        })
    ));
    create.assert_async().await;
}
