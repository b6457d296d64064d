use std::path::PathBuf;

use cdk_devops::pull_requests::{tag_body, CommentError, CommentPoster, ResultPublisher};
use cdk_devops::{CommentRenderer, Credential, DevOpsClient};
use mockito::{Matcher, Server};
use serde_json::json;
use url::Url;

const THREADS_PATH: &str = "/org/proj/_apis/git/repositories/repo/pullRequests/7/threads";

fn fixtures_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn poster(server: &Server, token: &str) -> CommentPoster {
    let client = DevOpsClient::new(Credential::Bearer(token.to_string())).unwrap();
    let repository =
        Url::parse(&format!("{}/org/proj/_apis/git/repositories/repo", server.url())).unwrap();
    CommentPoster::new(client, repository)
}

fn api_version() -> Matcher {
    Matcher::UrlEncoded("api-version".into(), "7.1".into())
}

fn thread_json(id: u64, content: &str) -> serde_json::Value {
    json!({
        "id": id,
        "status": "active",
        "isDeleted": false,
        "comments": [{
            "id": 1,
            "parentCommentId": 0,
            "content": content,
            "isDeleted": false
        }]
    })
}

#[tokio::test]
async fn posting_twice_with_same_marker_updates_one_thread() {
    let mut server = Server::new_async().await;
    let poster = poster(&server, "token");

    let first = tag_body("cdk-diff", "first diff");
    let second = tag_body("cdk-diff", "second diff");

    // First run: no threads yet.
    let empty_list = server
        .mock("GET", THREADS_PATH)
        .match_query(api_version())
        .with_status(200)
        .with_body(json!({"value": [], "count": 0}).to_string())
        .create_async()
        .await;
    let create = server
        .mock("POST", THREADS_PATH)
        .match_query(api_version())
        .match_body(Matcher::PartialJson(json!({
            "comments": [{"parentCommentId": 0, "content": first, "commentType": "text"}],
            "status": "active"
        })))
        .with_status(200)
        .with_body(thread_json(11, &first).to_string())
        .expect(1)
        .create_async()
        .await;

    let created = poster.post_comment(7, &first).await.unwrap();
    assert_eq!(created.thread_id, 11);
    assert_eq!(created.comment_id, 1);
    empty_list.remove_async().await;

    // Second run: the tagged thread exists and is updated.
    let list = server
        .mock("GET", THREADS_PATH)
        .match_query(api_version())
        .with_status(200)
        .with_body(
            json!({"value": [thread_json(3, "unrelated"), thread_json(11, &first)]}).to_string(),
        )
        .create_async()
        .await;
    let update = server
        .mock("PATCH", format!("{THREADS_PATH}/11/comments/1").as_str())
        .match_query(api_version())
        .match_body(Matcher::Json(json!({ "content": second })))
        .with_status(200)
        .with_body(json!({"id": 1, "content": second}).to_string())
        .expect(1)
        .create_async()
        .await;

    let updated = poster.post_comment(7, &second).await.unwrap();

    assert_eq!(updated, created);
    create.assert_async().await;
    update.assert_async().await;
    list.assert_async().await;
}

#[tokio::test]
async fn unchanged_comment_is_not_patched() {
    let mut server = Server::new_async().await;
    let poster = poster(&server, "token");
    let body = tag_body("cdk-diff", "same diff");

    let _mock = server
        .mock("GET", THREADS_PATH)
        .match_query(api_version())
        .with_status(200)
        .with_body(json!({"value": [thread_json(11, &body)]}).to_string())
        .create_async()
        .await;
    let patch = server
        .mock("PATCH", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let create = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let id = poster.post_comment(7, &body).await.unwrap();

    assert_eq!(id.thread_id, 11);
    patch.assert_async().await;
    create.assert_async().await;
}

#[tokio::test]
async fn closed_tagged_thread_gets_a_new_thread() {
    let mut server = Server::new_async().await;
    let poster = poster(&server, "token");
    let body = tag_body("cdk-diff", "diff");

    let mut closed = thread_json(4, &body);
    closed["status"] = json!("closed");
    let _mock = server
        .mock("GET", THREADS_PATH)
        .match_query(api_version())
        .with_status(200)
        .with_body(json!({ "value": [closed] }).to_string())
        .create_async()
        .await;
    let create = server
        .mock("POST", THREADS_PATH)
        .match_query(api_version())
        .with_status(200)
        .with_body(thread_json(12, &body).to_string())
        .expect(1)
        .create_async()
        .await;

    let id = poster.post_comment(7, &body).await.unwrap();

    assert_eq!(id.thread_id, 12);
    create.assert_async().await;
}

#[tokio::test]
async fn forbidden_update_starts_a_new_thread() {
    let mut server = Server::new_async().await;
    let poster = poster(&server, "token");
    let old = tag_body("cdk-diff", "old diff");
    let body = tag_body("cdk-diff", "new diff");

    let _mock = server
        .mock("GET", THREADS_PATH)
        .match_query(api_version())
        .with_status(200)
        .with_body(json!({ "value": [thread_json(5, &old)] }).to_string())
        .create_async()
        .await;
    let patch = server
        .mock("PATCH", format!("{THREADS_PATH}/5/comments/1").as_str())
        .match_query(api_version())
        .with_status(403)
        .with_body(json!({"message": "You can only edit your own comments."}).to_string())
        .expect(1)
        .create_async()
        .await;
    let create = server
        .mock("POST", THREADS_PATH)
        .match_query(api_version())
        .with_status(200)
        .with_body(thread_json(13, &body).to_string())
        .expect(1)
        .create_async()
        .await;

    let id = poster.post_comment(7, &body).await.unwrap();

    assert_eq!(id.thread_id, 13);
    patch.assert_async().await;
    create.assert_async().await;
}

#[tokio::test]
async fn invalid_token_is_auth_error_without_creating_thread() {
    let mut server = Server::new_async().await;
    let poster = poster(&server, "expired");

    let _mock = server
        .mock("GET", THREADS_PATH)
        .match_query(api_version())
        .with_status(203)
        .with_header("content-type", "text/html")
        .with_body("<html>Sign in</html>")
        .create_async()
        .await;
    let create = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let result = poster.post_comment(7, "hello").await;

    assert!(matches!(result, Err(CommentError::Auth { .. })));
    create.assert_async().await;
}

#[tokio::test]
async fn forbidden_is_auth_error() {
    let mut server = Server::new_async().await;
    let poster = poster(&server, "read-only");

    let _mock = server
        .mock("GET", THREADS_PATH)
        .match_query(api_version())
        .with_status(403)
        .with_body(json!({"message": "not allowed"}).to_string())
        .create_async()
        .await;

    let result = poster.post_comment(7, "hello").await;

    assert!(matches!(result, Err(CommentError::Auth { .. })));
}

#[tokio::test]
async fn unknown_pull_request_is_not_found() {
    let mut server = Server::new_async().await;
    let poster = poster(&server, "token");

    let _mock = server
        .mock("GET", THREADS_PATH)
        .match_query(api_version())
        .with_status(404)
        .with_body(json!({"message": "TF401180: The requested pull request was not found."}).to_string())
        .create_async()
        .await;

    let result = poster.post_comment(7, "hello").await;

    assert!(matches!(result, Err(CommentError::PrNotFound { pr_id: 7 })));
}

#[tokio::test]
async fn publishes_no_changes_when_diff_output_missing() {
    let mut server = Server::new_async().await;
    let publisher = ResultPublisher::new(poster(&server, "token"), CommentRenderer::new().unwrap());
    let dir = tempfile::tempdir().unwrap();

    let _mock = server
        .mock("GET", THREADS_PATH)
        .match_query(api_version())
        .with_status(200)
        .with_body(json!({"value": []}).to_string())
        .create_async()
        .await;
    let create = server
        .mock("POST", THREADS_PATH)
        .match_query(api_version())
        .match_body(Matcher::Regex(
            "CDK Diff found no resource is going to change".into(),
        ))
        .with_status(200)
        .with_body(thread_json(20, "x").to_string())
        .expect(1)
        .create_async()
        .await;

    let id = publisher
        .publish_diff(7, &dir.path().join("output.log"))
        .await
        .unwrap();

    assert_eq!(id.thread_id, 20);
    create.assert_async().await;
}

#[tokio::test]
async fn publishes_non_empty_validation_reports() {
    let mut server = Server::new_async().await;
    let publisher = ResultPublisher::new(poster(&server, "token"), CommentRenderer::new().unwrap());

    let _mock = server
        .mock("GET", THREADS_PATH)
        .match_query(api_version())
        .with_status(200)
        .with_body(json!({"value": []}).to_string())
        .create_async()
        .await;
    let create = server
        .mock("POST", THREADS_PATH)
        .match_query(api_version())
        .match_body(Matcher::Regex(
            "validation-report:AwsSolutions-cdk-sample-repo".into(),
        ))
        .with_status(200)
        .with_body(thread_json(21, "x").to_string())
        .expect(1)
        .create_async()
        .await;

    let summary = publisher
        .publish_validation_reports(7, &fixtures_root().join("reports"))
        .await
        .unwrap();

    assert_eq!(summary.posted, ["AwsSolutions-cdk-sample-repo"]);
    assert_eq!(summary.empty, ["empty-report"]);
    assert!(!summary.has_failures());
    create.assert_async().await;
}

#[tokio::test]
async fn uploads_diagram_and_posts_link() {
    let mut server = Server::new_async().await;
    let attachment_url = format!(
        "{}/org/proj/_apis/git/repositories/repo/pullRequests/7/attachments/diagram-ahkjs.png",
        server.url()
    );
    let publisher = ResultPublisher::new(poster(&server, "token"), CommentRenderer::new().unwrap())
        .with_commit_prefix(Some("ahkjs"));
    let dir = tempfile::tempdir().unwrap();
    let diagram = dir.path().join("diagram.png");
    std::fs::write(&diagram, [0x89, b'P', b'N', b'G']).unwrap();

    let upload = server
        .mock(
            "POST",
            "/org/proj/_apis/git/repositories/repo/pullRequests/7/attachments/diagram-ahkjs.png",
        )
        .match_query(api_version())
        .match_header("content-type", "application/octet-stream")
        .with_status(201)
        .with_body(json!({ "url": attachment_url }).to_string())
        .expect(1)
        .create_async()
        .await;
    let _mock = server
        .mock("GET", THREADS_PATH)
        .match_query(api_version())
        .with_status(200)
        .with_body(json!({"value": []}).to_string())
        .create_async()
        .await;
    let create = server
        .mock("POST", THREADS_PATH)
        .match_query(api_version())
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("<img src=".into()),
            Matcher::Regex("architecture-diagram".into()),
        ]))
        .with_status(200)
        .with_body(thread_json(22, "x").to_string())
        .expect(1)
        .create_async()
        .await;

    let id = publisher.publish_diagram(7, &diagram).await.unwrap();

    assert_eq!(id.thread_id, 22);
    upload.assert_async().await;
    create.assert_async().await;
}

#[tokio::test]
async fn missing_diagram_is_error() {
    let server = Server::new_async().await;
    let publisher = ResultPublisher::new(poster(&server, "token"), CommentRenderer::new().unwrap());
    let dir = tempfile::tempdir().unwrap();

    let result = publisher
        .publish_diagram(7, &dir.path().join("diagram.png"))
        .await;

    assert!(matches!(result, Err(CommentError::MissingFile { .. })));
}
