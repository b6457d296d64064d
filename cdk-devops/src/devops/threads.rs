//! Pull request thread and attachment endpoints.
//!
//! Every call takes the pull request's own URL,
//! `{collection}/{project}/_apis/git/repositories/{repository}/pullRequests/{id}`.

use super::models::{
    Attachment, Comment, CommentThread, CommentUpdate, ListResponse, NewComment, NewThread,
};
use super::{endpoint, DevOpsClient, DevOpsError, PULL_REQUEST_API_VERSION};
use reqwest::header::CONTENT_TYPE;
use url::Url;

/// Root comments of a thread have no parent.
const ROOT_PARENT_ID: u64 = 0;

impl DevOpsClient {
    /// Lists every thread on a pull request.
    pub async fn list_threads(&self, pull_request: &Url) -> Result<Vec<CommentThread>, DevOpsError> {
        let url = endpoint(pull_request, &["threads"], PULL_REQUEST_API_VERSION)?;
        let list: ListResponse<CommentThread> = self.get_json(url).await?;
        Ok(list.value)
    }

    /// Starts a new active thread whose first comment is `content`.
    pub async fn create_thread(
        &self,
        pull_request: &Url,
        content: &str,
    ) -> Result<CommentThread, DevOpsError> {
        let url = endpoint(pull_request, &["threads"], PULL_REQUEST_API_VERSION)?;
        let body = NewThread {
            comments: [NewComment {
                parent_comment_id: ROOT_PARENT_ID,
                content,
                comment_type: "text",
            }],
            status: "active",
        };
        self.post_json(url, &body).await
    }

    /// Adds a comment to an existing thread.
    pub async fn add_comment(
        &self,
        pull_request: &Url,
        thread_id: u64,
        parent_comment_id: u64,
        content: &str,
    ) -> Result<Comment, DevOpsError> {
        let thread = thread_id.to_string();
        let url = endpoint(
            pull_request,
            &["threads", &thread, "comments"],
            PULL_REQUEST_API_VERSION,
        )?;
        let body = NewComment {
            parent_comment_id,
            content,
            comment_type: "text",
        };
        self.post_json(url, &body).await
    }

    /// Replaces the content of an existing comment.
    pub async fn update_comment(
        &self,
        pull_request: &Url,
        thread_id: u64,
        comment_id: u64,
        content: &str,
    ) -> Result<Comment, DevOpsError> {
        let thread = thread_id.to_string();
        let comment = comment_id.to_string();
        let url = endpoint(
            pull_request,
            &["threads", &thread, "comments", &comment],
            PULL_REQUEST_API_VERSION,
        )?;
        self.patch_json(url, &CommentUpdate { content }).await
    }

    /// Uploads a file as a pull request attachment.
    pub async fn upload_attachment(
        &self,
        pull_request: &Url,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<Attachment, DevOpsError> {
        let url = endpoint(
            pull_request,
            &["attachments", file_name],
            PULL_REQUEST_API_VERSION,
        )?;
        let request = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(content);

        let response = self.send(request).await?;
        super::decode(response).await
    }
}
