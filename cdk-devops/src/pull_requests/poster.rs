//! Posting and updating pull request comment threads.

use super::marker::{find_marker, CommentMarker};
use super::{CommentError, PullRequestContext};
use crate::devops::models::{Comment, CommentThread};
use crate::devops::{join_segments, Credential, DevOpsClient, DevOpsError};
use serde::Serialize;
use tracing::{debug, error, info, info_span, warn, Instrument};
use url::Url;

/// Root comment of every thread.
const ROOT_COMMENT_ID: u64 = 1;

/// A comment to post on a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestComment {
    /// Pull request number.
    pub pr_id: u64,
    /// Thread to reply into; `None` starts or updates a tagged thread.
    pub thread_id: Option<u64>,
    /// Markdown body.
    pub body: String,
    /// Comment being replied to; defaults to the thread's root comment.
    pub parent_comment_id: Option<u64>,
}

impl PullRequestComment {
    /// Creates a top-level comment.
    pub fn new(pr_id: u64, body: impl Into<String>) -> Self {
        Self {
            pr_id,
            thread_id: None,
            body: body.into(),
            parent_comment_id: None,
        }
    }

    /// Turns this comment into a reply on `thread_id`.
    #[must_use]
    pub fn in_thread(mut self, thread_id: u64) -> Self {
        self.thread_id = Some(thread_id);
        self
    }
}

/// Location of a posted comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommentId {
    pub thread_id: u64,
    pub comment_id: u64,
}

/// Posts comments on the pull requests of one repository.
#[derive(Debug, Clone)]
pub struct CommentPoster {
    client: DevOpsClient,
    repository: Url,
}

impl CommentPoster {
    /// Creates a poster for the repository at `repository`,
    /// `{collection}/{project}/_apis/git/repositories/{id}`.
    pub fn new(client: DevOpsClient, repository: Url) -> Self {
        Self { client, repository }
    }

    /// Creates a poster authenticated with the pipeline's access token.
    ///
    /// # Errors
    ///
    /// Returns [`CommentError`] if the repository URL cannot be built or the
    /// HTTP client fails to initialise.
    pub fn from_context(context: &PullRequestContext) -> Result<Self, CommentError> {
        let repository = context.repository_url()?;
        let client = DevOpsClient::new(Credential::Bearer(context.access_token().to_string()))
            .map_err(CommentError::Api)?;
        Ok(Self::new(client, repository))
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &DevOpsClient {
        &self.client
    }

    /// Returns the URL of pull request `pr_id`.
    ///
    /// # Errors
    ///
    /// Fails if the repository URL cannot carry a path.
    pub fn pull_request_url(&self, pr_id: u64) -> Result<Url, CommentError> {
        let id = pr_id.to_string();
        join_segments(&self.repository, &["pullRequests", &id]).map_err(CommentError::Api)
    }

    /// Posts `body` on pull request `pr_id`.
    ///
    /// Existing threads are looked up first. When `body` carries a marker and
    /// an open thread's root comment ends with the same one, that comment is
    /// updated in place; otherwise a new active thread is started. A body
    /// identical to the existing comment is left alone. If the update is
    /// forbidden, the comment is not ours to edit and a new thread is started.
    ///
    /// # Errors
    ///
    /// * [`CommentError::Auth`] if the token is rejected. The lookup runs
    ///   first, so no thread is created with a bad token.
    /// * [`CommentError::PrNotFound`] if the pull request does not exist.
    /// * [`CommentError::Api`] for any other API failure.
    pub async fn post_comment(&self, pr_id: u64, body: &str) -> Result<CommentId, CommentError> {
        let marker = find_marker(body);
        let span = info_span!(
            "post_comment",
            pr_id,
            tag = marker.as_ref().map(CommentMarker::tag).unwrap_or_default()
        );

        async {
            let pull_request = self.pull_request_url(pr_id)?;

            let threads = self
                .client
                .list_threads(&pull_request)
                .await
                .map_err(|e| log_failure(CommentError::from_api(e, pr_id)))?;
            debug!(count = threads.len(), "Fetched existing threads");

            if let Some((thread, comment)) = marker
                .as_ref()
                .and_then(|marker| find_tagged_comment(&threads, marker))
            {
                let id = CommentId {
                    thread_id: thread.id,
                    comment_id: comment.id,
                };

                if comment.content.as_deref() == Some(body) {
                    info!(thread_id = id.thread_id, "Comment already up to date");
                    return Ok(id);
                }

                match self
                    .client
                    .update_comment(&pull_request, id.thread_id, id.comment_id, body)
                    .await
                {
                    Ok(_) => {
                        info!(
                            thread_id = id.thread_id,
                            comment_id = id.comment_id,
                            "Updated existing comment"
                        );
                        return Ok(id);
                    }
                    Err(DevOpsError::Forbidden { message }) => {
                        warn!(
                            thread_id = id.thread_id,
                            reason = %message,
                            "Cannot edit tagged comment, starting a new thread"
                        );
                    }
                    Err(e) => return Err(log_failure(CommentError::from_api(e, pr_id))),
                }
            }

            let thread = self
                .client
                .create_thread(&pull_request, body)
                .await
                .map_err(|e| log_failure(CommentError::from_api(e, pr_id)))?;
            let id = CommentId {
                thread_id: thread.id,
                comment_id: thread
                    .root_comment()
                    .map_or(ROOT_COMMENT_ID, |comment| comment.id),
            };
            info!(thread_id = id.thread_id, "Created comment thread");
            Ok(id)
        }
        .instrument(span)
        .await
    }

    /// Posts `comment` as a reply into its thread.
    ///
    /// # Errors
    ///
    /// Returns [`CommentError::MissingThread`] if `comment` has no thread id,
    /// otherwise the same errors as [`CommentPoster::post_comment`].
    pub async fn reply(&self, comment: &PullRequestComment) -> Result<CommentId, CommentError> {
        let thread_id = comment.thread_id.ok_or(CommentError::MissingThread {
            pr_id: comment.pr_id,
        })?;
        let parent = comment.parent_comment_id.unwrap_or(ROOT_COMMENT_ID);
        let span = info_span!("reply", pr_id = comment.pr_id, thread_id, parent);

        async {
            let pull_request = self.pull_request_url(comment.pr_id)?;
            let created = self
                .client
                .add_comment(&pull_request, thread_id, parent, &comment.body)
                .await
                .map_err(|e| log_failure(CommentError::from_api(e, comment.pr_id)))?;
            info!(comment_id = created.id, "Posted reply");

            Ok(CommentId {
                thread_id,
                comment_id: created.id,
            })
        }
        .instrument(span)
        .await
    }

    /// Posts `comment`, replying when it names a thread.
    ///
    /// # Errors
    ///
    /// See [`CommentPoster::post_comment`] and [`CommentPoster::reply`].
    pub async fn submit(&self, comment: &PullRequestComment) -> Result<CommentId, CommentError> {
        match comment.thread_id {
            Some(_) => self.reply(comment).await,
            None => self.post_comment(comment.pr_id, &comment.body).await,
        }
    }
}

/// Finds the open thread whose root comment ends with `marker`.
fn find_tagged_comment<'a>(
    threads: &'a [CommentThread],
    marker: &CommentMarker,
) -> Option<(&'a CommentThread, &'a Comment)> {
    threads
        .iter()
        .filter(|thread| thread.is_open())
        .find_map(|thread| {
            let root = thread.root_comment()?;
            let content = root.content.as_deref()?;
            marker.ends(content).then_some((thread, root))
        })
}

fn log_failure(error: CommentError) -> CommentError {
    error!(error = %error, "Failed to post pull request comment");
    error
}
