//! Publishing CDK pipeline results as pull request comments.

use super::marker::tag_body;
use super::reports::{csv_to_markdown, list_reports, read_output_file};
use super::{CommentError, CommentId, CommentPoster};
use crate::templates::CommentRenderer;
use serde::Serialize;
use std::path::Path;
use tracing::{error, info, info_span, warn, Instrument};

/// Tag of the CDK diff comment.
pub const DIFF_TAG: &str = "cdk-diff";

/// Tag prefix of validation report comments, followed by the report name.
pub const REPORT_TAG_PREFIX: &str = "validation-report";

/// Tag of the architecture diagram comment.
pub const DIAGRAM_TAG: &str = "architecture-diagram";

/// Result of publishing a directory of validation reports.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    /// Reports posted or updated.
    pub posted: Vec<String>,
    /// Reports with no rows.
    pub empty: Vec<String>,
    /// Reports that could not be read or posted.
    pub failed: Vec<String>,
}

impl ReportSummary {
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Renders CDK outputs and posts them through a [`CommentPoster`].
#[derive(Debug)]
pub struct ResultPublisher {
    poster: CommentPoster,
    renderer: CommentRenderer,
    commit_prefix: Option<String>,
}

impl ResultPublisher {
    pub fn new(poster: CommentPoster, renderer: CommentRenderer) -> Self {
        Self {
            poster,
            renderer,
            commit_prefix: None,
        }
    }

    /// Returns the poster comments go through.
    pub fn poster(&self) -> &CommentPoster {
        &self.poster
    }

    /// Names uploaded attachments after `prefix`, usually the first
    /// characters of the commit being built.
    #[must_use]
    pub fn with_commit_prefix(mut self, prefix: Option<&str>) -> Self {
        self.commit_prefix = prefix.map(str::to_string);
        self
    }

    /// Posts the `cdk diff` output found at `output_file`.
    ///
    /// A missing or blank file posts the "no changes" message.
    ///
    /// # Errors
    ///
    /// Returns [`CommentError`] if the file cannot be read or posting fails.
    pub async fn publish_diff(
        &self,
        pr_id: u64,
        output_file: &Path,
    ) -> Result<CommentId, CommentError> {
        let span = info_span!("publish_diff", pr_id, file = %output_file.display());

        async {
            let output = read_output_file(output_file).await?;
            let body = self.renderer.render_diff(output.as_deref())?;
            self.poster
                .post_comment(pr_id, &tag_body(DIFF_TAG, &body))
                .await
        }
        .instrument(span)
        .await
    }

    /// Posts each non-empty CSV report in `dir` as its own comment.
    ///
    /// A report that fails is logged and skipped. Authentication and
    /// missing pull request errors stop the run since every later report
    /// would fail the same way.
    ///
    /// # Errors
    ///
    /// Returns [`CommentError`] if `dir` cannot be listed or an error above
    /// stops the run.
    pub async fn publish_validation_reports(
        &self,
        pr_id: u64,
        dir: &Path,
    ) -> Result<ReportSummary, CommentError> {
        let span = info_span!("publish_validation_reports", pr_id, dir = %dir.display());

        async {
            let mut summary = ReportSummary::default();

            for path in list_reports(dir).await? {
                let name = path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default();

                match self.publish_report(pr_id, &name, &path).await {
                    Ok(Some(id)) => {
                        info!(report = %name, thread_id = id.thread_id, "Posted validation report");
                        summary.posted.push(name);
                    }
                    Ok(None) => {
                        info!(report = %name, "Validation report is empty, skipping");
                        summary.empty.push(name);
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        error!(report = %name, error = %e, "Failed to post validation report");
                        summary.failed.push(name);
                    }
                }
            }

            if summary.posted.is_empty() && summary.empty.is_empty() && summary.failed.is_empty() {
                warn!("No validation reports found");
            }
            Ok(summary)
        }
        .instrument(span)
        .await
    }

    async fn publish_report(
        &self,
        pr_id: u64,
        name: &str,
        path: &Path,
    ) -> Result<Option<CommentId>, CommentError> {
        let content = tokio::fs::read(path).await.map_err(|source| CommentError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let table = csv_to_markdown(content.as_slice()).map_err(|source| CommentError::Csv {
            path: path.display().to_string(),
            source,
        })?;
        let Some(table) = table else {
            return Ok(None);
        };

        let body = self.renderer.render_report(name, &table)?;
        let tag = format!("{REPORT_TAG_PREFIX}:{name}");
        self.poster
            .post_comment(pr_id, &tag_body(&tag, &body))
            .await
            .map(Some)
    }

    /// Uploads the architecture diagram at `diagram` and posts a comment
    /// linking to it.
    ///
    /// # Errors
    ///
    /// Returns [`CommentError::MissingFile`] if the diagram does not exist,
    /// or any upload or posting error.
    pub async fn publish_diagram(
        &self,
        pr_id: u64,
        diagram: &Path,
    ) -> Result<CommentId, CommentError> {
        let span = info_span!("publish_diagram", pr_id, file = %diagram.display());

        async {
            if !diagram.is_file() {
                let err = CommentError::MissingFile {
                    path: diagram.display().to_string(),
                };
                error!(error = %err, "Architecture diagram not found");
                return Err(err);
            }

            let content = tokio::fs::read(diagram)
                .await
                .map_err(|source| CommentError::Io {
                    path: diagram.display().to_string(),
                    source,
                })?;

            let file_name = match &self.commit_prefix {
                Some(prefix) => format!("diagram-{prefix}.png"),
                None => "diagram.png".to_string(),
            };

            let pull_request = self.poster.pull_request_url(pr_id)?;
            let attachment = self
                .poster
                .client()
                .upload_attachment(&pull_request, &file_name, content)
                .await
                .map_err(|e| CommentError::from_api(e, pr_id))?;
            info!(url = %attachment.url, "Uploaded architecture diagram");

            let body = self
                .renderer
                .render_diagram(&attachment.url, self.commit_prefix.as_deref())?;
            self.poster
                .post_comment(pr_id, &tag_body(DIAGRAM_TAG, &body))
                .await
        }
        .instrument(span)
        .await
    }
}
