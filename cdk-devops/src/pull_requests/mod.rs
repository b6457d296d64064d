//! Pull request comments posted from Azure Pipelines runs.
//!
//! [`CommentPoster`] talks to the thread API of one repository. Comments
//! tagged with a [`CommentMarker`] are kept to a single thread per tag:
//! posting again updates the thread rather than adding a new one.
//! [`ResultPublisher`] builds on it to publish `cdk diff` output, validation
//! reports and the architecture diagram.

mod context;
mod error;
pub mod marker;
mod poster;
mod publish;
mod reports;

pub use context::{PullRequestContext, PULL_REQUEST_ID_VAR};
pub use error::{CommentError, ContextError};
pub use marker::{find_marker, tag_body, CommentMarker};
pub use poster::{CommentId, CommentPoster, PullRequestComment};
pub use publish::{ReportSummary, ResultPublisher, DIAGRAM_TAG, DIFF_TAG, REPORT_TAG_PREFIX};
pub use reports::{csv_to_markdown, list_reports, read_output_file};
