//! Hidden markers identifying bot-maintained comment threads.
//!
//! A marker is an HTML comment appended to a comment body. It does not show
//! in the rendered markdown, but lets a later run find the thread it created
//! before and update it instead of opening another one.

use std::fmt;

const MARKER_PREFIX: &str = "<!-- cdk-devops:";
const MARKER_SUFFIX: &str = " -->";

/// Tag used when normalisation leaves nothing behind.
const FALLBACK_TAG: &str = "comment";

/// Identifies one kind of comment on a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommentMarker {
    tag: String,
}

impl CommentMarker {
    /// Creates a marker for `tag`.
    ///
    /// Whitespace runs become `-` and angle brackets are dropped, so the
    /// marker always stays a single well-formed HTML comment.
    pub fn new(tag: &str) -> Self {
        let tag = tag
            .split_whitespace()
            .map(|word| word.replace(['<', '>'], ""))
            .filter(|word| !word.is_empty())
            .collect::<Vec<_>>()
            .join("-");

        Self {
            tag: if tag.is_empty() {
                FALLBACK_TAG.to_string()
            } else {
                tag
            },
        }
    }

    /// Returns the normalised tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns the marker as it appears in a comment body.
    pub fn render(&self) -> String {
        format!("{MARKER_PREFIX}{}{MARKER_SUFFIX}", self.tag)
    }

    /// Returns true if `body` carries this marker.
    pub fn is_in(&self, body: &str) -> bool {
        find_marker(body).is_some_and(|found| found == *self)
    }

    /// Returns true if `body` ends with this marker, as [`tag_body`] leaves it.
    pub fn ends(&self, body: &str) -> bool {
        body.trim_end().ends_with(&self.render())
    }
}

impl fmt::Display for CommentMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Appends the marker for `tag` to `body` on its own line.
#[must_use]
pub fn tag_body(tag: &str, body: &str) -> String {
    let marker = CommentMarker::new(tag);
    format!("{}\n\n{}", body.trim_end(), marker.render())
}

/// Returns the first marker found in `body`.
#[must_use]
pub fn find_marker(body: &str) -> Option<CommentMarker> {
    let start = body.find(MARKER_PREFIX)? + MARKER_PREFIX.len();
    let rest = &body[start..];
    let end = rest.find(MARKER_SUFFIX)?;
    let tag = &rest[..end];

    if tag.is_empty() || tag.chars().any(char::is_whitespace) {
        return None;
    }
    Some(CommentMarker {
        tag: tag.to_string(),
    })
}
