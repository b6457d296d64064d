//! Template renderer.

use super::{
    TemplateError, DIAGRAM_SOURCE, DIAGRAM_TEMPLATE, DIFF_SOURCE, DIFF_TEMPLATE,
    NO_CHANGES_MESSAGE, REPORT_SOURCE, REPORT_TEMPLATE,
};
use handlebars::{no_escape, Handlebars};
use serde_json::{json, Value};

/// Creates a Handlebars registry for markdown comment bodies.
///
/// Output is not HTML-escaped, since comment bodies are markdown and may
/// embed `<img>` tags. Strict mode turns a missing variable into an error
/// instead of an empty string.
#[must_use]
pub fn create_handlebars_registry() -> Handlebars<'static> {
    let mut hbs = Handlebars::new();
    hbs.register_escape_fn(no_escape);
    hbs.set_strict_mode(true);
    hbs
}

/// Renders pull request comment bodies.
#[derive(Debug)]
pub struct CommentRenderer {
    handlebars: Handlebars<'static>,
}

impl CommentRenderer {
    /// Creates a renderer with the built-in comment templates registered.
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in template fails to compile.
    pub fn new() -> Result<Self, TemplateError> {
        let mut handlebars = create_handlebars_registry();
        let diff_source = DIFF_SOURCE.replace("NO_CHANGES", NO_CHANGES_MESSAGE);
        handlebars.register_template_string(DIFF_TEMPLATE, diff_source)?;
        handlebars.register_template_string(REPORT_TEMPLATE, REPORT_SOURCE)?;
        handlebars.register_template_string(DIAGRAM_TEMPLATE, DIAGRAM_SOURCE)?;
        Ok(Self { handlebars })
    }

    /// Renders the `cdk diff` comment.
    ///
    /// Missing or blank output renders the no-changes message.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn render_diff(&self, output: Option<&str>) -> Result<String, TemplateError> {
        let diff = output.map(str::trim_end).filter(|o| !o.trim().is_empty());
        self.render(DIFF_TEMPLATE, &json!({ "diff": diff }))
    }

    /// Renders a validation report comment around a markdown table.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn render_report(&self, name: &str, table: &str) -> Result<String, TemplateError> {
        self.render(REPORT_TEMPLATE, &json!({ "name": name, "table": table }))
    }

    /// Renders the architecture diagram comment for an uploaded image.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn render_diagram(&self, url: &str, commit: Option<&str>) -> Result<String, TemplateError> {
        self.render(DIAGRAM_TEMPLATE, &json!({ "url": url, "commit": commit }))
    }

    fn render(&self, name: &str, data: &Value) -> Result<String, TemplateError> {
        Ok(self.handlebars.render(name, data)?)
    }
}
