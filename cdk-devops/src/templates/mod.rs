//! Comment body rendering using Handlebars.
//!
//! Pull request comments are rendered from the built-in templates below with
//! variable substitution and conditional logic.

mod error;
mod renderer;

pub use error::TemplateError;
pub use renderer::{create_handlebars_registry, CommentRenderer};

/// Name of the CDK diff comment template.
pub const DIFF_TEMPLATE: &str = "cdk-diff";

/// Name of the validation report comment template.
pub const REPORT_TEMPLATE: &str = "validation-report";

/// Name of the architecture diagram comment template.
pub const DIAGRAM_TEMPLATE: &str = "architecture-diagram";

/// Posted when `cdk diff` produced no output.
pub const NO_CHANGES_MESSAGE: &str = "CDK Diff found no resource is going to change";

pub(crate) const DIFF_SOURCE: &str = r#"{{#if diff}}### CDK Diff

```
{{diff}}
```
{{else}}NO_CHANGES{{/if}}"#;

pub(crate) const REPORT_SOURCE: &str = r#"### CDK Validation Report: {{name}}

{{table}}"#;

pub(crate) const DIAGRAM_SOURCE: &str = r#"### Architecture Diagram{{#if commit}} ({{commit}}){{/if}}

[Architecture Diagram]({{url}})

<img src="{{url}}" alt="Architecture Diagram">"#;
