//! Comment template errors.

/// A comment body could not be produced from its template.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// A built-in comment template failed to compile.
    #[error("Invalid comment template: {0}")]
    Compile(#[from] handlebars::TemplateError),

    /// Rendering a comment body failed, usually a missing variable.
    #[error("Failed to render comment body: {0}")]
    Render(#[from] handlebars::RenderError),
}
