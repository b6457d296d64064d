#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

pub mod devops;
pub mod environment;
pub mod logging;
pub mod pull_requests;
pub mod settings;
pub mod setup;
pub mod templates;

pub use devops::{Credential, DevOpsClient, DevOpsError};
pub use environment::{load_environment, EnvironmentConfig, EnvironmentError, EnvironmentLoader};
pub use logging::{init_from_env, LogLevel, Logger, LoggingError, LoggingOptions};
pub use pull_requests::{
    find_marker, read_output_file, tag_body, CommentError, CommentId, CommentMarker,
    CommentPoster, ContextError, PullRequestComment, PullRequestContext, ReportSummary,
    ResultPublisher,
};
pub use settings::{ProjectSettings, SettingsError};
pub use setup::{
    GitPublisher, RepoSetup, SetupError, SetupRequest, SetupResult, SetupStep, SourcePublisher,
    StepFailure, StepOutcome,
};
pub use templates::{create_handlebars_registry, CommentRenderer, TemplateError};
