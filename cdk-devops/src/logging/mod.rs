//! Logging facility.
//!
//! The logger is built from an explicit [`LoggingOptions`] value and handed
//! to the process by the entry point, so library code only emits `tracing`
//! events and never configures output itself.

mod error;
mod level;

pub use error::LoggingError;
pub use level::{LogLevel, UnknownLogLevel};

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{warn, Dispatch};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding the log level name.
pub const LOG_LEVEL_ENV: &str = "AZURE_PIPELINES_LOG_LEVEL";

/// Log file used when file output is enabled without an explicit path.
pub const DEFAULT_LOG_FILE: &str = "cdk-devops.log";

/// Where and how verbosely to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingOptions {
    /// Minimum severity that is emitted.
    pub level: LogLevel,
    /// File to append to when `file_output` is set.
    pub log_file: Option<PathBuf>,
    /// Write events to stdout.
    pub console_output: bool,
    /// Append events to `log_file`.
    pub file_output: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            log_file: None,
            console_output: true,
            file_output: false,
        }
    }
}

impl LoggingOptions {
    /// Builds options from `AZURE_PIPELINES_LOG_LEVEL`.
    ///
    /// Unset or unrecognised values fall back to [`LogLevel::Info`]; an
    /// unrecognised value is reported once the logger built from these
    /// options is installed.
    pub fn from_env() -> Self {
        let (options, _) = Self::from_env_checked();
        options
    }

    fn from_env_checked() -> (Self, Option<UnknownLogLevel>) {
        let (level, rejected) = match std::env::var(LOG_LEVEL_ENV) {
            Ok(raw) => match raw.parse::<LogLevel>() {
                Ok(level) => (level, None),
                Err(e) => (LogLevel::Info, Some(e)),
            },
            Err(_) => (LogLevel::Info, None),
        };

        (
            Self {
                level,
                ..Self::default()
            },
            rejected,
        )
    }

    /// Overrides the level.
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Enables file output to `path`.
    #[must_use]
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self.file_output = true;
        self
    }

    /// Returns the file events are appended to, if file output is enabled.
    pub fn effective_log_file(&self) -> Option<&Path> {
        if !self.file_output {
            return None;
        }
        Some(
            self.log_file
                .as_deref()
                .unwrap_or_else(|| Path::new(DEFAULT_LOG_FILE)),
        )
    }

    /// Builds a logger from these options.
    ///
    /// # Errors
    ///
    /// Returns [`LoggingError::LogFile`] if the log file cannot be opened.
    pub fn build(&self) -> Result<Logger, LoggingError> {
        let filter =
            EnvFilter::default().add_directive(LevelFilter::from_level(self.level.as_tracing_level()).into());

        let console = self
            .console_output
            .then(|| fmt::layer().compact().with_target(false));

        let file = match self.effective_log_file() {
            Some(path) => {
                let handle = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| LoggingError::LogFile {
                        path: path.display().to_string(),
                        source: e,
                    })?;
                Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(handle)))
            }
            None => None,
        };

        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .with(file);

        Ok(Logger {
            dispatch: Dispatch::new(subscriber),
            level: self.level,
        })
    }
}

/// A configured logger, ready to be installed or scoped.
#[derive(Clone)]
pub struct Logger {
    dispatch: Dispatch,
    level: LogLevel,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger").field("level", &self.level).finish()
    }
}

impl Logger {
    /// Returns the level this logger filters at.
    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Returns the underlying dispatcher.
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Installs this logger as the process-wide default.
    ///
    /// # Errors
    ///
    /// Returns [`LoggingError::AlreadyInstalled`] if called twice.
    pub fn install(self) -> Result<(), LoggingError> {
        tracing::dispatcher::set_global_default(self.dispatch)?;
        Ok(())
    }

    /// Runs `f` with this logger as the current thread's default.
    pub fn scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}

/// Builds options from the environment and installs the resulting logger.
///
/// # Errors
///
/// Fails if the log file cannot be opened or a logger is already installed.
pub fn init_from_env(log_file: Option<PathBuf>) -> Result<LogLevel, LoggingError> {
    let (mut options, rejected) = LoggingOptions::from_env_checked();
    if let Some(path) = log_file {
        options = options.with_log_file(path);
    }

    let logger = options.build()?;
    let level = logger.level();
    logger.install()?;

    if let Some(UnknownLogLevel(raw)) = rejected {
        warn!(value = %raw, variable = LOG_LEVEL_ENV, "Unknown log level, using INFO");
    }

    Ok(level)
}
