//! Environment configuration loading.
//!
//! Each deployment environment is described by a JSON file named after it,
//! e.g. `config/dev.json`:
//!
//! ```json
//! { "account": "111", "region": "eu-central-1", "serviceConnection": "conn-a" }
//! ```

mod config;
mod error;

pub use config::EnvironmentConfig;
pub use error::EnvironmentError;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Directory searched by [`load_environment`].
pub const DEFAULT_CONFIG_DIR: &str = "config";

/// Loads `config/<name>.json` relative to the current directory.
///
/// # Errors
///
/// Returns [`EnvironmentError::NotFound`] if no file exists for `name` and
/// [`EnvironmentError::Parse`] if the file is malformed.
pub fn load_environment(name: &str) -> Result<EnvironmentConfig, EnvironmentError> {
    EnvironmentLoader::default().load(name)
}

/// Loads environment configurations from a directory of JSON files.
#[derive(Debug, Clone)]
pub struct EnvironmentLoader {
    config_dir: PathBuf,
}

impl Default for EnvironmentLoader {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_DIR)
    }
}

impl EnvironmentLoader {
    /// Creates a loader reading from `config_dir`.
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Returns the directory this loader reads from.
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Loads the configuration for a single environment.
    ///
    /// # Errors
    ///
    /// Returns [`EnvironmentError::NotFound`] when the file is missing or the
    /// name cannot be a file stem, [`EnvironmentError::Parse`] on malformed
    /// JSON and [`EnvironmentError::Io`] on other read failures.
    pub fn load(&self, name: &str) -> Result<EnvironmentConfig, EnvironmentError> {
        let path = self.config_dir.join(format!("{name}.json"));
        debug!(environment = name, path = %path.display(), "Loading environment");

        let result = self.read(name, &path);
        if let Err(e) = &result {
            error!(environment = name, error = %e, "Failed to load config file");
        }
        result
    }

    fn read(&self, name: &str, path: &Path) -> Result<EnvironmentConfig, EnvironmentError> {
        if !is_valid_name(name) {
            return Err(EnvironmentError::NotFound {
                environment: name.to_string(),
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EnvironmentError::NotFound {
                    environment: name.to_string(),
                    path: path.display().to_string(),
                }
            } else {
                EnvironmentError::Io {
                    path: path.display().to_string(),
                    source: e,
                }
            }
        })?;

        serde_json::from_str(&content).map_err(|e| EnvironmentError::Parse {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Lists the environments that have a configuration file, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`EnvironmentError::Io`] if the directory cannot be read.
    pub fn available(&self) -> Result<Vec<String>, EnvironmentError> {
        let entries = std::fs::read_dir(&self.config_dir).map_err(|e| EnvironmentError::Io {
            path: self.config_dir.display().to_string(),
            source: e,
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| EnvironmentError::Io {
                path: self.config_dir.display().to_string(),
                source: e,
            })?;

            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    /// Loads every environment in the directory, keyed by name.
    ///
    /// # Errors
    ///
    /// Fails on the first environment that cannot be loaded.
    pub fn load_all(&self) -> Result<BTreeMap<String, EnvironmentConfig>, EnvironmentError> {
        let mut environments = BTreeMap::new();
        for name in self.available()? {
            let config = self.load(&name)?;
            environments.insert(name, config);
        }

        info!(count = environments.len(), "Loaded environments");
        Ok(environments)
    }
}

/// Environment names double as file stems and must not escape the directory.
fn is_valid_name(name: &str) -> bool {
    !name.trim().is_empty() && !name.contains(['/', '\\']) && name != ".." && name != "."
}
