//! Installing the git pre-commit hook.

use super::{StepFailure, StepOutcome};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Identifies hooks written by this tool.
const HOOK_SIGNATURE: &str = "# installed by cdk-devops";

const HOOK_SCRIPT: &str = r#"#!/bin/sh
# installed by cdk-devops
# Runs the checks in .pre-commit-config.yaml before every commit.
if ! command -v pre-commit >/dev/null 2>&1; then
    echo "pre-commit is not installed. Install it with: pip install pre-commit" >&2
    exit 1
fi
exec pre-commit run --hook-stage pre-commit
"#;

/// Returns where the pre-commit hook of `workdir` lives.
#[must_use]
pub fn hook_path(workdir: &Path) -> PathBuf {
    workdir.join(".git").join("hooks").join("pre-commit")
}

/// Writes the pre-commit hook into `workdir`.
///
/// An identical hook is left untouched. A hook this tool did not write is
/// never overwritten.
///
/// # Errors
///
/// Returns [`StepFailure`] if `workdir` is not a git work tree or the hook
/// cannot be written.
pub async fn install_pre_commit_hook(workdir: &Path) -> Result<StepOutcome, StepFailure> {
    let git_dir = workdir.join(".git");
    if !git_dir.is_dir() {
        return Err(StepFailure::Git {
            message: format!("{} is not a git work tree", workdir.display()),
        });
    }

    let path = hook_path(workdir);
    let io_error = |source| StepFailure::Io {
        path: path.display().to_string(),
        source,
    };

    match tokio::fs::read_to_string(&path).await {
        Ok(existing) if existing == HOOK_SCRIPT => {
            info!(path = %path.display(), "Pre-commit hook already installed");
            return Ok(StepOutcome::skipped("hook already installed"));
        }
        Ok(existing) if !existing.contains(HOOK_SIGNATURE) => {
            warn!(path = %path.display(), "Leaving existing pre-commit hook in place");
            return Ok(StepOutcome::skipped("a different pre-commit hook exists"));
        }
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_error(e)),
    }

    if let Some(hooks_dir) = path.parent() {
        tokio::fs::create_dir_all(hooks_dir).await.map_err(io_error)?;
    }
    tokio::fs::write(&path, HOOK_SCRIPT).await.map_err(io_error)?;
    make_executable(&path).await.map_err(io_error)?;

    info!(path = %path.display(), "Installed pre-commit hook");
    Ok(StepOutcome::Completed)
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
