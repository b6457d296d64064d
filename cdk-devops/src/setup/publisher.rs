//! Pushing local sources to the new repository.

use super::StepFailure;
use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Publishes a local work tree to a remote repository.
pub trait SourcePublisher {
    /// Points `origin` of `workdir` at `remote` and pushes every branch.
    fn publish(
        &self,
        workdir: &Path,
        remote: &str,
    ) -> impl Future<Output = Result<(), StepFailure>> + Send;
}

/// Publishes with the `git` command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitPublisher;

impl SourcePublisher for GitPublisher {
    async fn publish(&self, workdir: &Path, remote: &str) -> Result<(), StepFailure> {
        run_git_command(workdir, &["remote", "set-url", "origin", remote]).await?;
        debug!(remote, "Updated origin remote");

        run_git_command(workdir, &["push", "-u", "origin", "--all"]).await?;
        info!("Pushed all branches to origin");
        Ok(())
    }
}

async fn run_git_command(path: &Path, args: &[&str]) -> Result<(), StepFailure> {
    let output = Command::new("git")
        .args(args)
        .current_dir(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| StepFailure::Git {
            message: format!("Failed to execute git {}: {e}", args.join(" ")),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(StepFailure::Git {
            message: format!("git {} failed: {}", args.join(" "), stderr.trim()),
        });
    }

    Ok(())
}
