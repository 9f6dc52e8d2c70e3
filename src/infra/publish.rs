//! Git-backed publishing of stored uploads.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::application::uploads::UploadPublisher;
use crate::config::PublishSettings;
use crate::infra::error::InfraError;

/// Commits a single file and pushes it to the configured remote branch.
#[derive(Debug, Clone)]
pub struct GitPublisher {
    git_path: PathBuf,
    repository_dir: PathBuf,
    remote: String,
    branch: String,
}

impl GitPublisher {
    pub fn new(
        git_path: impl Into<PathBuf>,
        repository_dir: impl Into<PathBuf>,
        remote: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            git_path: git_path.into(),
            repository_dir: repository_dir.into(),
            remote: remote.into(),
            branch: branch.into(),
        }
    }

    pub fn from_settings(settings: &PublishSettings) -> Self {
        Self::new(
            settings.git_path.clone(),
            settings.repository_dir.clone(),
            settings.remote.clone(),
            settings.branch.clone(),
        )
    }

    async fn git(&self, step: &'static str, args: &[&str]) -> Result<String, InfraError> {
        debug!(target = "florette::publish", step, ?args, "running git");
        let output = Command::new(&self.git_path)
            .current_dir(&self.repository_dir)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| InfraError::publish(step, err.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("git exited with {}", output.status)
            } else {
                stderr
            };
            return Err(InfraError::publish(step, message));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl UploadPublisher for GitPublisher {
    async fn publish(
        &self,
        absolute_path: &Path,
        message: &str,
    ) -> Result<Option<String>, InfraError> {
        let path = tokio::fs::canonicalize(absolute_path)
            .await
            .map_err(|err| InfraError::publish("resolve", err.to_string()))?;
        let path = path
            .to_str()
            .ok_or_else(|| InfraError::publish("resolve", "path is not valid UTF-8"))?;

        self.git("add", &["add", "--", path]).await?;
        self.git("commit", &["commit", "--quiet", "-m", message, "--", path])
            .await?;
        let commit = self.git("rev-parse", &["rev-parse", "HEAD"]).await?;
        let refspec = format!("HEAD:{}", self.branch);
        self.git("push", &["push", "--quiet", &self.remote, &refspec])
            .await?;

        Ok(Some(commit).filter(|commit| !commit.is_empty()))
    }
}
