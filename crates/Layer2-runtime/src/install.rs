//! App installation operations triggered by runtime rebuilds

use crate::model::COMPOSE_FILE;
use crate::runner::{ComposeOp, ComposeRunner};
use async_trait::async_trait;
use rtpanel_foundation::{Error, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Operation applied to an app installation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOperation {
    Rebuild,
}

impl std::fmt::Display for InstallOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstallOperation::Rebuild => f.write_str("rebuild"),
        }
    }
}

/// Installation collaborator
#[async_trait]
pub trait InstallOperator: Send + Sync {
    async fn operate(&self, install_id: u64, op: InstallOperation) -> Result<()>;
}

/// Operates installations laid out as `<appsDir>/<installId>/docker-compose.yml`
pub struct ComposeInstallOperator {
    apps_dir: PathBuf,
    runner: Arc<dyn ComposeRunner>,
}

impl ComposeInstallOperator {
    pub fn new(apps_dir: impl Into<PathBuf>, runner: Arc<dyn ComposeRunner>) -> Self {
        Self {
            apps_dir: apps_dir.into(),
            runner,
        }
    }

    fn install_dir(&self, install_id: u64) -> PathBuf {
        self.apps_dir.join(install_id.to_string())
    }
}

#[async_trait]
impl InstallOperator for ComposeInstallOperator {
    async fn operate(&self, install_id: u64, op: InstallOperation) -> Result<()> {
        let dir = self.install_dir(install_id);
        let compose = dir.join(COMPOSE_FILE);
        if !compose.exists() {
            return Err(Error::Install {
                install_id,
                message: format!("{} not found", compose.display()),
            });
        }
        let log = dir.join(format!("{}.log", op));
        info!("Running {} on install {}", op, install_id);

        let steps: &[ComposeOp] = match op {
            InstallOperation::Rebuild => &[ComposeOp::Down, ComposeOp::Up],
        };
        for step in steps {
            self.runner
                .run(*step, &compose, &log)
                .await
                .map_err(|e| Error::Install {
                    install_id,
                    message: e.to_string(),
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingRunner;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_rebuild_runs_down_then_up() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("12")).unwrap();
        std::fs::write(dir.path().join("12").join(COMPOSE_FILE), "services: {}\n").unwrap();

        let runner = Arc::new(RecordingRunner::new());
        let operator = ComposeInstallOperator::new(dir.path(), runner.clone());
        operator.operate(12, InstallOperation::Rebuild).await.unwrap();

        assert_eq!(runner.verbs(), vec!["down", "up"]);
    }

    #[tokio::test]
    async fn test_missing_install_dir() {
        let dir = tempdir().unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let operator = ComposeInstallOperator::new(dir.path(), runner.clone());

        let err = operator.operate(5, InstallOperation::Rebuild).await.unwrap_err();
        assert!(matches!(err, Error::Install { install_id: 5, .. }));
        assert!(runner.verbs().is_empty());
    }
}
