//! Runtime service - the operations exposed to callers

use crate::docker::{DockerConnector, ImageClientFactory};
use crate::envfile::DotenvCodec;
use crate::fileop::LocalFileOp;
use crate::install::ComposeInstallOperator;
use crate::model::{Runtime, RuntimeCreate, RuntimeStatus, RuntimeType};
use crate::orchestrator::LifecycleOrchestrator;
use crate::params::ParamMerger;
use crate::provisioner::{Provisioned, RuntimeProvisioner};
use crate::repo::{JsonRuntimeRepo, JsonWebsiteRepo, RuntimeRepo};
use crate::runner::{ComposeRunner, ProcessRunner};
use crate::task::RuntimeTask;
use rtpanel_foundation::{Error, PanelConfig, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub struct RuntimeService {
    runtimes: Arc<dyn RuntimeRepo>,
    images: Arc<dyn ImageClientFactory>,
    orchestrator: LifecycleOrchestrator,
    provisioner: RuntimeProvisioner,
}

impl RuntimeService {
    pub fn new(
        runtimes: Arc<dyn RuntimeRepo>,
        images: Arc<dyn ImageClientFactory>,
        orchestrator: LifecycleOrchestrator,
        provisioner: RuntimeProvisioner,
    ) -> Self {
        Self {
            runtimes,
            images,
            orchestrator,
            provisioner,
        }
    }

    /// Wire the default collaborators from a panel config
    pub fn from_config(config: &PanelConfig) -> Self {
        let data_dir = config.data_dir();
        let runner: Arc<dyn ComposeRunner> = Arc::new(ProcessRunner::new(config.compose_command()));
        let runtimes: Arc<dyn RuntimeRepo> = Arc::new(JsonRuntimeRepo::new(&data_dir));
        let images: Arc<dyn ImageClientFactory> = Arc::new(DockerConnector);
        let file_op = Arc::new(LocalFileOp);

        let orchestrator = LifecycleOrchestrator::new(
            Arc::clone(&runner),
            Arc::clone(&runtimes),
            Arc::new(JsonWebsiteRepo::new(&data_dir)),
            Arc::clone(&images),
            Arc::new(ComposeInstallOperator::new(config.apps_dir(), runner)),
        );
        let provisioner = RuntimeProvisioner::new(
            config.runtime_dir(),
            file_op.clone(),
            ParamMerger::new(file_op, Arc::new(DotenvCodec)),
            Arc::clone(&runtimes),
            orchestrator.clone(),
        );
        Self::new(runtimes, images, orchestrator, provisioner)
    }

    /// Provision a runtime from `<template>/<version>`
    pub fn create(&self, create: &RuntimeCreate, version_dir: &Path) -> Result<Provisioned> {
        self.provisioner.provision(create, version_dir)
    }

    /// Rebuild a PHP runtime's image and cascade to its installations
    pub async fn rebuild(&self, id: u64) -> Result<RuntimeTask> {
        let mut runtime = self.runtimes.get(id)?;
        if runtime.kind != RuntimeType::Php {
            return Err(Error::InvalidInput(format!(
                "runtime {} is a {} runtime; only php images are rebuilt",
                runtime.name, runtime.kind
            )));
        }

        runtime.begin(RuntimeStatus::Building)?;
        let old_image_id = self.current_image_id(&runtime).await;
        self.runtimes.save(&runtime)?;
        info!("Rebuilding runtime [{}]", runtime.name);
        Ok(self.orchestrator.spawn_build(runtime, old_image_id, true))
    }

    /// Stop and start a runtime's containers
    pub fn recreate(&self, id: u64) -> Result<RuntimeTask> {
        let mut runtime = self.runtimes.get(id)?;
        runtime.begin(RuntimeStatus::Starting)?;
        self.runtimes.save(&runtime)?;
        info!("Recreating runtime [{}]", runtime.name);
        Ok(self.orchestrator.spawn_recreate(runtime))
    }

    pub fn get(&self, id: u64) -> Result<Runtime> {
        self.runtimes.get(id)
    }

    pub fn list(&self) -> Result<Vec<Runtime>> {
        self.runtimes.list()
    }

    /// Empty when the image cannot be resolved; the rebuild then skips cleanup
    async fn current_image_id(&self, runtime: &Runtime) -> String {
        let client = match self.images.new_client() {
            Ok(client) => client,
            Err(e) => {
                warn!("Cannot resolve image for [{}]: {}", runtime.name, e);
                return String::new();
            }
        };
        match client.image_id_by_name(&runtime.image).await {
            Ok(id) => id,
            Err(e) => {
                warn!("Cannot resolve image {}: {}", runtime.image, e);
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        website, FakeImages, MemoryRuntimeRepo, MemoryWebsiteRepo, RecordingInstalls,
        RecordingRunner,
    };
    use tempfile::tempdir;

    struct Setup {
        runtimes: Arc<MemoryRuntimeRepo>,
        runner: Arc<RecordingRunner>,
        installs: Arc<RecordingInstalls>,
        service: RuntimeService,
        _dir: tempfile::TempDir,
    }

    fn setup() -> Setup {
        let dir = tempdir().unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let runtimes = Arc::new(MemoryRuntimeRepo::new());
        let images: Arc<dyn ImageClientFactory> = Arc::new(FakeImages::new("sha256:current"));
        let installs = Arc::new(RecordingInstalls::new());
        let orchestrator = LifecycleOrchestrator::new(
            runner.clone(),
            runtimes.clone(),
            Arc::new(MemoryWebsiteRepo::new(vec![
                website(1, "a.example.com", 1, 21),
                website(2, "b.example.com", 1, 21),
            ])),
            Arc::clone(&images),
            installs.clone(),
        );
        let file_op = Arc::new(LocalFileOp);
        let provisioner = RuntimeProvisioner::new(
            dir.path(),
            file_op.clone(),
            ParamMerger::new(file_op, Arc::new(DotenvCodec)),
            runtimes.clone(),
            orchestrator.clone(),
        );
        Setup {
            runtimes: runtimes.clone(),
            runner,
            installs,
            service: RuntimeService::new(runtimes, images, orchestrator, provisioner),
            _dir: dir,
        }
    }

    fn seed(repo: &MemoryRuntimeRepo, kind: RuntimeType, status: RuntimeStatus) -> u64 {
        let mut runtime = Runtime::new("shop", kind, "/rt/shop");
        runtime.image = "rt-php:8.2".to_string();
        runtime.status = status;
        repo.create(&mut runtime).unwrap();
        runtime.id
    }

    #[tokio::test]
    async fn test_rebuild_marks_building_and_cascades() {
        let s = setup();
        let id = seed(&s.runtimes, RuntimeType::Php, RuntimeStatus::Normal);

        let task = s.service.rebuild(id).await.unwrap();
        assert_eq!(s.runtimes.saved()[0].status, RuntimeStatus::Building);

        let (runtime, results) = task.wait().await.unwrap().wait_cascade().await;
        assert_eq!(runtime.status, RuntimeStatus::Normal);
        assert_eq!(results.len(), 1);
        assert_eq!(s.installs.calls(), vec![21]);
        assert_eq!(s.runner.verbs(), vec!["build"]);
    }

    #[tokio::test]
    async fn test_rebuild_rejects_node() {
        let s = setup();
        let id = seed(&s.runtimes, RuntimeType::Node, RuntimeStatus::Running);
        assert!(matches!(
            s.service.rebuild(id).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(s.runner.verbs().is_empty());
    }

    #[tokio::test]
    async fn test_recreate() {
        let s = setup();
        let id = seed(&s.runtimes, RuntimeType::Node, RuntimeStatus::Error);

        let task = s.service.recreate(id).unwrap();
        assert_eq!(s.runtimes.saved()[0].status, RuntimeStatus::Starting);

        let outcome = task.wait().await.unwrap();
        assert_eq!(outcome.runtime.status, RuntimeStatus::Running);
        assert_eq!(s.service.get(id).unwrap().status, RuntimeStatus::Running);
        assert_eq!(s.runner.verbs(), vec!["down", "up"]);
    }

    #[tokio::test]
    async fn test_rebuild_only_from_normal() {
        for status in [
            RuntimeStatus::Building,
            RuntimeStatus::Starting,
            RuntimeStatus::Running,
            RuntimeStatus::Error,
        ] {
            let s = setup();
            let id = seed(&s.runtimes, RuntimeType::Php, status);
            assert!(
                matches!(s.service.rebuild(id).await, Err(Error::InvalidInput(_))),
                "rebuild accepted from {}",
                status
            );
            assert!(s.runtimes.saved().is_empty());
            assert_eq!(s.service.get(id).unwrap().status, status);
            assert!(s.runner.verbs().is_empty());
        }
    }

    #[tokio::test]
    async fn test_recreate_rejected_while_in_progress() {
        for status in [RuntimeStatus::Building, RuntimeStatus::Starting] {
            let s = setup();
            let id = seed(&s.runtimes, RuntimeType::Node, status);
            let err = s.service.recreate(id).unwrap_err();
            assert!(err.to_string().contains("operation in progress"));
            assert!(s.runtimes.saved().is_empty());
            assert!(s.runner.verbs().is_empty());
        }
    }

    #[tokio::test]
    async fn test_recreate_from_normal_and_running() {
        for status in [RuntimeStatus::Normal, RuntimeStatus::Running] {
            let s = setup();
            let id = seed(&s.runtimes, RuntimeType::Node, status);
            let outcome = s.service.recreate(id).unwrap().wait().await.unwrap();
            assert_eq!(outcome.runtime.status, RuntimeStatus::Running);
        }
    }

    #[tokio::test]
    async fn test_unknown_runtime() {
        let s = setup();
        assert!(matches!(s.service.recreate(42), Err(Error::NotFound(_))));
    }
}
