//! Runtime Provisioner
//!
//! Stages a runtime directory from a version template, merges the request
//! parameters, persists the runtime and hands off to the orchestrator.
//!
//! ```text
//! Node: copy <tpl>/<version> -> <kind dir>/<version>, rename -> <kind dir>/<name>
//! PHP:  copy <tpl>/<version>/build -> <kind dir>/<nanos>/build, rename -> <kind dir>/<name>
//! ```
//!
//! Any failure after the copy removes the project directory; nothing is
//! persisted and no task is dispatched.

use crate::fileop::FileOp;
use crate::model::{Runtime, RuntimeCreate, RuntimeStatus, RuntimeType};
use crate::orchestrator::LifecycleOrchestrator;
use crate::params::{MergedContent, ParamMerger};
use crate::repo::RuntimeRepo;
use crate::task::RuntimeTask;
use chrono::Utc;
use rtpanel_foundation::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Template subdirectory PHP runtimes are built from
pub const BUILD_DIR: &str = "build";

/// A provisioned runtime and the task it was handed to
#[derive(Debug)]
pub struct Provisioned {
    pub runtime: Runtime,
    pub task: RuntimeTask,
}

pub struct RuntimeProvisioner {
    runtime_dir: PathBuf,
    file_op: Arc<dyn FileOp>,
    merger: ParamMerger,
    runtimes: Arc<dyn RuntimeRepo>,
    orchestrator: LifecycleOrchestrator,
}

impl RuntimeProvisioner {
    pub fn new(
        runtime_dir: impl Into<PathBuf>,
        file_op: Arc<dyn FileOp>,
        merger: ParamMerger,
        runtimes: Arc<dyn RuntimeRepo>,
        orchestrator: LifecycleOrchestrator,
    ) -> Self {
        Self {
            runtime_dir: runtime_dir.into(),
            file_op,
            merger,
            runtimes,
            orchestrator,
        }
    }

    fn kind_dir(&self, kind: RuntimeType) -> PathBuf {
        self.runtime_dir.join(kind.as_str())
    }

    /// Stage, merge, persist and dispatch.
    ///
    /// Returns as soon as the start (Node) or build (PHP) task is spawned.
    pub fn provision(&self, create: &RuntimeCreate, version_dir: &Path) -> Result<Provisioned> {
        create.validate()?;
        let project_dir = self.kind_dir(create.kind).join(&create.name);
        if self.file_op.stat(&project_dir) {
            return Err(Error::InvalidInput(format!(
                "runtime directory {} already exists",
                project_dir.display()
            )));
        }

        let merged = match create.kind {
            RuntimeType::Node => self.stage_node(create, version_dir, &project_dir)?,
            RuntimeType::Php => self.stage_php(create, version_dir, &project_dir)?,
        };

        let mut runtime = Self::populate(create, &project_dir, merged);
        if let Err(e) = self.runtimes.create(&mut runtime) {
            self.discard(&project_dir);
            return Err(e);
        }
        info!(
            "Runtime [{}] provisioned at {} ({})",
            runtime.name,
            project_dir.display(),
            runtime.status
        );

        let task = match runtime.kind {
            RuntimeType::Node => self.orchestrator.spawn_start(runtime.clone()),
            RuntimeType::Php => self
                .orchestrator
                .spawn_build(runtime.clone(), String::new(), false),
        };
        Ok(Provisioned { runtime, task })
    }

    fn stage_node(
        &self,
        create: &RuntimeCreate,
        version_dir: &Path,
        project_dir: &Path,
    ) -> Result<MergedContent> {
        let kind_dir = self.kind_dir(create.kind);
        let version_name = version_dir
            .file_name()
            .ok_or_else(|| Error::TemplateNotFound(version_dir.to_path_buf()))?;
        let staged = kind_dir.join(version_name);
        if let Err(e) = self.file_op.copy_dir(version_dir, &kind_dir) {
            self.discard(&staged);
            return Err(e);
        }

        let result = self
            .file_op
            .rename(&staged, project_dir)
            .and_then(|_| self.merger.apply(create, project_dir));
        if result.is_err() {
            self.discard(project_dir);
            if staged != project_dir {
                self.discard(&staged);
            }
        }
        result
    }

    fn stage_php(
        &self,
        create: &RuntimeCreate,
        version_dir: &Path,
        project_dir: &Path,
    ) -> Result<MergedContent> {
        let build_dir = version_dir.join(BUILD_DIR);
        if !self.file_op.stat(&build_dir) {
            return Err(Error::TemplateNotFound(build_dir));
        }

        // timestamped parent keeps concurrent stagings of `build` apart
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let temp_dir = self.kind_dir(create.kind).join(nanos.to_string());
        if let Err(e) = self.file_op.copy_dir(&build_dir, &temp_dir) {
            self.discard(&temp_dir);
            return Err(e);
        }

        let staged = temp_dir.join(BUILD_DIR);
        let result = self.promote(&staged, &temp_dir, project_dir).and_then(|_| {
            self.merger.apply(create, project_dir)
        });
        if result.is_err() {
            self.discard(project_dir);
            self.discard(&temp_dir);
        }
        result
    }

    fn promote(&self, staged: &Path, temp_dir: &Path, project_dir: &Path) -> Result<()> {
        if staged != project_dir {
            self.file_op.rename(staged, project_dir)?;
            self.file_op.delete_dir(temp_dir)?;
        }
        Ok(())
    }

    fn populate(create: &RuntimeCreate, project_dir: &Path, merged: MergedContent) -> Runtime {
        let mut runtime = Runtime::new(create.name.clone(), create.kind, project_dir);
        runtime.image = create.image.clone();
        runtime.version = create.version.clone();
        runtime.source = create.source.clone();
        runtime.docker_compose = String::from_utf8_lossy(&merged.compose).into_owned();
        runtime.env = String::from_utf8_lossy(&merged.env).into_owned();
        match create.kind {
            RuntimeType::Node => {
                runtime.code_dir = create.code_dir.clone();
                runtime.status = RuntimeStatus::Starting;
            }
            RuntimeType::Php => {
                if let Some(forms) = merged.forms {
                    runtime.params = String::from_utf8_lossy(&forms).into_owned();
                }
                runtime.status = RuntimeStatus::Building;
            }
        }
        runtime
    }

    fn discard(&self, dir: &Path) {
        if let Err(e) = self.file_op.delete_dir(dir) {
            warn!("Failed to clean up {}: {}", dir.display(), e);
        }
    }
}
