//! Lifecycle Orchestrator
//!
//! Background start / build / recreate tasks. Each task runs its compose steps
//! strictly in order, turns the result into a runtime status and persists it.
//! Outcomes reach callers only through the persisted runtime.

use crate::docker::ImageClientFactory;
use crate::install::{InstallOperation, InstallOperator};
use crate::model::{Runtime, RuntimeStatus};
use crate::repo::{RuntimeRepo, WebsiteFilter, WebsiteRepo};
use crate::runner::{ComposeOp, ComposeRunner};
use crate::task::{CascadeDispatch, RuntimeTask, TaskKind, TaskOutcome};
use rtpanel_foundation::{BUILD_FAILED, START_FAILED};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Drives lifecycle tasks for runtimes
#[derive(Clone)]
pub struct LifecycleOrchestrator {
    runner: Arc<dyn ComposeRunner>,
    runtimes: Arc<dyn RuntimeRepo>,
    websites: Arc<dyn WebsiteRepo>,
    images: Arc<dyn ImageClientFactory>,
    installs: Arc<dyn InstallOperator>,
}

impl LifecycleOrchestrator {
    pub fn new(
        runner: Arc<dyn ComposeRunner>,
        runtimes: Arc<dyn RuntimeRepo>,
        websites: Arc<dyn WebsiteRepo>,
        images: Arc<dyn ImageClientFactory>,
        installs: Arc<dyn InstallOperator>,
    ) -> Self {
        Self {
            runner,
            runtimes,
            websites,
            images,
            installs,
        }
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    pub fn spawn_start(&self, runtime: Runtime) -> RuntimeTask {
        let this = self.clone();
        RuntimeTask::spawn(runtime.id, TaskKind::Start, async move {
            TaskOutcome::new(this.start(runtime).await)
        })
    }

    pub fn spawn_recreate(&self, runtime: Runtime) -> RuntimeTask {
        let this = self.clone();
        RuntimeTask::spawn(runtime.id, TaskKind::Recreate, async move {
            TaskOutcome::new(this.recreate(runtime).await)
        })
    }

    /// `old_image_id` is empty unless the image is being replaced
    pub fn spawn_build(&self, runtime: Runtime, old_image_id: String, rebuild: bool) -> RuntimeTask {
        let this = self.clone();
        let kind = if rebuild {
            TaskKind::Rebuild
        } else {
            TaskKind::Build
        };
        RuntimeTask::spawn(runtime.id, kind, async move {
            this.build(runtime, &old_image_id, rebuild).await
        })
    }

    // ========================================================================
    // Tasks
    // ========================================================================

    /// `up`, then Running or Error
    pub async fn start(&self, mut runtime: Runtime) -> Runtime {
        match self
            .runner
            .run(ComposeOp::Up, &runtime.compose_path(), &runtime.log_path())
            .await
        {
            Ok(()) => {
                info!("Runtime [{}] started", runtime.name);
                runtime.mark(RuntimeStatus::Running);
            }
            Err(e) => {
                warn!("Runtime [{}] failed to start: {}", runtime.name, e);
                runtime.fail(e.classified(START_FAILED));
            }
        }
        self.persist(&runtime);
        runtime
    }

    /// `down` then `up`; a failed `down` skips `up`
    pub async fn recreate(&self, mut runtime: Runtime) -> Runtime {
        let compose = runtime.compose_path();
        let log = runtime.log_path();
        let mut result = Ok(());
        for op in [ComposeOp::Down, ComposeOp::Up] {
            result = self.runner.run(op, &compose, &log).await;
            if result.is_err() {
                break;
            }
        }

        match result {
            Ok(()) => {
                info!("Runtime [{}] recreated", runtime.name);
                runtime.mark(RuntimeStatus::Running);
            }
            Err(e) => {
                warn!("Runtime [{}] failed to recreate: {}", runtime.name, e);
                runtime.fail(e.to_string());
            }
        }
        self.persist(&runtime);
        runtime
    }

    /// `build`, then Normal or Error.
    ///
    /// On success a replaced image is removed and, for rebuilds, every
    /// dependent installation gets one rebuild dispatch. The runtime is
    /// persisted once, before the dispatches finish.
    pub async fn build(&self, mut runtime: Runtime, old_image_id: &str, rebuild: bool) -> TaskOutcome {
        let mut cascade = Vec::new();
        match self
            .runner
            .run(ComposeOp::Build, &runtime.compose_path(), &runtime.build_log_path())
            .await
        {
            Ok(()) => {
                info!("Runtime [{}] image built", runtime.name);
                runtime.mark(RuntimeStatus::Normal);
                if !old_image_id.is_empty() {
                    self.remove_replaced_image(&runtime, old_image_id).await;
                }
                if rebuild && runtime.id > 0 {
                    cascade = self.dispatch_cascade(&runtime);
                }
            }
            Err(e) => {
                warn!("Runtime [{}] image build failed: {}", runtime.name, e);
                runtime.fail(e.classified(BUILD_FAILED));
            }
        }
        self.persist(&runtime);
        TaskOutcome { runtime, cascade }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Best-effort: every failure is logged only
    async fn remove_replaced_image(&self, runtime: &Runtime, old_image_id: &str) {
        let client = match self.images.new_client() {
            Ok(client) => client,
            Err(e) => {
                error!("delete imageID [{}] error {}", old_image_id, e);
                return;
            }
        };
        let new_image_id = match client.image_id_by_name(&runtime.image).await {
            Ok(id) => id,
            Err(e) => {
                error!("resolve image [{}] error {}", runtime.image, e);
                return;
            }
        };
        if new_image_id == old_image_id {
            return;
        }
        info!("delete imageID [{}]", old_image_id);
        match client.delete_image(old_image_id).await {
            Ok(()) => info!("delete old image success"),
            Err(e) => error!("delete imageID [{}] error {}", old_image_id, e),
        }
    }

    /// One dispatch per distinct installation id, domains kept for logging
    fn dispatch_cascade(&self, runtime: &Runtime) -> Vec<CascadeDispatch> {
        let websites = match self
            .websites
            .get_by(&WebsiteFilter::with_runtime_id(runtime.id))
        {
            Ok(websites) => websites,
            Err(e) => {
                error!("Runtime [{}] website lookup failed: {}", runtime.name, e);
                return Vec::new();
            }
        };

        let mut installs: BTreeMap<u64, String> = BTreeMap::new();
        for website in websites {
            if website.app_install_id > 0 {
                installs
                    .entry(website.app_install_id)
                    .or_insert(website.primary_domain);
            }
        }

        installs
            .into_iter()
            .map(|(install_id, domain)| {
                let operator = Arc::clone(&self.installs);
                let runtime_name = runtime.name.clone();
                let log_domain = domain.clone();
                let handle = tokio::spawn(async move {
                    info!("rebuild runtime [{}] domain [{}]", runtime_name, log_domain);
                    let result = operator.operate(install_id, InstallOperation::Rebuild).await;
                    if let Err(e) = &result {
                        error!(
                            "rebuild runtime [{}] domain [{}] error {}",
                            runtime_name, log_domain, e
                        );
                    }
                    result
                });
                CascadeDispatch::new(install_id, domain, handle)
            })
            .collect()
    }

    fn persist(&self, runtime: &Runtime) {
        if let Err(e) = self.runtimes.save(runtime) {
            error!("Failed to save runtime [{}]: {}", runtime.name, e);
        }
    }
}
