//! In-memory collaborators for unit tests

use crate::docker::{ImageClient, ImageClientFactory};
use crate::install::{InstallOperation, InstallOperator};
use crate::model::{Runtime, Website};
use crate::repo::{RuntimeRepo, WebsiteFilter, WebsiteRepo};
use crate::runner::{ComposeOp, ComposeRunner};
use async_trait::async_trait;
use parking_lot::Mutex;
use rtpanel_foundation::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

pub fn website(id: u64, domain: &str, runtime_id: u64, app_install_id: u64) -> Website {
    Website {
        id,
        primary_domain: domain.to_string(),
        runtime_id,
        app_install_id,
    }
}

/// Records verbs; configured verbs fail with the given stderr
#[derive(Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<ComposeOp>>,
    failures: HashMap<ComposeOp, String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, op: ComposeOp, stderr: &str) -> Self {
        self.failures.insert(op, stderr.to_string());
        self
    }

    pub fn verbs(&self) -> Vec<&'static str> {
        self.calls.lock().iter().map(|op| op.verb()).collect()
    }
}

#[async_trait]
impl ComposeRunner for RecordingRunner {
    async fn run(&self, op: ComposeOp, _compose_path: &Path, _log_path: &Path) -> Result<()> {
        self.calls.lock().push(op);
        match self.failures.get(&op) {
            Some(stderr) => Err(Error::Compose {
                verb: op.verb().to_string(),
                stderr: stderr.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Runtime repo keeping every save in order
#[derive(Default)]
pub struct MemoryRuntimeRepo {
    records: Mutex<Vec<Runtime>>,
    saves: Mutex<Vec<Runtime>>,
}

impl MemoryRuntimeRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `save` call, oldest first
    pub fn saved(&self) -> Vec<Runtime> {
        self.saves.lock().clone()
    }
}

impl RuntimeRepo for MemoryRuntimeRepo {
    fn create(&self, runtime: &mut Runtime) -> Result<()> {
        let mut records = self.records.lock();
        runtime.id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        records.push(runtime.clone());
        Ok(())
    }

    fn save(&self, runtime: &Runtime) -> Result<()> {
        self.saves.lock().push(runtime.clone());
        let mut records = self.records.lock();
        match records.iter_mut().find(|r| r.id == runtime.id) {
            Some(existing) => *existing = runtime.clone(),
            None => records.push(runtime.clone()),
        }
        Ok(())
    }

    fn get(&self, id: u64) -> Result<Runtime> {
        self.records
            .lock()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("runtime {}", id)))
    }

    fn list(&self) -> Result<Vec<Runtime>> {
        Ok(self.records.lock().clone())
    }
}

pub struct MemoryWebsiteRepo {
    websites: Vec<Website>,
}

impl MemoryWebsiteRepo {
    pub fn new(websites: Vec<Website>) -> Self {
        Self { websites }
    }
}

impl WebsiteRepo for MemoryWebsiteRepo {
    fn get_by(&self, filter: &WebsiteFilter) -> Result<Vec<Website>> {
        Ok(self
            .websites
            .iter()
            .filter(|w| filter.matches(w))
            .cloned()
            .collect())
    }
}

/// Resolves every name to one id and records deletions
pub struct FakeImages {
    resolved: String,
    fail_delete: bool,
    deleted: Arc<Mutex<Vec<String>>>,
}

impl FakeImages {
    pub fn new(resolved: &str) -> Self {
        Self {
            resolved: resolved.to_string(),
            fail_delete: false,
            deleted: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().clone()
    }
}

struct FakeImageClient {
    resolved: String,
    fail_delete: bool,
    deleted: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ImageClient for FakeImageClient {
    async fn image_id_by_name(&self, _name: &str) -> Result<String> {
        Ok(self.resolved.clone())
    }

    async fn delete_image(&self, id: &str) -> Result<()> {
        if self.fail_delete {
            return Err(Error::Docker("image is being used by a container".to_string()));
        }
        self.deleted.lock().push(id.to_string());
        Ok(())
    }
}

impl ImageClientFactory for FakeImages {
    fn new_client(&self) -> Result<Arc<dyn ImageClient>> {
        Ok(Arc::new(FakeImageClient {
            resolved: self.resolved.clone(),
            fail_delete: self.fail_delete,
            deleted: Arc::clone(&self.deleted),
        }))
    }
}

/// Records installation ids; configured ids fail
#[derive(Default)]
pub struct RecordingInstalls {
    calls: Mutex<Vec<u64>>,
    failing: Vec<u64>,
}

impl RecordingInstalls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, install_id: u64) -> Self {
        self.failing.push(install_id);
        self
    }

    pub fn calls(&self) -> Vec<u64> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl InstallOperator for RecordingInstalls {
    async fn operate(&self, install_id: u64, op: InstallOperation) -> Result<()> {
        assert_eq!(op, InstallOperation::Rebuild);
        self.calls.lock().push(install_id);
        if self.failing.contains(&install_id) {
            return Err(Error::Install {
                install_id,
                message: "compose up failed".to_string(),
            });
        }
        Ok(())
    }
}
