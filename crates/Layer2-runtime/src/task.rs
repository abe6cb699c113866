//! Background task handles
//!
//! Lifecycle work is fire-and-forget for callers; the handle only exists so a
//! caller that wants the outcome can await it.

use crate::model::Runtime;
use rtpanel_foundation::{Error, Result};
use std::future::Future;
use tokio::task::JoinHandle;

/// Which lifecycle task is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Start,
    Build,
    Rebuild,
    Recreate,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TaskKind::Start => "start",
            TaskKind::Build => "build",
            TaskKind::Rebuild => "rebuild",
            TaskKind::Recreate => "recreate",
        };
        f.write_str(name)
    }
}

/// One rebuild request sent to an app installation
#[derive(Debug)]
pub struct CascadeDispatch {
    pub install_id: u64,
    pub domain: String,
    handle: JoinHandle<Result<()>>,
}

impl CascadeDispatch {
    pub(crate) fn new(install_id: u64, domain: String, handle: JoinHandle<Result<()>>) -> Self {
        Self {
            install_id,
            domain,
            handle,
        }
    }

    pub async fn wait(self) -> Result<()> {
        self.handle
            .await
            .map_err(|e| Error::Task(format!("cascade for install {} aborted: {}", self.install_id, e)))?
    }
}

/// Final state of a lifecycle task
#[derive(Debug)]
pub struct TaskOutcome {
    /// Runtime as persisted at the end of the task
    pub runtime: Runtime,
    /// Rebuilds dispatched to dependent installations (rebuild only)
    pub cascade: Vec<CascadeDispatch>,
}

impl TaskOutcome {
    pub fn new(runtime: Runtime) -> Self {
        Self {
            runtime,
            cascade: Vec::new(),
        }
    }

    /// Await every cascade dispatch; failures are already logged by the dispatch itself
    pub async fn wait_cascade(self) -> (Runtime, Vec<(u64, Result<()>)>) {
        let mut results = Vec::with_capacity(self.cascade.len());
        for dispatch in self.cascade {
            let install_id = dispatch.install_id;
            results.push((install_id, dispatch.wait().await));
        }
        (self.runtime, results)
    }
}

/// Handle to a spawned lifecycle task
#[derive(Debug)]
pub struct RuntimeTask {
    runtime_id: u64,
    kind: TaskKind,
    handle: JoinHandle<TaskOutcome>,
}

impl RuntimeTask {
    pub(crate) fn spawn<F>(runtime_id: u64, kind: TaskKind, fut: F) -> Self
    where
        F: Future<Output = TaskOutcome> + Send + 'static,
    {
        Self {
            runtime_id,
            kind,
            handle: tokio::spawn(fut),
        }
    }

    pub fn runtime_id(&self) -> u64 {
        self.runtime_id
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub async fn wait(self) -> Result<TaskOutcome> {
        self.handle
            .await
            .map_err(|e| Error::Task(format!("{} task for runtime {} aborted: {}", self.kind, self.runtime_id, e)))
    }
}
