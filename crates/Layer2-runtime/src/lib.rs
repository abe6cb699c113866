//! # rtpanel-runtime
//!
//! Lifecycle management for runtimes: templated, containerized language
//! environments (PHP, Node) provisioned for hosted sites.
//!
//! ## Components
//!
//! - **Parameter Merger** (`params`) - request parameters into the `.env` overlay
//! - **Provisioner** (`provisioner`) - stages a runtime directory from a template
//! - **Process Runner** (`runner`) - one compose operation, output duplexed to a log
//! - **Lifecycle Orchestrator** (`orchestrator`) - start / build / recreate tasks,
//!   image cleanup and rebuild cascades
//!
//! Collaborators (files, env codec, persistence, docker, installations) sit
//! behind traits with default implementations.

pub mod docker;
pub mod envfile;
pub mod fileop;
pub mod install;
pub mod model;
pub mod orchestrator;
pub mod params;
pub mod provisioner;
pub mod repo;
pub mod runner;
pub mod service;
pub mod task;

#[cfg(test)]
mod test_support;

// Model
pub use model::{NodeConfig, Runtime, RuntimeCreate, RuntimeStatus, RuntimeType, Website};

// Merging
pub use envfile::{DotenvCodec, EnvCodec, EnvMap};
pub use params::{merge_params, MergedContent, ParamMerger};

// Provisioning
pub use fileop::{FileOp, LocalFileOp};
pub use provisioner::{Provisioned, RuntimeProvisioner};

// Process runner
pub use runner::{ComposeOp, ComposeRunner, FanOutWriter, ProcessRunner, SharedBuffer};

// Orchestration
pub use orchestrator::LifecycleOrchestrator;
pub use task::{CascadeDispatch, RuntimeTask, TaskKind, TaskOutcome};

// Collaborators
pub use docker::{DockerConnector, DockerImageClient, ImageClient, ImageClientFactory};
pub use install::{ComposeInstallOperator, InstallOperation, InstallOperator};
pub use repo::{JsonRuntimeRepo, JsonWebsiteRepo, RuntimeRepo, WebsiteFilter, WebsiteRepo};

// Service
pub use service::RuntimeService;
