//! Runtime data model

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Compose definition file inside a runtime directory
pub const COMPOSE_FILE: &str = "docker-compose.yml";
/// Environment file inside a runtime directory
pub const ENV_FILE: &str = ".env";
/// Form definition shipped with PHP templates
pub const FORM_FILE: &str = "config.json";
/// Log written by image builds
pub const BUILD_LOG_FILE: &str = "build.log";
/// Log written by start / recreate operations
pub const RUN_LOG_FILE: &str = "run.log";

/// Kind of language environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeType {
    Php,
    Node,
}

impl RuntimeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeType::Php => "php",
            RuntimeType::Node => "node",
        }
    }
}

impl std::fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for RuntimeType {
    type Err = rtpanel_foundation::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "php" => Ok(RuntimeType::Php),
            "node" => Ok(RuntimeType::Node),
            other => Err(rtpanel_foundation::Error::InvalidInput(format!(
                "unknown runtime type: {}",
                other
            ))),
        }
    }
}

/// Runtime status state machine
///
/// ```text
/// Starting -> Running | Error
/// Building -> Normal  | Error
/// Normal | Running | Error -> Starting   (recreate)
/// Normal -> Building                     (rebuild)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeStatus {
    Normal,
    Starting,
    Building,
    Running,
    Error,
}

impl RuntimeStatus {
    /// Whether a background task is expected to move this status on
    pub fn is_transient(&self) -> bool {
        matches!(self, RuntimeStatus::Starting | RuntimeStatus::Building)
    }

    pub fn can_transition_to(&self, next: RuntimeStatus) -> bool {
        use RuntimeStatus::*;
        matches!(
            (self, next),
            (Starting, Running)
                | (Starting, Error)
                | (Building, Normal)
                | (Building, Error)
                | (Normal, Starting)
                | (Running, Starting)
                | (Error, Starting)
                | (Normal, Building)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeStatus::Normal => "normal",
            RuntimeStatus::Starting => "starting",
            RuntimeStatus::Building => "building",
            RuntimeStatus::Running => "running",
            RuntimeStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for RuntimeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A provisioned, containerized language environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Runtime {
    /// Assigned on first persist; 0 means not yet persisted
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: RuntimeType,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub code_dir: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub docker_compose: String,
    #[serde(default)]
    pub env: String,
    #[serde(default)]
    pub params: String,
    pub status: RuntimeStatus,
    #[serde(default)]
    pub message: String,
    /// `<runtimeDir>/<kind>/<name>`
    pub path: PathBuf,
}

impl Runtime {
    pub fn new(name: impl Into<String>, kind: RuntimeType, path: impl Into<PathBuf>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            kind,
            version: String::new(),
            source: String::new(),
            code_dir: String::new(),
            image: String::new(),
            docker_compose: String::new(),
            env: String::new(),
            params: String::new(),
            status: RuntimeStatus::Normal,
            message: String::new(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn compose_path(&self) -> PathBuf {
        self.path.join(COMPOSE_FILE)
    }

    pub fn env_path(&self) -> PathBuf {
        self.path.join(ENV_FILE)
    }

    pub fn log_path(&self) -> PathBuf {
        self.path.join(RUN_LOG_FILE)
    }

    pub fn build_log_path(&self) -> PathBuf {
        self.path.join(BUILD_LOG_FILE)
    }

    /// Move to a new status through the state machine, clearing the message.
    ///
    /// Runtimes still starting or building report an operation in progress.
    pub fn begin(&mut self, next: RuntimeStatus) -> rtpanel_foundation::Result<()> {
        if !self.status.can_transition_to(next) {
            let reason = if self.status.is_transient() {
                format!("runtime {} has an operation in progress ({})", self.name, self.status)
            } else {
                format!("runtime {} cannot go from {} to {}", self.name, self.status, next)
            };
            return Err(rtpanel_foundation::Error::InvalidInput(reason));
        }
        self.mark(next);
        Ok(())
    }

    /// Record a successful outcome
    pub fn mark(&mut self, status: RuntimeStatus) {
        self.status = status;
        self.message.clear();
    }

    /// Record a failure; merged compose/env content is left untouched
    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = RuntimeStatus::Error;
        self.message = message.into();
    }
}

/// A website served by an app installation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Website {
    pub id: u64,
    pub primary_domain: String,
    #[serde(default)]
    pub runtime_id: u64,
    /// 0 when the site is not backed by an app installation
    #[serde(default)]
    pub app_install_id: u64,
}

/// Node specific creation options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    /// Run the package install step on start
    #[serde(default)]
    pub install: bool,
}

/// Runtime creation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeCreate {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: RuntimeType,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub code_dir: String,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub node_config: NodeConfig,
}

impl RuntimeCreate {
    pub fn new(name: impl Into<String>, kind: RuntimeType) -> Self {
        Self {
            name: name.into(),
            kind,
            image: String::new(),
            source: String::new(),
            version: String::new(),
            code_dir: String::new(),
            params: serde_json::Map::new(),
            node_config: NodeConfig::default(),
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_code_dir(mut self, dir: impl Into<String>) -> Self {
        self.code_dir = dir.into();
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    pub fn with_install(mut self, install: bool) -> Self {
        self.node_config.install = install;
        self
    }

    /// Reject names that would escape the kind directory
    pub fn validate(&self) -> rtpanel_foundation::Result<()> {
        let name = self.name.trim();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(rtpanel_foundation::Error::InvalidInput(format!(
                "invalid runtime name: {:?}",
                self.name
            )));
        }
        Ok(())
    }
}
