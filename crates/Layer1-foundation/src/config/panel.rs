//! Panel Config
//!
//! Global (`<config dir>/rtpanel/config.json`) and project (`.rtpanel/config.json`)
//! files are merged, project values winning.

use crate::storage::JsonStore;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file name
pub const PANEL_CONFIG_FILE: &str = "config.json";

/// Compose tool invoked when none is configured
pub const DEFAULT_COMPOSE_COMMAND: &str = "docker-compose";

const DEFAULT_BASE_DIR: &str = "/opt/rtpanel";

/// rtpanel configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelConfig {
    /// Root of runtime directories (`<runtimeDir>/<kind>/<name>`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_dir: Option<PathBuf>,

    /// Location of persisted runtime and website records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Root of installed app directories (`<appsDir>/<installId>`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apps_dir: Option<PathBuf>,

    /// Compose invocation prefix, e.g. `["docker", "compose"]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compose_command: Option<Vec<String>>,
}

impl PanelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// Global + project merged load
    pub fn load() -> Result<Self> {
        let mut config = Self::new();

        if let Ok(global) = JsonStore::global() {
            if let Some(global_config) = global.load_optional::<PanelConfig>(PANEL_CONFIG_FILE)? {
                config.merge(global_config);
            }
        }

        let project = JsonStore::current_project()?;
        if let Some(project_config) = project.load_optional::<PanelConfig>(PANEL_CONFIG_FILE)? {
            config.merge(project_config);
        }

        Ok(config)
    }

    /// Load one explicit file
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    pub fn merge(&mut self, other: PanelConfig) {
        if other.runtime_dir.is_some() {
            self.runtime_dir = other.runtime_dir;
        }
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
        if other.apps_dir.is_some() {
            self.apps_dir = other.apps_dir;
        }
        if other.compose_command.is_some() {
            self.compose_command = other.compose_command;
        }
    }

    // ========================================================================
    // Resolved values
    // ========================================================================

    pub fn runtime_dir(&self) -> PathBuf {
        self.runtime_dir
            .clone()
            .unwrap_or_else(|| Path::new(DEFAULT_BASE_DIR).join("runtime"))
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| Path::new(DEFAULT_BASE_DIR).join("db"))
    }

    pub fn apps_dir(&self) -> PathBuf {
        self.apps_dir
            .clone()
            .unwrap_or_else(|| Path::new(DEFAULT_BASE_DIR).join("apps"))
    }

    /// Compose argv prefix, never empty
    pub fn compose_command(&self) -> Vec<String> {
        match &self.compose_command {
            Some(cmd) if !cmd.is_empty() => cmd.clone(),
            _ => vec![DEFAULT_COMPOSE_COMMAND.to_string()],
        }
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn with_runtime_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.runtime_dir = Some(dir.into());
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn with_apps_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.apps_dir = Some(dir.into());
        self
    }

    pub fn with_compose_command(mut self, cmd: Vec<String>) -> Self {
        self.compose_command = Some(cmd);
        self
    }
}
