//! # rtpanel-foundation
//!
//! Foundation layer for rtpanel:
//! - Error: one error enum shared by every layer
//! - Storage: JSON document store
//! - Config: panel configuration (directories, compose command)

pub mod config;
pub mod error;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result, BUILD_FAILED, OPERATION_FAILED, START_FAILED};

// ============================================================================
// Config
// ============================================================================
pub use config::{PanelConfig, DEFAULT_COMPOSE_COMMAND, PANEL_CONFIG_FILE};

// ============================================================================
// Storage
// ============================================================================
pub use storage::JsonStore;
