//! Config - panel configuration
//!
//! - `panel.rs` - PanelConfig (directories, compose command)

mod panel;

pub use panel::{PanelConfig, DEFAULT_COMPOSE_COMMAND, PANEL_CONFIG_FILE};
