//! Storage module for rtpanel
//!
//! - `json`: JSON files - configuration and record persistence

mod json;

pub use json::JsonStore;
