//! Compose process runner
//!
//! - `ComposeOp` - the orchestration verbs and their argv
//! - `ComposeRunner` - trait the lifecycle tasks drive
//! - `ProcessRunner` - runs the compose tool, duplexing output to a log file
//! - `FanOutWriter` - forwards each write to several sinks

pub mod compose;
pub mod process;
pub mod tee;
pub mod r#trait;

pub use compose::ComposeOp;
pub use process::ProcessRunner;
pub use r#trait::ComposeRunner;
pub use tee::{FanOutWriter, SharedBuffer};
