//! Runner trait

use super::ComposeOp;
use async_trait::async_trait;
use rtpanel_foundation::Result;
use std::path::Path;

/// Runs one compose operation to completion.
///
/// Truncates `log_path` and owns it for the duration of the call. A non-zero
/// exit yields `Error::Compose` carrying the captured stderr.
#[async_trait]
pub trait ComposeRunner: Send + Sync {
    async fn run(&self, op: ComposeOp, compose_path: &Path, log_path: &Path) -> Result<()>;
}
