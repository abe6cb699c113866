//! Compose verbs

use rtpanel_foundation::Error;
use std::path::Path;

/// Orchestration verb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComposeOp {
    /// Build images only
    Build,
    /// Start detached
    Up,
    /// Stop and remove containers
    Down,
    Start,
    Stop,
    Restart,
    Pull,
}

impl ComposeOp {
    pub fn verb(&self) -> &'static str {
        match self {
            ComposeOp::Build => "build",
            ComposeOp::Up => "up",
            ComposeOp::Down => "down",
            ComposeOp::Start => "start",
            ComposeOp::Stop => "stop",
            ComposeOp::Restart => "restart",
            ComposeOp::Pull => "pull",
        }
    }

    /// `-f <compose> <verb> [-d]`; only `up` runs detached
    pub fn args(&self, compose_path: &Path) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            compose_path.to_string_lossy().to_string(),
            self.verb().to_string(),
        ];
        if matches!(self, ComposeOp::Up) {
            args.push("-d".to_string());
        }
        args
    }
}

impl std::fmt::Display for ComposeOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.verb())
    }
}

impl std::str::FromStr for ComposeOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "build" => Ok(ComposeOp::Build),
            "up" => Ok(ComposeOp::Up),
            "down" => Ok(ComposeOp::Down),
            "start" => Ok(ComposeOp::Start),
            "stop" => Ok(ComposeOp::Stop),
            "restart" => Ok(ComposeOp::Restart),
            "pull" => Ok(ComposeOp::Pull),
            other => Err(Error::InvalidInput(format!("unknown compose verb: {}", other))),
        }
    }
}
