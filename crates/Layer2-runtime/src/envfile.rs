//! `.env` file codec
//!
//! Keys keep the order they first appear in; overlays append new keys at the end.

use indexmap::IndexMap;
use rtpanel_foundation::{Error, Result};
use std::path::Path;

/// Ordered environment mapping
pub type EnvMap = IndexMap<String, String>;

/// Environment file collaborator
pub trait EnvCodec: Send + Sync {
    fn read(&self, path: &Path) -> Result<EnvMap>;

    fn write(&self, env: &EnvMap, path: &Path) -> Result<()>;

    fn marshal(&self, env: &EnvMap) -> Result<String>;
}

/// `dotenvy` backed codec
#[derive(Debug, Clone, Copy, Default)]
pub struct DotenvCodec;

impl DotenvCodec {
    pub fn new() -> Self {
        Self
    }
}

impl EnvCodec for DotenvCodec {
    fn read(&self, path: &Path) -> Result<EnvMap> {
        let iter = dotenvy::from_path_iter(path)
            .map_err(|e| Error::EnvFile(format!("Failed to open {}: {}", path.display(), e)))?;
        let mut env = EnvMap::new();
        for item in iter {
            let (key, value) = item
                .map_err(|e| Error::EnvFile(format!("Failed to parse {}: {}", path.display(), e)))?;
            env.insert(key, value);
        }
        Ok(env)
    }

    fn write(&self, env: &EnvMap, path: &Path) -> Result<()> {
        let content = self.marshal(env)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, content)
            .map_err(|e| Error::EnvFile(format!("Failed to write {}: {}", tmp.display(), e)))?;
        std::fs::rename(&tmp, path)
            .map_err(|e| Error::EnvFile(format!("Failed to replace {}: {}", path.display(), e)))
    }

    fn marshal(&self, env: &EnvMap) -> Result<String> {
        let mut out = String::new();
        for (key, value) in env {
            if key.is_empty() || key.contains(['=', '\n']) {
                return Err(Error::EnvFile(format!("invalid key: {:?}", key)));
            }
            out.push_str(key);
            out.push('=');
            out.push_str(&quote(value));
            out.push('\n');
        }
        Ok(out)
    }
}

/// Integers are written bare, everything else double quoted
///
/// `$` is escaped so reads never substitute. A carriage return has no escape
/// form the reader accepts, so it stays raw inside the quotes.
fn quote(value: &str) -> String {
    if value.parse::<i64>().is_ok() {
        return value.to_string();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '$' => quoted.push_str("\\$"),
            '\n' => quoted.push_str("\\n"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
