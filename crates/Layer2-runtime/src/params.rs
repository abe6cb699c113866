//! Parameter Merger
//!
//! Turns a creation request into a flat env overlay and folds it into the
//! runtime's `.env` file.

use crate::envfile::{EnvCodec, EnvMap};
use crate::fileop::FileOp;
use crate::model::{RuntimeCreate, RuntimeType, COMPOSE_FILE, ENV_FILE, FORM_FILE};
use rtpanel_foundation::Result;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub const IMAGE_NAME: &str = "IMAGE_NAME";
pub const CONTAINER_PACKAGE_URL: &str = "CONTAINER_PACKAGE_URL";
pub const PHP_EXTENSIONS: &str = "PHP_EXTENSIONS";
pub const CODE_DIR: &str = "CODE_DIR";
pub const NODE_VERSION: &str = "NODE_VERSION";
pub const RUN_INSTALL: &str = "RUN_INSTALL";

/// Build the overlay for a creation request.
///
/// Kind specific keys are injected first, then every parameter is coerced to
/// its string form.
pub fn merge_params(create: &RuntimeCreate) -> EnvMap {
    let mut params = create.params.clone();

    match create.kind {
        RuntimeType::Php => {
            params.insert(IMAGE_NAME.to_string(), Value::String(create.image.clone()));
            if let Some(Value::Array(extensions)) = params.get(PHP_EXTENSIONS) {
                let joined = extensions
                    .iter()
                    .map(|ext| scalar_to_string(ext).to_lowercase())
                    .collect::<Vec<_>>()
                    .join(",");
                params.insert(PHP_EXTENSIONS.to_string(), Value::String(joined));
            }
            params.insert(
                CONTAINER_PACKAGE_URL.to_string(),
                Value::String(create.source.clone()),
            );
        }
        RuntimeType::Node => {
            params.insert(CODE_DIR.to_string(), Value::String(create.code_dir.clone()));
            params.insert(NODE_VERSION.to_string(), Value::String(create.version.clone()));
            let flag = if create.node_config.install { "1" } else { "0" };
            params.insert(RUN_INSTALL.to_string(), Value::String(flag.to_string()));
        }
    }

    params
        .iter()
        .map(|(key, value)| (key.clone(), value_to_string(value)))
        .collect()
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(scalar_to_string)
            .collect::<Vec<_>>()
            .join(","),
        other => scalar_to_string(other),
    }
}

/// Apply an overlay: new values win, existing keys keep their position
pub fn apply_overlay(env: &mut EnvMap, overlay: EnvMap) {
    for (key, value) in overlay {
        env.insert(key, value);
    }
}

/// Content recorded on the runtime after a successful merge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedContent {
    pub compose: Vec<u8>,
    pub env: Vec<u8>,
    /// PHP form definition (`config.json`)
    pub forms: Option<Vec<u8>>,
}

/// Reads a staged project, merges the request into its `.env` and rewrites it
#[derive(Clone)]
pub struct ParamMerger {
    file_op: Arc<dyn FileOp>,
    codec: Arc<dyn EnvCodec>,
}

impl ParamMerger {
    pub fn new(file_op: Arc<dyn FileOp>, codec: Arc<dyn EnvCodec>) -> Self {
        Self { file_op, codec }
    }

    pub fn apply(&self, create: &RuntimeCreate, project_dir: &Path) -> Result<MergedContent> {
        let compose = self.file_op.get_content(&project_dir.join(COMPOSE_FILE))?;
        let env_path = project_dir.join(ENV_FILE);
        let mut env = self.codec.read(&env_path)?;

        let forms = match create.kind {
            RuntimeType::Php => Some(self.file_op.get_content(&project_dir.join(FORM_FILE))?),
            RuntimeType::Node => None,
        };

        let overlay = merge_params(create);
        debug!("Merging {} keys into {}", overlay.len(), env_path.display());
        apply_overlay(&mut env, overlay);

        let content = self.codec.marshal(&env)?;
        self.codec.write(&env, &env_path)?;

        Ok(MergedContent {
            compose,
            env: content.into_bytes(),
            forms,
        })
    }
}
