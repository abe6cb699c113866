//! Container engine image client

use async_trait::async_trait;
use bollard::image::RemoveImageOptions;
use bollard::Docker;
use rtpanel_foundation::{Error, Result};
use std::sync::Arc;
use tracing::info;

/// Image lookups and removal
#[async_trait]
pub trait ImageClient: Send + Sync {
    /// Resolve an image reference (`name:tag`) to its id
    async fn image_id_by_name(&self, name: &str) -> Result<String>;

    async fn delete_image(&self, id: &str) -> Result<()>;
}

/// Creates engine clients on demand; connecting may fail
pub trait ImageClientFactory: Send + Sync {
    fn new_client(&self) -> Result<Arc<dyn ImageClient>>;
}

/// `bollard` backed client
pub struct DockerImageClient {
    docker: Docker,
}

impl DockerImageClient {
    pub fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| Error::Docker(format!("Failed to connect to docker: {}", e)))?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl ImageClient for DockerImageClient {
    async fn image_id_by_name(&self, name: &str) -> Result<String> {
        let inspect = self
            .docker
            .inspect_image(name)
            .await
            .map_err(|e| Error::Docker(format!("Failed to inspect image {}: {}", name, e)))?;
        inspect
            .id
            .ok_or_else(|| Error::Docker(format!("Image {} has no id", name)))
    }

    async fn delete_image(&self, id: &str) -> Result<()> {
        info!("Removing image {}", id);
        let options = RemoveImageOptions {
            force: false,
            noprune: false,
        };
        self.docker
            .remove_image(id, Some(options), None)
            .await
            .map_err(|e| Error::Docker(format!("Failed to remove image {}: {}", id, e)))?;
        Ok(())
    }
}

/// Connects to the local docker daemon
#[derive(Debug, Clone, Copy, Default)]
pub struct DockerConnector;

impl ImageClientFactory for DockerConnector {
    fn new_client(&self) -> Result<Arc<dyn ImageClient>> {
        Ok(Arc::new(DockerImageClient::connect()?))
    }
}
