use std::{collections::HashMap, sync::Arc};

use homelab_camera_client::{DirectoryClient, models::Camera};
use homelab_camera_stream::{DiscardTarget, FileTarget, RenderTarget, WebSocketDecoder};
use tracing::error;

use crate::{config::Config, metrics::Metrics};

pub struct Context {
    pub config: Config,
    pub directory: DirectoryClient,
    pub metrics: Arc<Metrics>,
}

impl Context {
    pub fn new(config: Config) -> crate::Result<Self> {
        let directory = DirectoryClient::new(config.directory.clone())?;

        Ok(Self {
            config,
            directory,
            metrics: Arc::new(Metrics::default()),
        })
    }

    pub fn decoder(&self) -> WebSocketDecoder {
        WebSocketDecoder::new(&self.config.stream, self.metrics.streams.clone())
    }

    /// Render target for one camera tile. `None` when the recording file cannot be opened.
    pub async fn render_target(&self, camera: &Camera) -> Option<Arc<dyn RenderTarget>> {
        let Some(output) = &self.config.output else {
            return Some(Arc::new(DiscardTarget::new()));
        };

        let path = output.directory.join(format!("{}.ts", camera.id));
        match FileTarget::create(&path).await {
            Ok(target) => Some(Arc::new(target)),
            Err(e) => {
                error!(
                    camera_id = camera.id,
                    path = %path.display(),
                    err = ?e,
                    "Failed to open render target"
                );
                None
            }
        }
    }

    /// Opens a target per camera, keyed by camera id. Cameras whose target failed are absent.
    pub async fn render_targets(
        &self,
        cameras: &[Camera],
    ) -> HashMap<String, Arc<dyn RenderTarget>> {
        let mut targets = HashMap::new();
        for camera in cameras {
            if let Some(target) = self.render_target(camera).await {
                targets.insert(camera.id.clone(), target);
            }
        }
        targets
    }
}
