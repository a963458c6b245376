use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    config::DirectoryConfig,
    error::{Error, Result},
    models::{Camera, CamerasRawResponse, HlsResponse},
};

pub mod config;
pub mod error;
pub mod models;

/// Source of the camera roster.
#[async_trait]
pub trait CameraDirectory: Send + Sync {
    async fn list_cameras(&self) -> Result<Vec<Camera>>;
}

pub struct DirectoryClient {
    client: Client,
    base_url: Url,
}

impl DirectoryClient {
    pub fn new(config: DirectoryConfig) -> Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(!config.verify_ssl)
            .timeout(config.timeout)
            .build()?;

        let mut base_url = config.base_url;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(DirectoryClient { client, base_url })
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_cameras(&self) -> Result<Vec<Camera>> {
        let cameras_url = self.base_url.join("cameras")?;

        let response = self.client.get(cameras_url).send().await?;
        let response = check_status(response)?;

        let cameras_value: Value = response.json().await?;
        let cameras_raw: CamerasRawResponse = serde_json::from_value(cameras_value)?;

        debug!(count = cameras_raw.cameras.len(), "Fetched camera roster");
        Ok(cameras_raw.cameras)
    }

    #[tracing::instrument(skip(self))]
    pub async fn start_hls(&self, camera_id: &str) -> Result<HlsResponse> {
        let response = self.post_hls(camera_id, "start").await?;
        info!(
            camera_id,
            status = %response.status,
            hls_url = ?response.hls_url,
            "Requested HLS transcoding"
        );
        Ok(response)
    }

    #[tracing::instrument(skip(self))]
    pub async fn stop_hls(&self, camera_id: &str) -> Result<HlsResponse> {
        let response = self.post_hls(camera_id, "stop").await?;
        info!(camera_id, status = %response.status, "Stopped HLS transcoding");
        Ok(response)
    }

    async fn post_hls(&self, camera_id: &str, action: &str) -> Result<HlsResponse> {
        let mut hls_url = self.base_url.clone();
        hls_url
            .path_segments_mut()
            .map_err(|_| Error::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(["cameras", camera_id, "hls", action]);

        let response = self.client.post(hls_url).send().await?;
        let response = check_status(response)?;

        let hls_value: Value = response.json().await?;
        Ok(serde_json::from_value(hls_value)?)
    }
}

#[async_trait]
impl CameraDirectory for DirectoryClient {
    async fn list_cameras(&self) -> Result<Vec<Camera>> {
        DirectoryClient::list_cameras(self).await
    }
}

fn check_status(response: Response) -> Result<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        warn!(
            status = %response.status(),
            url = %response.url(),
            "Directory request failed"
        );
        Err(Error::Fetch)
    }
}

/// Transport URL of a camera's MPEG-TS feed: `<proxy>/stream/<camera_id>`.
pub fn stream_url(proxy_url: &Url, camera_id: &str) -> Result<Url> {
    let mut stream = proxy_url.clone();
    stream
        .path_segments_mut()
        .map_err(|_| Error::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .extend(["stream", camera_id]);
    Ok(stream)
}
