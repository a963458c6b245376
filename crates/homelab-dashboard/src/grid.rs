//! The camera grid: loads the roster once and supervises one stream session per camera.

use std::{
    collections::BTreeMap,
    fmt::Write,
    sync::{Arc, Mutex},
};

use homelab_camera_client::{CameraDirectory, models::Camera};
use homelab_camera_stream::{
    RenderTarget, SessionHandle, StreamConfig, StreamDecoder, StreamSessionController,
    StreamStatus,
};
use tracing::{error, info};

use crate::metrics::Metrics;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Roster {
    Loading,
    Failed(String),
    Empty,
    Ready(Vec<Camera>),
}

type StatusTable = Arc<Mutex<BTreeMap<String, StreamStatus>>>;

pub struct CameraGrid {
    roster: Roster,
    statuses: StatusTable,
    sessions: Vec<SessionHandle>,
    metrics: Arc<Metrics>,
}

impl CameraGrid {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            roster: Roster::Loading,
            statuses: StatusTable::default(),
            sessions: Vec::new(),
            metrics,
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn status_of(&self, camera_id: &str) -> Option<StreamStatus> {
        self.statuses
            .lock()
            .ok()
            .and_then(|statuses| statuses.get(camera_id).cloned())
    }

    /// Fetches the roster. Running sessions are stopped first, so this is also the retry path.
    #[tracing::instrument(skip_all)]
    pub async fn load(&mut self, directory: &dyn CameraDirectory) -> &Roster {
        self.unmount().await;
        self.roster = Roster::Loading;
        self.metrics.directory.fetched();

        self.roster = match directory.list_cameras().await {
            Ok(cameras) if cameras.is_empty() => Roster::Empty,
            Ok(cameras) => {
                info!(count = cameras.len(), "Loaded camera roster");
                Roster::Ready(cameras)
            }
            Err(e) => {
                self.metrics.directory.failed();
                error!(err = ?e, "Error fetching cameras");
                Roster::Failed("Failed to fetch cameras".to_string())
            }
        };

        &self.roster
    }

    /// Starts one session per camera in the roster. Does nothing unless the roster is ready.
    pub fn mount<D, F, T>(&mut self, config: &StreamConfig, mut decoder: F, targets: T)
    where
        D: StreamDecoder,
        F: FnMut(&Camera) -> D,
        T: Fn(&Camera) -> Option<Arc<dyn RenderTarget>>,
    {
        let Roster::Ready(cameras) = &self.roster else {
            return;
        };

        for camera in cameras {
            let statuses = self.statuses.clone();
            let camera_id = camera.id.clone();

            let controller = StreamSessionController::new(
                decoder(camera),
                config.clone(),
                self.metrics.streams.clone(),
            )
            .on_status(move |status| {
                info!(
                    camera_id,
                    state = %status.state,
                    message = status.message,
                    "Stream status changed"
                );
                if let Ok(mut statuses) = statuses.lock() {
                    statuses.insert(camera_id.clone(), status.clone());
                }
            });

            self.sessions
                .push(controller.spawn(camera.clone(), targets(camera)));
        }
    }

    /// Stops every session and waits for their teardown.
    pub async fn unmount(&mut self) {
        for session in self.sessions.drain(..) {
            session.stop().await;
        }
    }

    pub fn render(&self) -> String {
        match &self.roster {
            Roster::Loading => "Loading cameras...\n".to_string(),
            Roster::Failed(message) => format!("{message}\n\n  [ Retry ]\n"),
            Roster::Empty => {
                "No Cameras Found\nNo cameras are currently configured in the system.\n"
                    .to_string()
            }
            Roster::Ready(cameras) => self.render_tiles(cameras),
        }
    }

    fn render_tiles(&self, cameras: &[Camera]) -> String {
        let mut out = String::new();
        let noun = if cameras.len() == 1 { "camera" } else { "cameras" };
        let _ = writeln!(out, "Live Camera Feeds ({} {noun} available)", cameras.len());

        for camera in cameras {
            let status = self
                .status_of(&camera.id)
                .unwrap_or_else(StreamStatus::connecting);

            let _ = write!(out, "\n  {}", camera.name);
            if let Some(location) = &camera.location {
                let _ = write!(out, " @ {location}");
            }
            let _ = writeln!(
                out,
                " ({}x{})",
                camera.resolution.width, camera.resolution.height
            );
            let _ = writeln!(out, "    [{}] {}", status.state, status.message);
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use homelab_camera_client::{
        error::{Error as DirectoryError, Result as DirectoryResult},
        models::{CameraStatus, Resolution},
    };
    use homelab_camera_stream::{
        ConnectRequest, DecoderSession, DiscardTarget, Result as StreamResult, StreamState,
    };
    use url::Url;

    use super::*;

    struct StaticDirectory(Option<Vec<Camera>>);

    #[async_trait]
    impl CameraDirectory for StaticDirectory {
        async fn list_cameras(&self) -> DirectoryResult<Vec<Camera>> {
            self.0.clone().ok_or(DirectoryError::Fetch)
        }
    }

    /// Decoder whose sessions never produce events.
    struct IdleDecoder;

    struct IdleSession;

    impl DecoderSession for IdleSession {
        fn destroy(self) {}
    }

    impl StreamDecoder for IdleDecoder {
        type Session = IdleSession;

        fn connect(&mut self, _request: ConnectRequest) -> StreamResult<IdleSession> {
            Ok(IdleSession)
        }
    }

    fn camera(id: &str, name: &str, enabled: bool) -> Camera {
        Camera {
            id: id.to_string(),
            name: name.to_string(),
            location: Some("Garage".to_string()),
            enabled,
            resolution: Resolution::new(1920, 1080),
            status: CameraStatus::default(),
        }
    }

    fn stream_config() -> StreamConfig {
        StreamConfig::new(Url::parse("ws://127.0.0.1:8765").expect("url"))
    }

    fn discard(_: &Camera) -> Option<Arc<dyn RenderTarget>> {
        Some(Arc::new(DiscardTarget::new()))
    }

    async fn wait_for_statuses(grid: &CameraGrid, ids: &[&str]) {
        for _ in 0..100 {
            if ids.iter().all(|id| grid.status_of(id).is_some()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("sessions never reported a status");
    }

    #[test]
    fn test_initial_view_is_loading() {
        let grid = CameraGrid::new(Arc::new(Metrics::default()));
        assert_eq!(grid.roster(), &Roster::Loading);
        assert_eq!(grid.render(), "Loading cameras...\n");
    }

    #[tokio::test]
    async fn test_fetch_failure_shows_retry_and_mounts_nothing() {
        let metrics = Arc::new(Metrics::default());
        let mut grid = CameraGrid::new(metrics.clone());

        let roster = grid.load(&StaticDirectory(None)).await;
        assert!(matches!(roster, Roster::Failed(_)));

        grid.mount(&stream_config(), |_| IdleDecoder, discard);
        assert_eq!(grid.session_count(), 0);

        let view = grid.render();
        assert!(view.contains("Failed to fetch cameras"));
        assert!(view.contains("Retry"));
        assert_eq!(
            metrics
                .directory
                .roster_failures
                .load(std::sync::atomic::Ordering::Relaxed),
            1
        );
    }

    #[tokio::test]
    async fn test_empty_roster() {
        let mut grid = CameraGrid::new(Arc::new(Metrics::default()));

        grid.load(&StaticDirectory(Some(Vec::new()))).await;
        grid.mount(&stream_config(), |_| IdleDecoder, discard);

        assert_eq!(grid.roster(), &Roster::Empty);
        assert_eq!(grid.session_count(), 0);
        assert_eq!(
            grid.render(),
            "No Cameras Found\nNo cameras are currently configured in the system.\n"
        );
    }

    #[tokio::test]
    async fn test_mounts_one_session_per_camera() {
        let mut grid = CameraGrid::new(Arc::new(Metrics::default()));
        let cameras = vec![
            camera("porch", "Front Porch", true),
            camera("shed", "Shed", false),
        ];

        grid.load(&StaticDirectory(Some(cameras))).await;
        grid.mount(&stream_config(), |_| IdleDecoder, discard);
        assert_eq!(grid.session_count(), 2);

        wait_for_statuses(&grid, &["porch", "shed"]).await;

        let view = grid.render();
        assert!(view.starts_with("Live Camera Feeds (2 cameras available)"));
        assert!(view.contains("Front Porch @ Garage (1920x1080)"));
        assert!(view.contains("[connecting] Connecting to camera..."));
        assert!(view.contains("[error] Camera is disabled"));

        grid.unmount().await;
        assert_eq!(grid.session_count(), 0);
        assert_eq!(
            grid.status_of("porch").map(|s| s.state),
            Some(StreamState::Disconnected)
        );
    }

    #[tokio::test]
    async fn test_missing_target_is_reported_per_tile() {
        let mut grid = CameraGrid::new(Arc::new(Metrics::default()));

        grid.load(&StaticDirectory(Some(vec![camera("porch", "Porch", true)])))
            .await;
        grid.mount(&stream_config(), |_| IdleDecoder, |_| None);

        wait_for_statuses(&grid, &["porch"]).await;
        for _ in 0..100 {
            if grid.status_of("porch").map(|s| s.state) == Some(StreamState::Error) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(grid.render().contains("[error] Canvas element not found"));
        grid.unmount().await;
    }

    #[tokio::test]
    async fn test_reload_after_failure_stops_previous_sessions() {
        let mut grid = CameraGrid::new(Arc::new(Metrics::default()));

        grid.load(&StaticDirectory(Some(vec![camera("porch", "Porch", true)])))
            .await;
        grid.mount(&stream_config(), |_| IdleDecoder, discard);
        assert_eq!(grid.session_count(), 1);

        grid.load(&StaticDirectory(None)).await;
        assert_eq!(grid.session_count(), 0);
        assert!(matches!(grid.roster(), Roster::Failed(_)));
    }
}
