//! Supervision of one camera's live stream.
//!
//! A [`StreamSessionController`] owns at most one decoder session at a time.
//! Everything that changes its state arrives through `start`/`stop`, through
//! decoder events on its own channel, or through its retry deadline, and
//! every state change is pushed synchronously to the status callback.
//!
//! ```text
//!  connecting ──▶ connected ──▶ error ──(retry_delay)──▶ connecting
//!       │                         ▲
//!       └─────────────────────────┘
//!  any ──stop()──▶ disconnected
//! ```

use std::sync::Arc;

use homelab_camera_client::{models::Camera, stream_url};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::{Instant, sleep_until},
};
use tracing::{debug, error, info, warn};

use crate::{
    Error, StreamConfig,
    decoder::{ConnectRequest, DecoderEvent, DecoderSession, EventSender, StreamDecoder},
    metrics::{self, SessionMetrics},
    render::RenderTarget,
    status::{StreamState, StreamStatus},
};

pub type StatusCallback = Box<dyn FnMut(&StreamStatus) + Send>;

pub struct StreamSessionController<D: StreamDecoder> {
    decoder: D,
    config: StreamConfig,
    metrics: Arc<SessionMetrics>,
    on_status: Option<StatusCallback>,
    status: StreamStatus,
    camera: Option<Camera>,
    target: Option<Arc<dyn RenderTarget>>,
    session: Option<D::Session>,
    established: bool,
    retry_at: Option<Instant>,
    generation: u64,
    events_tx: mpsc::UnboundedSender<(u64, DecoderEvent)>,
    events_rx: mpsc::UnboundedReceiver<(u64, DecoderEvent)>,
}

enum Wake {
    Decoder(u64, DecoderEvent),
    Retry,
    Idle,
}

impl<D: StreamDecoder> StreamSessionController<D> {
    pub fn new(decoder: D, config: StreamConfig, metrics: Arc<SessionMetrics>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            decoder,
            config,
            metrics,
            on_status: None,
            status: StreamStatus::new(StreamState::Disconnected, "Not started"),
            camera: None,
            target: None,
            session: None,
            established: false,
            retry_at: None,
            generation: 0,
            events_tx,
            events_rx,
        }
    }

    pub fn on_status(mut self, callback: impl FnMut(&StreamStatus) + Send + 'static) -> Self {
        self.on_status = Some(Box::new(callback));
        self
    }

    pub fn status(&self) -> &StreamStatus {
        &self.status
    }

    /// Whether a decoder session is currently alive.
    pub fn is_live(&self) -> bool {
        self.session.is_some()
    }

    pub fn retry_pending(&self) -> bool {
        self.retry_at.is_some()
    }

    /// Begins streaming `camera` into `target`, tearing down any previous
    /// session first.
    pub fn start(&mut self, camera: Camera, target: Option<Arc<dyn RenderTarget>>) {
        self.retry_at = None;
        self.release_session();

        let enabled = camera.enabled;
        self.camera = Some(camera);
        self.target = target;

        if !enabled {
            warn!(camera_id = self.camera_id(), "Camera is disabled");
            self.fail(Error::DisabledCamera);
            return;
        }

        self.connect();
    }

    /// Cancels a pending retry, then destroys the live decoder. Safe to call
    /// at any time.
    pub fn stop(&mut self) {
        self.retry_at = None;
        self.release_session();
        self.target = None;

        if let Some(camera) = self.camera.take() {
            info!(camera_id = camera.id, "Stream stopped");
            self.set_status(StreamStatus::disconnected());
        }
    }

    /// Waits for the next decoder event or the retry deadline and applies it.
    ///
    /// Cancel safe: dropping the future loses nothing.
    pub async fn tick(&mut self) {
        let retry_at = self.retry_at;

        let wake = tokio::select! {
            Some((generation, event)) = self.events_rx.recv() => Wake::Decoder(generation, event),
            _ = sleep_until(retry_at.unwrap_or_else(Instant::now)), if retry_at.is_some() => Wake::Retry,
            else => Wake::Idle,
        };

        match wake {
            Wake::Decoder(generation, event) => self.handle_event(generation, event),
            Wake::Retry => {
                self.retry_at = None;
                debug!(camera_id = self.camera_id(), "Retrying stream");
                self.connect();
            }
            Wake::Idle => {}
        }
    }

    /// Hands the controller to its own task; the returned handle stops it.
    pub fn spawn(
        mut self,
        camera: Camera,
        target: Option<Arc<dyn RenderTarget>>,
    ) -> SessionHandle {
        let camera_id = camera.id.clone();
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            self.start(camera, target);
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    _ = self.tick() => {}
                }
            }
            self.stop();
        });

        SessionHandle {
            camera_id,
            stop_tx,
            task,
        }
    }

    fn camera_id(&self) -> &str {
        self.camera.as_ref().map(|c| c.id.as_str()).unwrap_or_default()
    }

    fn connect(&mut self) {
        let Some(camera_id) = self.camera.as_ref().map(|c| c.id.clone()) else {
            return;
        };

        info!(camera_id, "Attempting to connect...");
        self.set_status(StreamStatus::connecting());

        // The target may have been torn down while a retry was pending
        let Some(target) = self.target.clone().filter(|t| t.is_attached()) else {
            error!(camera_id, "Render target not found");
            self.fail(Error::RenderTargetMissing);
            return;
        };

        metrics::incr(&self.metrics.connect_attempts);

        let url = match stream_url(&self.config.proxy_url, &camera_id) {
            Ok(url) => url,
            Err(e) => {
                error!(camera_id, err = ?e, "Invalid stream URL");
                self.fail(Error::from(e));
                return;
            }
        };

        self.generation += 1;
        self.established = false;

        let request = ConnectRequest {
            camera_id: camera_id.clone(),
            url,
            target,
            events: EventSender::new(self.generation, self.events_tx.clone()),
        };

        match self.decoder.connect(request) {
            Ok(session) => {
                debug!(camera_id, generation = self.generation, "Decoder initialized");
                self.session = Some(session);
            }
            Err(e) => {
                error!(camera_id, err = ?e, "Failed to initialize decoder");
                self.fail(Error::DecoderInit(e.to_string()));
            }
        }
    }

    fn handle_event(&mut self, generation: u64, event: DecoderEvent) {
        if generation != self.generation || self.session.is_none() {
            debug!(
                camera_id = self.camera_id(),
                generation,
                ?event,
                "Dropping event from retired session"
            );
            return;
        }

        match event {
            DecoderEvent::SourceEstablished => {
                if self.established {
                    return;
                }
                self.established = true;
                metrics::incr(&self.metrics.connections_established);
                info!(camera_id = self.camera_id(), "Connected to camera feed");
                self.set_status(StreamStatus::connected());
            }
            DecoderEvent::SourceCompleted => {
                self.runtime_fault("Camera feed ended", None);
            }
            DecoderEvent::Stalled => {
                self.runtime_fault("Playback stalled", None);
            }
            DecoderEvent::Error(reason) => {
                self.runtime_fault("Video playback error", Some(reason));
            }
        }
    }

    fn runtime_fault(&mut self, message: &str, reason: Option<String>) {
        metrics::incr(&self.metrics.runtime_errors);
        warn!(camera_id = self.camera_id(), reason, "{message}");
        self.fail(Error::StreamRuntime(message.to_string()));
    }

    fn fail(&mut self, error: Error) {
        self.set_status(StreamStatus::from(&error));

        if error.is_recoverable() {
            self.release_session();
            self.schedule_retry();
        }
    }

    fn schedule_retry(&mut self) {
        if self.retry_at.is_some() {
            return;
        }

        metrics::incr(&self.metrics.retries_scheduled);
        debug!(
            camera_id = self.camera_id(),
            delay = ?self.config.retry_delay,
            "Scheduling reconnect"
        );
        self.retry_at = Some(Instant::now() + self.config.retry_delay);
    }

    fn release_session(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(camera_id = self.camera_id(), "Cleaning up decoder instance");
            session.destroy();
        }
    }

    fn set_status(&mut self, status: StreamStatus) {
        self.status = status;
        if let Some(callback) = self.on_status.as_mut() {
            callback(&self.status);
        }
    }
}

/// Handle to a controller running on its own task.
pub struct SessionHandle {
    camera_id: String,
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    /// Stops the controller and waits for its teardown to finish.
    pub async fn stop(self) {
        let SessionHandle {
            camera_id,
            stop_tx,
            task,
        } = self;

        // A finished task has already dropped the receiver
        let _ = stop_tx.send(());
        if let Err(e) = task.await {
            warn!(camera_id, err = ?e, "Stream session task failed");
        }
    }
}
