use std::{sync::Arc, time::Duration};

use futures_util::StreamExt;
use tokio::{task::JoinHandle, time::timeout};
use tokio_tungstenite::{
    Connector, connect_async_tls_with_config,
    tungstenite::{Message, client::IntoClientRequest, handshake::client::Request},
};
use tracing::{debug, info, warn};

use crate::{
    Error, Result, StreamConfig,
    decoder::{ConnectRequest, DecoderEvent, DecoderSession, EventSender, StreamDecoder},
    metrics::{self, SessionMetrics},
    render::RenderTarget,
};

/// Decoder that pulls the proxy's MPEG-TS feed over a WebSocket and hands
/// every binary frame to the render target.
#[derive(Clone)]
pub struct WebSocketDecoder {
    verify_ssl: bool,
    stall_timeout: Duration,
    metrics: Arc<SessionMetrics>,
}

impl WebSocketDecoder {
    pub fn new(config: &StreamConfig, metrics: Arc<SessionMetrics>) -> Self {
        Self {
            verify_ssl: config.verify_ssl,
            stall_timeout: config.stall_timeout,
            metrics,
        }
    }
}

pub struct WebSocketSession {
    task: JoinHandle<()>,
}

impl DecoderSession for WebSocketSession {
    fn destroy(self) {
        self.task.abort();
    }
}

impl StreamDecoder for WebSocketDecoder {
    type Session = WebSocketSession;

    fn connect(&mut self, request: ConnectRequest) -> Result<WebSocketSession> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::DecoderInit(e.to_string()))?;

        let client_request = request.url.as_str().into_client_request()?;

        let connector = match self.verify_ssl {
            true => None,
            false => {
                // Self-signed proxy certificates are common on a homelab LAN
                let tls_connector = native_tls::TlsConnector::builder()
                    .danger_accept_invalid_certs(true)
                    .danger_accept_invalid_hostnames(true)
                    .build()?;
                Some(Connector::NativeTls(tls_connector))
            }
        };

        debug!(camera_id = request.camera_id, url = %request.url, "Opening stream");

        let pump = Pump {
            camera_id: request.camera_id,
            target: request.target,
            events: request.events,
            stall_timeout: self.stall_timeout,
            metrics: self.metrics.clone(),
        };
        let task = runtime.spawn(pump.run(client_request, connector));

        Ok(WebSocketSession { task })
    }
}

struct Pump {
    camera_id: String,
    target: Arc<dyn RenderTarget>,
    events: EventSender,
    stall_timeout: Duration,
    metrics: Arc<SessionMetrics>,
}

impl Pump {
    async fn run(self, request: Request, connector: Option<Connector>) {
        let event = self.pump(request, connector).await;
        if !self.events.send(event) {
            debug!(camera_id = self.camera_id, "Session owner went away");
        }
    }

    /// Streams frames until the session ends, returning the terminal event.
    async fn pump(&self, request: Request, connector: Option<Connector>) -> DecoderEvent {
        let handshake = connect_async_tls_with_config(request, None, false, connector);
        let mut ws_stream = match timeout(self.stall_timeout, handshake).await {
            Ok(Ok((ws_stream, _))) => ws_stream,
            Ok(Err(e)) => return DecoderEvent::Error(e.to_string()),
            Err(_) => {
                warn!(camera_id = self.camera_id, "Stream handshake stalled");
                return DecoderEvent::Stalled;
            }
        };

        let mut established = false;

        loop {
            let Ok(message) = timeout(self.stall_timeout, ws_stream.next()).await else {
                warn!(camera_id = self.camera_id, "Playback stalled");
                return DecoderEvent::Stalled;
            };

            match message {
                Some(Ok(Message::Binary(chunk))) => {
                    if let Err(e) = self.target.render(&chunk).await {
                        return DecoderEvent::Error(format!("Render target failed: {e}"));
                    }
                    metrics::add(&self.metrics.bytes_rendered, chunk.len() as u64);

                    if !established {
                        established = true;
                        info!(camera_id = self.camera_id, "MPEG source established");
                        self.events.send(DecoderEvent::SourceEstablished);
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!(camera_id = self.camera_id, "MPEG source completed");
                    return DecoderEvent::SourceCompleted;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return DecoderEvent::Error(e.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures_util::SinkExt;
    use tokio::{net::TcpListener, sync::mpsc};
    use url::Url;

    use super::*;
    use crate::render::DiscardTarget;

    fn decoder_for(stall_timeout: Duration) -> (WebSocketDecoder, Arc<SessionMetrics>) {
        let mut config = StreamConfig::new(Url::parse("ws://127.0.0.1").expect("url"));
        config.stall_timeout = stall_timeout;
        let metrics = Arc::new(SessionMetrics::default());
        (WebSocketDecoder::new(&config, metrics.clone()), metrics)
    }

    fn request(
        url: Url,
        target: Arc<DiscardTarget>,
    ) -> (ConnectRequest, mpsc::UnboundedReceiver<(u64, DecoderEvent)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let request = ConnectRequest {
            camera_id: "cam-1".to_string(),
            url,
            target,
            events: EventSender::new(7, tx),
        };
        (request, rx)
    }

    #[tokio::test]
    async fn test_streams_frames_until_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(stream)
                .await
                .expect("handshake");
            ws.send(Message::Binary(vec![0x47, 0x40, 0x11].into()))
                .await
                .expect("send");
            ws.send(Message::Binary(vec![0x47, 0x00].into()))
                .await
                .expect("send");
            ws.send(Message::Close(None)).await.expect("close");
        });

        let (mut decoder, metrics) = decoder_for(Duration::from_secs(5));
        let target = Arc::new(DiscardTarget::new());
        let url = Url::parse(&format!("ws://{addr}/stream/cam-1")).expect("url");
        let (request, mut rx) = request(url, target.clone());

        let _session = decoder.connect(request).expect("connect");

        assert_eq!(rx.recv().await, Some((7, DecoderEvent::SourceEstablished)));
        assert_eq!(rx.recv().await, Some((7, DecoderEvent::SourceCompleted)));
        assert_eq!(target.bytes_rendered(), 5);
        assert_eq!(
            metrics
                .bytes_rendered
                .load(std::sync::atomic::Ordering::Relaxed),
            5
        );
    }

    #[tokio::test]
    async fn test_reports_stall_when_source_goes_quiet() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let ws = tokio_tungstenite::accept_async(stream)
                .await
                .expect("handshake");
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(ws);
        });

        let (mut decoder, _) = decoder_for(Duration::from_millis(50));
        let url = Url::parse(&format!("ws://{addr}/stream/cam-1")).expect("url");
        let (request, mut rx) = request(url, Arc::new(DiscardTarget::new()));

        let _session = decoder.connect(request).expect("connect");

        assert_eq!(rx.recv().await, Some((7, DecoderEvent::Stalled)));
    }

    #[tokio::test]
    async fn test_unfinished_handshake_reports_stall() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            // Accept the socket but never answer the upgrade request
            let (stream, _) = listener.accept().await.expect("accept");
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(stream);
        });

        let (mut decoder, _) = decoder_for(Duration::from_millis(50));
        let url = Url::parse(&format!("ws://{addr}/stream/cam-1")).expect("url");
        let (request, mut rx) = request(url, Arc::new(DiscardTarget::new()));

        let _session = decoder.connect(request).expect("connect");

        let event = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("handshake stall reported");
        assert_eq!(event, Some((7, DecoderEvent::Stalled)));
    }

    #[tokio::test]
    async fn test_unreachable_proxy_reports_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let (mut decoder, _) = decoder_for(Duration::from_secs(5));
        let url = Url::parse(&format!("ws://{addr}/stream/cam-1")).expect("url");
        let (request, mut rx) = request(url, Arc::new(DiscardTarget::new()));

        let _session = decoder.connect(request).expect("connect");

        assert!(matches!(
            rx.recv().await,
            Some((7, DecoderEvent::Error(_)))
        ));
    }

    #[tokio::test]
    async fn test_destroy_stops_delivery() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let ws = tokio_tungstenite::accept_async(stream)
                .await
                .expect("handshake");
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(ws);
        });

        let (mut decoder, _) = decoder_for(Duration::from_millis(200));
        let url = Url::parse(&format!("ws://{addr}/stream/cam-1")).expect("url");
        let (request, mut rx) = request(url, Arc::new(DiscardTarget::new()));

        decoder.connect(request).expect("connect").destroy();

        // The aborted pump drops its sender without reporting anything
        assert_eq!(rx.recv().await, None);
    }
}
