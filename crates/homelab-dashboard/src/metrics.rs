use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use homelab_camera_stream::SessionMetrics;
use hyper::{
    Request, Response, StatusCode,
    header::{CONTENT_TYPE, HeaderValue},
    server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use tokio::net::TcpListener;

#[derive(Debug, Default, Serialize)]
pub struct Metrics {
    pub streams: Arc<SessionMetrics>,
    pub directory: Arc<DirectoryMetrics>,
}

#[derive(Debug, Default, Serialize)]
pub struct DirectoryMetrics {
    pub roster_fetches: AtomicU64,
    pub roster_failures: AtomicU64,
}

impl DirectoryMetrics {
    pub(crate) fn fetched(&self) {
        self.roster_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn failed(&self) {
        self.roster_failures.fetch_add(1, Ordering::Relaxed);
    }
}

pub async fn start_metrics_server(
    metrics: Arc<Metrics>,
    address: &str,
    port: u16,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr: SocketAddr = format!("{address}:{port}").parse()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Metrics server listening on http://{addr}");

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let metrics = metrics.clone();

        tokio::task::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .serve_connection(io, service_fn(|req| handle_request(req, metrics.clone())))
                .await
            {
                tracing::error!("Error serving connection: {:?}", err);
            }
        });
    }
}

pub fn render(metrics: &Metrics) -> String {
    serde_prometheus::to_string(metrics, None, std::collections::HashMap::new())
        .unwrap_or_else(|e| format!("Error serializing metrics: {e}"))
}

async fn handle_request<B>(
    req: Request<B>,
    metrics: Arc<Metrics>,
) -> Result<Response<String>, hyper::Error> {
    match req.uri().path() {
        "/metrics" => {
            let mut response = Response::new(render(&metrics));
            response.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
            );
            Ok(response)
        }
        _ => {
            let mut response = Response::new("Not Found".to_string());
            *response.status_mut() = StatusCode::NOT_FOUND;
            Ok(response)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_render_every_counter() {
        let metrics = Metrics::default();
        metrics.directory.fetched();
        metrics.directory.failed();

        let output = render(&metrics);
        for name in [
            "connect_attempts",
            "connections_established",
            "retries_scheduled",
            "runtime_errors",
            "bytes_rendered",
            "roster_fetches",
            "roster_failures",
        ] {
            assert!(output.contains(name), "missing {name} in:\n{output}");
        }
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let metrics = Arc::new(Metrics::default());

        let request = Request::builder()
            .uri("/metrics")
            .body(())
            .expect("request");
        let response = handle_request(request, metrics.clone())
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE),
            Some(&HeaderValue::from_static(
                "text/plain; version=0.0.4; charset=utf-8"
            ))
        );

        let request = Request::builder().uri("/other").body(()).expect("request");
        let response = handle_request(request, metrics).await.expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
