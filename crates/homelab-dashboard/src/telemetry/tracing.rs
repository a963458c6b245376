use std::time::Duration;

use opentelemetry::{KeyValue, trace::TracerProvider};
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{
    Resource,
    trace::{BatchSpanProcessor, SdkTracer, SdkTracerProvider},
};

use crate::{Result, config::TempoConfig};

const SERVICE_NAME: &str = env!("CARGO_PKG_NAME");
const SERVICE_NAMESPACE: &str = "homelab";
const EXPORT_TIMEOUT: Duration = Duration::from_secs(3);

/// Tracer exporting spans to Tempo over OTLP/gRPC.
pub fn tracer(config: TempoConfig) -> Result<SdkTracer> {
    let exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint(&config))
        .with_timeout(EXPORT_TIMEOUT)
        .build()
        .map_err(|e| crate::Error::Tracing(format!("Failed to create OTLP exporter: {e}")))?;

    let provider = SdkTracerProvider::builder()
        .with_span_processor(BatchSpanProcessor::builder(exporter).build())
        .with_resource(resource())
        .build();

    Ok(provider.tracer(SERVICE_NAME))
}

fn resource() -> Resource {
    Resource::builder()
        .with_service_name(SERVICE_NAME)
        .with_attributes([
            KeyValue::new("service.namespace", SERVICE_NAMESPACE),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        ])
        .build()
}

fn endpoint(config: &TempoConfig) -> String {
    format!("{}:{}", config.url.trim_end_matches('/'), config.port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_url_and_port() {
        let config = TempoConfig {
            url: "http://tempo.homelab/".to_string(),
            port: 4317,
        };
        assert_eq!(endpoint(&config), "http://tempo.homelab:4317");
    }
}
