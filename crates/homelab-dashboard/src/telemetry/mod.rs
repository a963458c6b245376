use opentelemetry::global;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use tokio::task::JoinHandle;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    config::Config,
    telemetry::{logging::loki_layer, tracing::tracer},
};

pub mod logging;
pub mod tracing;

const DEFAULT_FILTER: &str = "info,reqwest=warn,hyper=warn,tungstenite=warn";

/// Installs the global subscriber. Returns the Loki shipping task when one was configured.
pub fn init(config: &Config) -> Option<JoinHandle<()>> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let mut layers: Vec<Box<dyn Layer<_> + Send + Sync>> = vec![
        tracing_subscriber::fmt::layer().with_ansi(true).boxed(),
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
            .boxed(),
    ];

    let mut loki_task = None;

    if let Some(loki_config) = config.logging.as_ref().and_then(|c| c.loki.clone()) {
        match loki_layer(loki_config) {
            Ok((layer, task)) => {
                layers.push(Box::new(layer));
                loki_task = Some(task);
            }
            Err(e) => eprintln!("Loki logging disabled: {e}"),
        }
    }

    if let Some(tempo_config) = config.tracing.as_ref().and_then(|c| c.tempo.clone()) {
        match tracer(tempo_config) {
            Ok(tracer) => layers.push(Box::new(
                tracing_opentelemetry::layer()
                    .with_tracer(tracer)
                    .with_filter(tracing_core::metadata::LevelFilter::INFO),
            )),
            Err(e) => eprintln!("Tempo tracing disabled: {e}"),
        }
    }

    tracing_subscriber::registry().with(layers).init();

    loki_task.map(tokio::spawn)
}
