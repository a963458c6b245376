use std::collections::HashMap;

use base64::Engine;

use crate::{Result, config::LokiConfig};

pub(crate) fn loki_layer(
    loki_config: LokiConfig,
) -> Result<(tracing_loki::Layer, tracing_loki::BackgroundTask)> {
    let url = loki_config
        .url
        .parse()
        .map_err(|e| crate::Error::Logging(format!("Invalid Loki URL: {e}")))?;

    let mut labels = HashMap::new();
    labels.insert("service".to_string(), env!("CARGO_PKG_NAME").to_string());

    if let Some(custom_labels) = loki_config.labels {
        labels.extend(custom_labels);
    }

    let extra_fields = loki_config
        .username
        .zip(loki_config.password)
        .map(|(username, password)| basic_auth(&username, &password))
        .map(|header| HashMap::from([("Authorization".to_string(), header)]))
        .unwrap_or_default();

    tracing_loki::layer(url, labels, extra_fields)
        .map_err(|e| crate::Error::Logging(format!("Failed to create Loki layer: {e}")))
}

fn basic_auth(username: &str, password: &str) -> String {
    format!(
        "Basic {}",
        base64::prelude::BASE64_STANDARD.encode(format!("{username}:{password}"))
    )
}
