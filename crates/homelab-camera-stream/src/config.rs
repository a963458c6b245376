use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "kebab-case"))]
pub struct StreamConfig {
    /// Base of the WebSocket proxy, e.g. `wss://camerawsproxy.internal.com`.
    pub proxy_url: Url,
    #[serde(
        default = "default_retry_delay",
        deserialize_with = "non_zero_duration",
        serialize_with = "humantime_serde::serialize"
    )]
    pub retry_delay: Duration,
    #[serde(
        default = "default_stall_timeout",
        deserialize_with = "non_zero_duration",
        serialize_with = "humantime_serde::serialize"
    )]
    pub stall_timeout: Duration,
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
}

impl StreamConfig {
    pub fn new(proxy_url: Url) -> Self {
        Self {
            proxy_url,
            retry_delay: default_retry_delay(),
            stall_timeout: default_stall_timeout(),
            verify_ssl: default_verify_ssl(),
        }
    }
}

fn default_retry_delay() -> Duration {
    Duration::from_millis(3000)
}

fn default_stall_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_verify_ssl() -> bool {
    true
}

/// Humantime duration that must be greater than zero.
pub fn non_zero_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let duration: Duration = humantime_serde::deserialize(deserializer)?;
    if duration.is_zero() {
        return Err(serde::de::Error::custom("duration must be greater than zero"));
    }
    Ok(duration)
}
