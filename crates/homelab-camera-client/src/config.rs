use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "kebab-case"))]
pub struct DirectoryConfig {
    pub base_url: Url,
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl DirectoryConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            verify_ssl: default_verify_ssl(),
            timeout: default_timeout(),
        }
    }
}

fn default_verify_ssl() -> bool {
    true
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}
