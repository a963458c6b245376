use std::{
    collections::HashMap,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{Parser, Subcommand};
use homelab_camera_client::config::DirectoryConfig;
use homelab_camera_stream::{StreamConfig, config::non_zero_duration};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::Result;

const CONFIG_DIR: &str = ".homelab-dashboard";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "kebab-case"))]
pub struct Config {
    pub directory: DirectoryConfig,
    pub stream: StreamConfig,
    #[serde(default)]
    pub output: Option<OutputConfig>,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub metrics: Option<MetricsConfig>,
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
    #[serde(default)]
    pub tracing: Option<TracingConfig>,
}

/// Where rendered feeds are written. Without it, frames are counted and dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "kebab-case"))]
pub struct OutputConfig {
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "kebab-case"))]
pub struct DashboardConfig {
    #[serde(
        default = "default_refresh_interval",
        deserialize_with = "non_zero_duration",
        serialize_with = "humantime_serde::serialize"
    )]
    pub refresh_interval: Duration,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            refresh_interval: default_refresh_interval(),
        }
    }
}

fn default_refresh_interval() -> Duration {
    Duration::from_secs(5)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "kebab-case"))]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_address")]
    pub address: String,
    pub port: u16,
}

fn default_metrics_address() -> String {
    "0.0.0.0".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "kebab-case"))]
pub struct LoggingConfig {
    pub loki: Option<LokiConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "kebab-case"))]
pub struct LokiConfig {
    pub url: String,
    pub labels: Option<HashMap<String, String>>,
    pub username: Option<String>,
    #[serde(default, deserialize_with = "optional_from_file_const_or_env")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "kebab-case"))]
pub struct TracingConfig {
    pub tempo: Option<TempoConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "kebab-case"))]
pub struct TempoConfig {
    pub url: String,
    pub port: u16,
}

#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args<T: serde::de::DeserializeOwned + Clone + Send + Sync + 'static> {
    #[arg(short, long, env, value_parser = toml_from_file::<T>)]
    pub config: Option<T>,
    #[arg(short, long, env, default_value = "false")]
    pub validate: bool,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Stream every camera and print the grid until interrupted (default)
    Watch,
    /// Print the camera roster once
    List,
    /// Control HLS output on the proxy
    Hls {
        #[command(subcommand)]
        action: HlsAction,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum HlsAction {
    Start { camera_id: String },
    Stop { camera_id: String },
}

impl<T: serde::de::DeserializeOwned + Clone + Send + Sync + 'static> Args<T> {
    pub fn get_config(&self) -> Result<T> {
        if let Some(config) = &self.config {
            Ok(config.clone())
        } else {
            let default_path = default_config_path();
            toml_from_file(&default_path)
        }
    }

    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Watch)
    }
}

pub fn default_config_path() -> String {
    if let Ok(home_dir) = std::env::var("HOME") {
        format!("{home_dir}/{CONFIG_DIR}/config.toml")
    } else {
        "config.toml".to_string()
    }
}

pub fn toml_from_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
    let toml = std::fs::read_to_string(path)?;
    let config_json = toml::from_str(&toml)?;
    let config = serde_json::from_value(config_json)?;
    Ok(config)
}

pub fn optional_from_file_const_or_env<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(resolve_secret)
        .transpose()
        .map_err(serde::de::Error::custom)
}

fn resolve_secret(s: String) -> std::result::Result<String, String> {
    if let Some(path) = s.strip_prefix("file:") {
        std::fs::read_to_string(path)
            .map(|contents| contents.trim_end().to_string())
            .map_err(|e| format!("Failed to read secret file '{path}': {e}"))
    } else if let Some(var) = s.strip_prefix("env:") {
        std::env::var(var).map_err(|e| format!("Environment variable '{var}' not found: {e}"))
    } else {
        Ok(s)
    }
}

pub async fn check_and_create_config() -> Result<()> {
    let home_dir = std::env::var("HOME").map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "HOME environment variable not set",
        )
    })?;

    let config_dir = Path::new(&home_dir).join(CONFIG_DIR);
    let config_path = config_dir.join("config.toml");

    if !config_path.exists() {
        info!("Configuration file not found. Setting up initial configuration...");

        fs::create_dir_all(&config_dir).map_err(|e| {
            std::io::Error::new(e.kind(), format!("Failed to create config directory: {e}"))
        })?;

        let config_content = prompt_for_config()?;
        fs::write(&config_path, config_content).map_err(|e| {
            std::io::Error::new(e.kind(), format!("Failed to write config file: {e}"))
        })?;

        info!("Configuration file created at: {}", config_path.display());
    }

    Ok(())
}

fn prompt_for_config() -> Result<String> {
    println!("Welcome to the homelab camera dashboard setup!");
    println!("Press Enter to use default values shown in brackets.\n");

    let base_url = prompt_with_default("Dashboard API base URL", "http://localhost:8000/api")?;
    let verify_ssl = prompt_with_default("Verify API SSL (true/false)", "true")?;
    let proxy_url = prompt_with_default("Camera proxy WebSocket URL", "ws://localhost:8765")?;
    let stream_verify_ssl = prompt_with_default("Verify proxy SSL (true/false)", "false")?;
    let retry_delay = prompt_with_default("Reconnect delay (e.g., 3s, 500ms)", "3s")?;
    let refresh_interval = prompt_with_default("Grid refresh interval (e.g., 5s)", "5s")?;
    let output_dir = prompt_with_default("Recording directory (optional)", "")?;
    let metrics_port = prompt_with_default("Metrics port (optional)", "")?;

    let mut config = render_config(
        &base_url,
        &verify_ssl,
        &proxy_url,
        &stream_verify_ssl,
        &retry_delay,
        &refresh_interval,
    );

    if !output_dir.is_empty() {
        config.push_str(&format!("\n[output]\ndirectory = \"{output_dir}\"\n"));
    }

    if !metrics_port.is_empty() {
        config.push_str(&format!("\n[metrics]\nport = {metrics_port}\n"));
    }

    Ok(config)
}

fn render_config(
    base_url: &str,
    verify_ssl: &str,
    proxy_url: &str,
    stream_verify_ssl: &str,
    retry_delay: &str,
    refresh_interval: &str,
) -> String {
    format!(
        r#"[directory]
base-url = "{base_url}"
verify-ssl = {verify_ssl}

[stream]
proxy-url = "{proxy_url}"
verify-ssl = {stream_verify_ssl}
retry-delay = "{retry_delay}"

[dashboard]
refresh-interval = "{refresh_interval}"
"#
    )
}

pub(crate) fn prompt_with_default(prompt: &str, default: &str) -> Result<String> {
    print!("{prompt} [{default}]: ");
    io::stdout()
        .flush()
        .map_err(|e| std::io::Error::new(e.kind(), format!("Failed to flush stdout: {e}")))?;

    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .map_err(|e| std::io::Error::new(e.kind(), format!("Failed to read input: {e}")))?;

    let input = input.trim();
    if input.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(input.to_string())
    }
}
