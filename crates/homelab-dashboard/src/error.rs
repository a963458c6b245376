use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Directory error: {0}")]
    Directory(#[from] homelab_camera_client::error::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error("Logging error: {0}")]
    Logging(String),

    #[error("Tracing error: {0}")]
    Tracing(String),

    #[error("General error: {0}")]
    General(String),
}
