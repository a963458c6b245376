use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Camera is disabled")]
    DisabledCamera,

    #[error("Canvas element not found")]
    RenderTargetMissing,

    #[error("Failed to initialize video player: {0}")]
    DecoderInit(String),

    #[error("{0}")]
    StreamRuntime(String),

    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    #[error(transparent)]
    Directory(#[from] homelab_camera_client::error::Error),
}

impl Error {
    /// Whether the session should be retried after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::DisabledCamera | Error::RenderTargetMissing)
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::WebSocket(Box::new(error))
    }
}
