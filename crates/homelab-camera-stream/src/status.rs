use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    Connecting,
    Connected,
    Error,
    Disconnected,
}

impl Display for StreamState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamState::Connecting => write!(f, "connecting"),
            StreamState::Connected => write!(f, "connected"),
            StreamState::Error => write!(f, "error"),
            StreamState::Disconnected => write!(f, "disconnected"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStatus {
    pub state: StreamState,
    pub message: String,
}

impl StreamStatus {
    pub fn new(state: StreamState, message: impl Into<String>) -> Self {
        Self {
            state,
            message: message.into(),
        }
    }

    pub fn connecting() -> Self {
        Self::new(StreamState::Connecting, "Connecting to camera...")
    }

    pub fn connected() -> Self {
        Self::new(StreamState::Connected, "Connected to camera feed")
    }

    pub fn disconnected() -> Self {
        Self::new(StreamState::Disconnected, "Stream stopped")
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(StreamState::Error, message)
    }
}

impl From<&Error> for StreamStatus {
    fn from(error: &Error) -> Self {
        match error {
            Error::DisabledCamera | Error::RenderTargetMissing | Error::StreamRuntime(_) => {
                StreamStatus::error(error.to_string())
            }
            Error::DecoderInit(_) | Error::WebSocket(_) | Error::Tls(_) | Error::Directory(_) => {
                StreamStatus::error("Failed to initialize video player")
            }
        }
    }
}
