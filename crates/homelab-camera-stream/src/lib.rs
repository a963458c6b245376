pub mod config;
pub mod decoder;
pub mod metrics;
pub mod render;
pub mod session;
pub mod status;
pub mod websocket;

mod error;

pub use config::StreamConfig;
pub use decoder::{ConnectRequest, DecoderEvent, DecoderSession, EventSender, StreamDecoder};
pub use error::{Error, Result};
pub use metrics::SessionMetrics;
pub use render::{DiscardTarget, FileTarget, RenderTarget};
pub use session::{SessionHandle, StreamSessionController};
pub use status::{StreamState, StreamStatus};
pub use websocket::WebSocketDecoder;
