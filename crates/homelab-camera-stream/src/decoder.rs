//! The decoder capability a stream session drives.
//!
//! A decoder turns a transport URL into a live session that writes frames to
//! a render target. Lifecycle callbacks are delivered as [`DecoderEvent`]s on
//! the channel behind the [`EventSender`] handed over at connect time.

use std::sync::Arc;

use tokio::sync::mpsc;
use url::Url;

use crate::{Result, render::RenderTarget};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderEvent {
    /// First data arrived from the source.
    SourceEstablished,
    /// The source ended (transport closed).
    SourceCompleted,
    /// No data arrived within the stall window.
    Stalled,
    Error(String),
}

/// Event channel of a single decoder session.
///
/// Every event is tagged with the generation of the connect attempt that
/// produced it, so a controller can drop events from sessions it has
/// already torn down.
#[derive(Debug, Clone)]
pub struct EventSender {
    generation: u64,
    tx: mpsc::UnboundedSender<(u64, DecoderEvent)>,
}

impl EventSender {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<(u64, DecoderEvent)>) -> Self {
        Self { generation, tx }
    }

    /// Returns false once the owning controller is gone.
    pub fn send(&self, event: DecoderEvent) -> bool {
        self.tx.send((self.generation, event)).is_ok()
    }
}

pub struct ConnectRequest {
    pub camera_id: String,
    pub url: Url,
    pub target: Arc<dyn RenderTarget>,
    pub events: EventSender,
}

pub trait StreamDecoder: Send + 'static {
    type Session: DecoderSession;

    /// Constructs a decode session. An error here means no session exists.
    fn connect(&mut self, request: ConnectRequest) -> Result<Self::Session>;
}

pub trait DecoderSession: Send + 'static {
    fn destroy(self);
}
