//! Seam between the adapter and the exchange transport.
//!
//! The transport itself (WebSocket feed, REST order entry, signing) lives
//! outside this workspace. It talks to the adapter through:
//!
//! - [`ExchangeGateway`] for outbound order requests
//! - a [`TransportEvent`] channel for everything it receives
//! - an [`EventSink`] the adapter publishes [`AdapterEvent`]s to

mod event;
mod gateway;
mod payload;

pub use event::{AdapterEvent, EventSink, TextCategory, TransportEvent};
pub use gateway::{ExchangeGateway, Request};
pub use payload::{MovePayload, OrderPayload, ResizePayload, TRAILING_STOP_PEG};

use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Channel closed")]
    ChannelClosed,

    #[error("Shutdown requested")]
    Shutdown,
}

/// Failure of one gateway round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The exchange answered with an error; the text is shown to the operator.
    #[error("{0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("gateway closed")]
    Closed,
}

pub type TransportSender = mpsc::Sender<TransportEvent>;
pub type TransportReceiver = mpsc::Receiver<TransportEvent>;

pub fn create_transport_channel(capacity: usize) -> (TransportSender, TransportReceiver) {
    mpsc::channel(capacity)
}
