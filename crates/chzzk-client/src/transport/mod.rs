//! Text-frame transport to the chat server.
//!
//! The session layer only needs four things from a connection: send a text
//! frame, receive the next text frame, ask whether it is still up, and close
//! it. [`ChatTransport`] captures exactly that so the handshake and the run
//! loop can be driven by a scripted transport in tests.

mod ws;

pub use ws::{WsConnector, WsTransport};

use async_trait::async_trait;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Transport-level failures. Fatal at startup, recovered mid-run by
/// reconnecting.
#[derive(Debug, Error)]
pub enum TransportError {
    /// WebSocket connect, read, or write failed.
    #[error("websocket error: {0}")]
    WebSocket(Box<tungstenite::Error>),

    /// The peer closed the connection.
    #[error("connection closed by server")]
    Closed,

    /// The handshake finished but the transport no longer reports connected.
    #[error("transport not connected after handshake")]
    NotConnected,
}

impl From<tungstenite::Error> for TransportError {
    fn from(err: tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}

/// One live connection carrying JSON text frames.
#[async_trait]
pub trait ChatTransport: Send {
    /// Send one text frame.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Wait for the next text frame.
    ///
    /// Cancel-safe: dropping the future before it resolves loses no frame.
    /// Control frames are skipped; a close frame or end of stream is
    /// [`TransportError::Closed`].
    async fn recv_text(&mut self) -> Result<String, TransportError>;

    /// Whether the connection is still usable.
    fn is_connected(&self) -> bool;

    /// Close the connection. Errors are ignored.
    async fn close(&mut self);
}

/// Opens a fresh [`ChatTransport`] for each session.
#[async_trait]
pub trait TransportConnector: Send + Sync {
    /// Connect to the chat server.
    async fn connect(&self) -> Result<Box<dyn ChatTransport>, TransportError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_display() {
        assert_eq!(
            TransportError::Closed.to_string(),
            "connection closed by server"
        );
    }

    #[test]
    fn tungstenite_error_conversion() {
        let err: TransportError = tungstenite::Error::ConnectionClosed.into();
        assert!(matches!(err, TransportError::WebSocket(_)));
        assert!(err.to_string().starts_with("websocket error"));
    }
}
