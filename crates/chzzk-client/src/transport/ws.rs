//! `tokio-tungstenite` transport.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use super::{ChatTransport, TransportConnector, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects to a chat server URL (`ws://` or `wss://`).
#[derive(Clone, Debug)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    /// Connector for the given server URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Server URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TransportConnector for WsConnector {
    async fn connect(&self) -> Result<Box<dyn ChatTransport>, TransportError> {
        let (ws, _) = connect_async(self.url.as_str()).await?;
        debug!(url = %self.url, "chat websocket connected");
        Ok(Box::new(WsTransport::new(ws)))
    }
}

/// A connected chat WebSocket.
pub struct WsTransport {
    ws: WsStream,
    connected: bool,
}

impl WsTransport {
    fn new(ws: WsStream) -> Self {
        Self {
            ws,
            connected: true,
        }
    }
}

#[async_trait]
impl ChatTransport for WsTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::Closed);
        }
        if let Err(e) = self.ws.send(Message::Text(text.into())).await {
            self.connected = false;
            return Err(e.into());
        }
        Ok(())
    }

    async fn recv_text(&mut self) -> Result<String, TransportError> {
        if !self.connected {
            return Err(TransportError::Closed);
        }
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text.as_str().to_owned()),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Ok(text),
                    Err(_) => debug!(len = bytes.len(), "skipping non-utf8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "chat websocket closed by server");
                    self.connected = false;
                    return Err(TransportError::Closed);
                }
                // Ping, Pong and raw frames; tungstenite answers pings itself.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    self.connected = false;
                    return Err(e.into());
                }
                None => {
                    self.connected = false;
                    return Err(TransportError::Closed);
                }
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn close(&mut self) {
        if self.connected {
            self.connected = false;
            let _ = self.ws.close(None).await;
        }
    }
}
