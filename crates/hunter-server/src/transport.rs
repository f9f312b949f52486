use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use tracing::debug;

use crate::frame::Frame;

pub const NORMAL_CLOSE: u16 = 1000;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,
    #[error("websocket error: {0}")]
    Socket(String),
    #[error("frame encoding failed: {0}")]
    Encode(String),
}

/// Bidirectional text channel a session runs over.
#[async_trait]
pub trait Transport: Send {
    /// Next inbound text frame. `None` once the peer has gone away.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;
    async fn send(&mut self, frame: &Frame) -> Result<(), TransportError>;
    async fn close(&mut self, code: u16, reason: &str) -> Result<(), TransportError>;
}

pub struct WsTransport {
    socket: WebSocket,
}

impl WsTransport {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.socket.recv().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(_)) => return None,
                Ok(Message::Binary(data)) => {
                    debug!(len = data.len(), "ignoring binary websocket frame");
                }
                // Pings are answered by the socket itself.
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Err(e) => return Some(Err(TransportError::Socket(e.to_string()))),
            }
        }
    }

    async fn send(&mut self, frame: &Frame) -> Result<(), TransportError> {
        let json = serde_json::to_string(frame).map_err(|e| TransportError::Encode(e.to_string()))?;
        self.socket
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| TransportError::Socket(e.to_string()))
    }

    async fn close(&mut self, code: u16, reason: &str) -> Result<(), TransportError> {
        self.socket
            .send(Message::Close(Some(CloseFrame {
                code,
                reason: reason.to_string().into(),
            })))
            .await
            .map_err(|e| TransportError::Socket(e.to_string()))
    }
}
