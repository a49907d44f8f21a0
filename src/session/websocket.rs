//! WebSocket transport for listen sessions

use axum::extract::ws::{Message, WebSocket};
use serde::{Deserialize, Serialize};

use super::{Transport, TransportError};

/// Messages a listener may send to the server
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Application level heartbeat
    Ping,
}

/// Pong response message
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PongMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
}

impl Default for PongMessage {
    fn default() -> Self {
        Self {
            msg_type: "pong".to_string(),
        }
    }
}

/// Upgraded WebSocket connection of one listener
pub struct WsTransport {
    socket: WebSocket,
}

impl WsTransport {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }

    /// Answer one inbound frame. Returns false if the peer asked to close.
    async fn handle_client_message(&mut self, msg: Message) -> bool {
        match msg {
            Message::Text(text) => {
                if let Ok(ClientMessage::Ping) = serde_json::from_str::<ClientMessage>(&text) {
                    if let Ok(json) = serde_json::to_string(&PongMessage::default()) {
                        let _ = self.socket.send(Message::Text(json)).await;
                    }
                }
                true
            }
            Message::Ping(data) => {
                let _ = self.socket.send(Message::Pong(data)).await;
                true
            }
            Message::Binary(_) | Message::Pong(_) => true,
            Message::Close(_) => false,
        }
    }
}

impl Transport for WsTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.socket
            .send(Message::Text(text))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn closed(&mut self) -> Result<(), TransportError> {
        loop {
            match self.socket.recv().await {
                Some(Ok(msg)) => {
                    if !self.handle_client_message(msg).await {
                        return Ok(());
                    }
                }
                Some(Err(e)) => return Err(TransportError::Receive(e.to_string())),
                None => return Ok(()),
            }
        }
    }
}
