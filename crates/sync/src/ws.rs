// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket implementation of [`RemoteQueue`] using tokio-tungstenite.
//!
//! Subscriptions hold a dedicated socket that the server feeds snapshot
//! frames; queries and mutations open a short-lived socket per call and
//! wait for a single reply. Messages are the JSON shapes defined in
//! `encore_core::protocol`.

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use encore_core::protocol::{ClientMessage, ServerMessage};
use encore_core::{Error, QueueSnapshot, Result};

use crate::remote::{BoxFuture, RemoteQueue, SnapshotStream};

/// WebSocket client for the remote queue service.
pub struct WsRemoteQueue {
    /// Server URL, e.g. `wss://queue.example.com/live`.
    url: String,
}

impl WsRemoteQueue {
    /// Creates a client for the given server URL.
    pub fn new(url: impl Into<String>) -> Self {
        WsRemoteQueue { url: url.into() }
    }

    /// Opens a socket, sends one message, and waits for one reply.
    async fn call(&self, msg: ClientMessage) -> Result<ServerMessage> {
        let (mut ws, _) = tokio_tungstenite::connect_async(&self.url)
            .await
            .map_err(|e| Error::Transport(format!("connect failed: {e}")))?;

        let json = msg.to_json()?;
        ws.send(Message::Text(json.into()))
            .await
            .map_err(|e| Error::Transport(format!("send failed: {e}")))?;

        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    let reply = ServerMessage::from_json(&text)
                        .map_err(|e| Error::Protocol(format!("bad reply: {e}")))?;
                    let _ = ws.close(None).await;
                    return Ok(reply);
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Ok(Message::Close(_))) | None => {
                    return Err(Error::Transport("connection closed before reply".to_string()));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    return Err(Error::Transport(format!("receive failed: {e}")));
                }
            }
        }
    }

    /// Sends a mutation and maps the reply onto the error taxonomy.
    async fn mutate(&self, msg: ClientMessage) -> Result<()> {
        match self.call(msg).await? {
            ServerMessage::Ack => Ok(()),
            ServerMessage::Rejected { request_id, reason } => {
                Err(Error::Conflict { request_id, reason })
            }
            ServerMessage::Error { message } => Err(Error::Protocol(message)),
            ServerMessage::Snapshot(_) => {
                Err(Error::Protocol("unexpected snapshot reply to mutation".to_string()))
            }
        }
    }
}

impl RemoteQueue for WsRemoteQueue {
    fn subscribe(&self, event_id: &str) -> BoxFuture<'_, Result<SnapshotStream>> {
        let event_id = event_id.to_string();
        Box::pin(async move {
            let (mut ws, _) = tokio_tungstenite::connect_async(&self.url)
                .await
                .map_err(|e| Error::Transport(format!("connect failed: {e}")))?;

            let json = ClientMessage::subscribe(event_id).to_json()?;
            ws.send(Message::Text(json.into()))
                .await
                .map_err(|e| Error::Transport(format!("send failed: {e}")))?;

            let stream = futures_util::stream::unfold(ws, |mut ws| async move {
                loop {
                    match ws.next().await {
                        Some(Ok(Message::Text(text))) => {
                            let item = match ServerMessage::from_json(&text) {
                                Ok(ServerMessage::Snapshot(snapshot)) => Ok(snapshot),
                                // Server-reported stream failure ends the
                                // subscription; the manager reconnects.
                                Ok(ServerMessage::Error { message }) => {
                                    Err(Error::Transport(message))
                                }
                                Ok(_) => continue,
                                Err(e) => Err(Error::Protocol(format!("bad frame: {e}"))),
                            };
                            return Some((item, ws));
                        }
                        Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                        Some(Ok(Message::Close(_))) | None => return None,
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            return Some((
                                Err(Error::Transport(format!("receive failed: {e}"))),
                                ws,
                            ));
                        }
                    }
                }
            });

            Ok(Box::pin(stream) as SnapshotStream)
        })
    }

    fn query(&self, event_id: &str) -> BoxFuture<'_, Result<QueueSnapshot>> {
        let msg = ClientMessage::query(event_id);
        Box::pin(async move {
            match self.call(msg).await? {
                ServerMessage::Snapshot(snapshot) => Ok(snapshot),
                ServerMessage::Error { message } => Err(Error::Protocol(message)),
                other => Err(Error::Protocol(format!(
                    "unexpected reply to query: {other:?}"
                ))),
            }
        })
    }

    fn accept(&self, request_id: &str, set_id: &str) -> BoxFuture<'_, Result<()>> {
        let msg = ClientMessage::Accept {
            request_id: request_id.to_string(),
            set_id: set_id.to_string(),
        };
        Box::pin(self.mutate(msg))
    }

    fn veto(&self, request_id: &str, reason: &str) -> BoxFuture<'_, Result<()>> {
        let msg = ClientMessage::Veto {
            request_id: request_id.to_string(),
            reason: reason.to_string(),
        };
        Box::pin(self.mutate(msg))
    }

    fn refund(&self, request_id: &str, reason: &str) -> BoxFuture<'_, Result<()>> {
        let msg = ClientMessage::Refund {
            request_id: request_id.to_string(),
            reason: reason.to_string(),
        };
        Box::pin(self.mutate(msg))
    }

    fn mark_playing(&self, request_id: &str, set_id: &str) -> BoxFuture<'_, Result<()>> {
        let msg = ClientMessage::MarkPlaying {
            request_id: request_id.to_string(),
            set_id: set_id.to_string(),
        };
        Box::pin(self.mutate(msg))
    }

    fn mark_completed(&self, request_id: &str) -> BoxFuture<'_, Result<()>> {
        let msg = ClientMessage::MarkCompleted {
            request_id: request_id.to_string(),
        };
        Box::pin(self.mutate(msg))
    }
}
