//! WebSocket connection glue
//!
//! Adapts an upgraded axum socket to the hub: the write half becomes the
//! client's sink, the read half feeds the session reader.

use axum::extract::ws::{Message as WsMessage, WebSocket};
use bytes::Bytes;
use futures::{future, SinkExt, StreamExt};

use crate::hub::{Client, Hub, RoomId};
use crate::session::InboundFrame;

impl From<WsMessage> for InboundFrame {
    fn from(msg: WsMessage) -> Self {
        match msg {
            WsMessage::Text(text) => InboundFrame::Text(Bytes::from(text)),
            WsMessage::Close(_) => InboundFrame::Close,
            WsMessage::Binary(_) | WsMessage::Ping(_) | WsMessage::Pong(_) => {
                InboundFrame::Other
            }
        }
    }
}

/// Drive one upgraded connection until it closes
pub async fn handle_socket(socket: WebSocket, hub: Hub, room: RoomId) {
    let (sink, stream) = socket.split();

    let sink = sink.with(|frame: Bytes| {
        future::ready(Ok::<_, axum::Error>(WsMessage::Text(
            String::from_utf8_lossy(&frame).into_owned(),
        )))
    });

    let client = Client::new(Box::pin(sink));
    let id = client.id();

    if let Err(e) = hub.register(client, room.clone()).await {
        // Client was dropped by the hub; its socket is already closing
        tracing::warn!(client = %id, room = %room, error = %e, "Registration failed");
        return;
    }

    let reason = hub
        .listen(id, room.clone(), stream.map(|r| r.map(InboundFrame::from)))
        .await;

    tracing::debug!(client = %id, room = %room, reason = %reason, "Connection closed");
}
