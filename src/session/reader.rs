//! Per-connection read loop
//!
//! Pulls frames off a client's transport, validates them against the
//! session state and hands the resulting messages to the hub. Whatever ends
//! the loop, the client is unregistered before [`SessionReader::run`]
//! returns.

use std::fmt::{self, Display};

use bytes::Bytes;
use futures::{Stream, StreamExt};

use crate::error::{HubError, ProtocolError};
use crate::hub::{ClientId, Hub, Instruction, RoomId};

use super::state::SessionState;

/// Transport-neutral view of an inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// Text frame carrying a protocol message
    Text(Bytes),
    /// Peer asked to close the connection
    Close,
    /// Binary, ping, pong; ignored
    Other,
}

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Peer closed the connection or the stream ended
    Closed,
    /// Read error on the transport
    Transport(String),
    /// Peer broke the wire protocol
    Protocol(ProtocolError),
    /// Hub stopped while the session was running
    HubClosed,
}

impl Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::Closed => write!(f, "closed by peer"),
            DisconnectReason::Transport(e) => write!(f, "transport error: {}", e),
            DisconnectReason::Protocol(e) => write!(f, "protocol violation: {}", e),
            DisconnectReason::HubClosed => write!(f, "hub closed"),
        }
    }
}

/// Reads one client's frames until it disconnects
pub struct SessionReader {
    hub: Hub,
    state: SessionState,
}

impl SessionReader {
    pub fn new(hub: Hub, client: ClientId, room: RoomId) -> Self {
        Self {
            hub,
            state: SessionState::new(client, room),
        }
    }

    /// Run the read loop to completion
    pub async fn run<S, E>(mut self, mut inbound: S) -> DisconnectReason
    where
        S: Stream<Item = Result<InboundFrame, E>> + Unpin,
        E: Display,
    {
        let reason = self.read_loop(&mut inbound).await;

        match &reason {
            DisconnectReason::Protocol(e) => {
                tracing::warn!(
                    client = %self.state.client,
                    room = %self.state.room,
                    error = %e,
                    "Protocol violation, closing connection"
                );
            }
            other => {
                tracing::debug!(
                    client = %self.state.client,
                    room = %self.state.room,
                    reason = %other,
                    messages = self.state.messages_accepted,
                    "Session ended"
                );
            }
        }

        let instruction = Instruction::new(self.state.client, self.state.room.clone())
            .with_name(self.state.name());
        if let Err(e) = self.hub.submit_unregister(instruction).await {
            tracing::debug!(client = %self.state.client, error = %e, "Unregister failed");
        }

        reason
    }

    async fn read_loop<S, E>(&mut self, inbound: &mut S) -> DisconnectReason
    where
        S: Stream<Item = Result<InboundFrame, E>> + Unpin,
        E: Display,
    {
        while let Some(frame) = inbound.next().await {
            let data = match frame {
                Ok(InboundFrame::Text(data)) => data,
                Ok(InboundFrame::Close) => return DisconnectReason::Closed,
                Ok(InboundFrame::Other) => continue,
                Err(e) => return DisconnectReason::Transport(e.to_string()),
            };

            let message = match self.state.accept(data) {
                Ok(Some(message)) => message,
                Ok(None) => continue,
                Err(e) => return DisconnectReason::Protocol(e),
            };

            if let Err(HubError::Closed) = self.hub.broadcast(message).await {
                return DisconnectReason::HubClosed;
            }
        }

        DisconnectReason::Closed
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::time::Duration;

    use futures::channel::mpsc as fmpsc;

    use super::*;
    use crate::hub::{Client, HubConfig};

    type Inbound = fmpsc::UnboundedSender<Result<InboundFrame, Infallible>>;

    fn text(s: &'static str) -> Result<InboundFrame, Infallible> {
        Ok(InboundFrame::Text(Bytes::from_static(s.as_bytes())))
    }

    async fn join(
        hub: &Hub,
        room: &RoomId,
    ) -> (
        Inbound,
        fmpsc::UnboundedReceiver<Bytes>,
        tokio::task::JoinHandle<DisconnectReason>,
    ) {
        let (sink, wire) = fmpsc::unbounded();
        let client = Client::new(sink);
        let id = client.id();
        hub.register(client, room.clone()).await.unwrap();

        let (inbound_tx, inbound_rx) = fmpsc::unbounded();
        let hub = hub.clone();
        let room = room.clone();
        let task = tokio::spawn(async move { hub.listen(id, room, inbound_rx).await });

        (inbound_tx, wire, task)
    }

    async fn next_frame(wire: &mut fmpsc::UnboundedReceiver<Bytes>) -> Option<Bytes> {
        tokio::time::timeout(Duration::from_millis(200), wire.next())
            .await
            .ok()
            .flatten()
    }

    // Unregister and control requests travel on separate channels
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_text_reaches_peer_without_echo() {
        let (hub, _task) = Hub::spawn(HubConfig::default());
        let room = hub.create_room().await.unwrap();

        let (a_in, mut a_wire, _a) = join(&hub, &room).await;
        let (_b_in, mut b_wire, _b) = join(&hub, &room).await;

        a_in.unbounded_send(text("2test")).unwrap();
        a_in.unbounded_send(text("1hello")).unwrap();

        assert_eq!(next_frame(&mut b_wire).await, Some(Bytes::from_static(b"2test|")));
        assert_eq!(
            next_frame(&mut b_wire).await,
            Some(Bytes::from_static(b"1test|hello"))
        );
        assert_eq!(next_frame(&mut a_wire).await, None);
    }

    #[tokio::test]
    async fn test_close_sends_leave() {
        let (hub, _task) = Hub::spawn(HubConfig::default());
        let room = hub.create_room().await.unwrap();

        let (_a_in, mut a_wire, _a) = join(&hub, &room).await;
        let (b_in, _b_wire, b_task) = join(&hub, &room).await;

        b_in.unbounded_send(text("2bob")).unwrap();
        assert_eq!(next_frame(&mut a_wire).await, Some(Bytes::from_static(b"2bob|")));

        b_in.unbounded_send(Ok(InboundFrame::Close)).unwrap();
        assert_eq!(b_task.await.unwrap(), DisconnectReason::Closed);
        assert_eq!(next_frame(&mut a_wire).await, Some(Bytes::from_static(b"3bob|")));

        let stats = hub.room_stats(room.as_str()).await.unwrap().unwrap();
        assert_eq!(stats.client_count, 1);
    }

    #[tokio::test]
    async fn test_leave_after_immediate_close() {
        let (hub, _task) = Hub::spawn(HubConfig::default());

        for _ in 0..10 {
            let room = hub.create_room().await.unwrap();
            let (_a_in, mut a_wire, _a) = join(&hub, &room).await;

            let (sink, _b_wire) = fmpsc::unbounded();
            let bob = Client::new(sink);
            let bob_id = bob.id();
            hub.register(bob, room.clone()).await.unwrap();

            // Name and close back to back
            let inbound = futures::stream::iter(vec![text("2bob"), Ok(InboundFrame::Close)]);
            assert_eq!(
                hub.listen(bob_id, room.clone(), inbound).await,
                DisconnectReason::Closed
            );

            let mut received = Vec::new();
            while let Some(frame) = next_frame(&mut a_wire).await {
                received.push(frame);
            }
            let leaves = received
                .iter()
                .filter(|f| f.as_ref() == b"3bob|")
                .count();
            assert_eq!(leaves, 1, "received {:?}", received);
        }
    }

    #[tokio::test]
    async fn test_stream_end_unregisters() {
        let (hub, _task) = Hub::spawn(HubConfig::default());
        let room = hub.create_room().await.unwrap();

        let (a_in, _a_wire, a_task) = join(&hub, &room).await;
        drop(a_in);

        assert_eq!(a_task.await.unwrap(), DisconnectReason::Closed);
        settle().await;
        let stats = hub.room_stats(room.as_str()).await.unwrap().unwrap();
        assert_eq!(stats.client_count, 0);
    }

    #[tokio::test]
    async fn test_text_before_name_disconnects() {
        let (hub, _task) = Hub::spawn(HubConfig::default());
        let room = hub.create_room().await.unwrap();

        let (_a_in, mut a_wire, _a) = join(&hub, &room).await;
        let (b_in, _b_wire, b_task) = join(&hub, &room).await;

        b_in.unbounded_send(text("1hello")).unwrap();

        assert_eq!(
            b_task.await.unwrap(),
            DisconnectReason::Protocol(ProtocolError::NameRequired(1))
        );
        // Anonymous client: nothing delivered, no leave notice
        assert_eq!(next_frame(&mut a_wire).await, None);
    }

    #[tokio::test]
    async fn test_other_frames_ignored() {
        let (hub, _task) = Hub::spawn(HubConfig::default());
        let room = hub.create_room().await.unwrap();

        let (a_in, _a_wire, _a) = join(&hub, &room).await;
        let (_b_in, mut b_wire, _b) = join(&hub, &room).await;

        a_in.unbounded_send(Ok(InboundFrame::Other)).unwrap();
        a_in.unbounded_send(text("2amy")).unwrap();

        assert_eq!(next_frame(&mut b_wire).await, Some(Bytes::from_static(b"2amy|")));
    }

    #[tokio::test]
    async fn test_transport_error_ends_session() {
        let (hub, _task) = Hub::spawn(HubConfig::default());
        let room = hub.create_room().await.unwrap();

        let (sink, _wire) = fmpsc::unbounded();
        let client = Client::new(sink);
        let id = client.id();
        hub.register(client, room.clone()).await.unwrap();

        let inbound = futures::stream::iter(vec![Err::<InboundFrame, _>("reset")]);
        let reason = hub.listen(id, room.clone(), inbound).await;

        assert_eq!(reason, DisconnectReason::Transport("reset".to_string()));
        settle().await;
        let stats = hub.room_stats(room.as_str()).await.unwrap().unwrap();
        assert_eq!(stats.client_count, 0);
    }
}
