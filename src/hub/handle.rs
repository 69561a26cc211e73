//! Public hub handle
//!
//! [`Hub`] is a cheap, cloneable front for the control loop. Every method
//! turns into a request on one of the loop's channels.

use std::fmt::Display;

use futures::Stream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::HubError;
use crate::protocol::Message;
use crate::session::{DisconnectReason, InboundFrame, SessionReader};

use super::client::{Client, ClientId};
use super::config::HubConfig;
use super::control::{ControlLoop, Inbox};
use super::instruction::{Control, Instruction, Registration};
use super::room::{RoomId, RoomStats};

/// Handle to the hub control loop
#[derive(Debug, Clone)]
pub struct Hub {
    register_tx: mpsc::Sender<Registration>,
    unregister_tx: mpsc::Sender<Instruction>,
    broadcast_tx: mpsc::Sender<Message>,
    control_tx: mpsc::Sender<Control>,
}

impl Hub {
    /// Start a control loop with the given configuration
    ///
    /// The loop runs until every clone of the returned handle is dropped.
    /// Must be called from within a Tokio runtime.
    pub fn spawn(config: HubConfig) -> (Self, JoinHandle<()>) {
        let (hub, control, inbox) = Self::build(config);
        let task = tokio::spawn(control.run(inbox));
        (hub, task)
    }

    pub(crate) fn build(config: HubConfig) -> (Self, ControlLoop, Inbox) {
        let capacity = config.command_capacity;
        let (register_tx, register) = mpsc::channel(capacity);
        let (unregister_tx, unregister) = mpsc::channel(capacity);
        let (broadcast_tx, broadcast) = mpsc::channel(capacity);
        let (control_tx, control) = mpsc::channel(capacity);

        let control_loop =
            ControlLoop::new(config, broadcast_tx.downgrade(), control_tx.downgrade());

        let hub = Self {
            register_tx,
            unregister_tx,
            broadcast_tx,
            control_tx,
        };

        let inbox = Inbox {
            register,
            unregister,
            broadcast,
            control,
        };

        (hub, control_loop, inbox)
    }

    /// Create an empty room and return its id
    pub async fn create_room(&self) -> Result<RoomId, HubError> {
        self.request(|responder| Control::CreateRoom { responder })
            .await
    }

    /// Look up a live room
    pub async fn get_room(&self, id: &str) -> Result<Option<RoomId>, HubError> {
        let id = id.to_owned();
        self.request(|responder| Control::GetRoom { id, responder })
            .await
    }

    /// Statistics for a live room
    pub async fn room_stats(&self, id: &str) -> Result<Option<RoomStats>, HubError> {
        let id = id.to_owned();
        self.request(|responder| Control::RoomStats { id, responder })
            .await
    }

    /// Number of live rooms
    pub async fn room_count(&self) -> Result<usize, HubError> {
        self.request(|responder| Control::RoomCount { responder })
            .await
    }

    /// Add a client to a room and start forwarding its queue
    ///
    /// Fails with [`HubError::RoomNotFound`] if the room has been reclaimed;
    /// the client's connection is closed in that case.
    pub async fn register(&self, client: Client, room: RoomId) -> Result<(), HubError> {
        let (responder, response) = oneshot::channel();
        self.register_tx
            .send(Registration {
                client,
                room,
                responder,
            })
            .await?;
        response.await?
    }

    /// Remove a client from a room; no-op if it is not a member
    pub async fn unregister(&self, client: ClientId, room: RoomId) -> Result<(), HubError> {
        self.submit_unregister(Instruction::new(client, room)).await
    }

    /// Remove a client, naming it for the leave notice
    ///
    /// The name covers a set-name broadcast that has not reached the control
    /// loop yet.
    pub async fn submit_unregister(&self, instruction: Instruction) -> Result<(), HubError> {
        self.unregister_tx.send(instruction).await?;
        Ok(())
    }

    /// Fan a message out to every other member of its room
    pub async fn broadcast(&self, message: Message) -> Result<(), HubError> {
        self.broadcast_tx.send(message).await?;
        Ok(())
    }

    /// Read frames from a registered client until it disconnects
    ///
    /// Unregisters the client before returning.
    pub async fn listen<S, E>(&self, client: ClientId, room: RoomId, inbound: S) -> DisconnectReason
    where
        S: Stream<Item = Result<InboundFrame, E>> + Unpin,
        E: Display,
    {
        SessionReader::new(self.clone(), client, room)
            .run(inbound)
            .await
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Control,
    ) -> Result<T, HubError> {
        let (responder, response) = oneshot::channel();
        self.control_tx.send(make(responder)).await?;
        Ok(response.await?)
    }
}
