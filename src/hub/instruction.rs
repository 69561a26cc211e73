//! Requests carried into the control loop

use tokio::sync::oneshot;

use crate::error::HubError;

use super::client::{Client, ClientId};
use super::room::{RoomId, RoomStats};

/// A (client, room) pair naming a membership change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub client: ClientId,
    pub room: RoomId,

    /// Display name known to the sender, empty if none
    ///
    /// Used for the leave notice when the hub has not yet seen the
    /// client's set-name.
    pub name: String,
}

impl Instruction {
    pub fn new(client: ClientId, room: RoomId) -> Self {
        Self {
            client,
            room,
            name: String::new(),
        }
    }

    /// Attach the client's display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Hand a client over to the hub
#[derive(Debug)]
pub(crate) struct Registration {
    pub client: Client,
    pub room: RoomId,
    pub responder: oneshot::Sender<Result<(), HubError>>,
}

/// Room table requests
#[derive(Debug)]
pub(crate) enum Control {
    CreateRoom {
        responder: oneshot::Sender<RoomId>,
    },
    GetRoom {
        id: String,
        responder: oneshot::Sender<Option<RoomId>>,
    },
    RoomStats {
        id: String,
        responder: oneshot::Sender<Option<RoomStats>>,
    },
    RoomCount {
        responder: oneshot::Sender<usize>,
    },
    /// Deferred emptiness check fired by a grace timer
    Expire(RoomId),
}
