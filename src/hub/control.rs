//! Hub control loop
//!
//! The control loop is the only owner of the room table. Register, unregister
//! and broadcast requests arrive on separate channels and are served
//! first-ready-first; each handler runs to completion before the next request
//! is taken, so room and member state needs no locks.

use std::collections::HashMap;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::Instant;

use crate::error::HubError;
use crate::protocol::{Author, Message, MessageKind};
use crate::stats::metrics as stats;

use super::config::HubConfig;
use super::instruction::{Control, Instruction, Registration};
use super::room::{Member, Room, RoomId};

type IdSource = Box<dyn FnMut() -> RoomId + Send>;

/// Receiving ends of the hub's request channels
pub(crate) struct Inbox {
    pub register: mpsc::Receiver<Registration>,
    pub unregister: mpsc::Receiver<Instruction>,
    pub broadcast: mpsc::Receiver<Message>,
    pub control: mpsc::Receiver<Control>,
}

/// State owned by the control loop task
pub(crate) struct ControlLoop {
    config: HubConfig,

    /// Live rooms keyed by id
    rooms: HashMap<RoomId, Room>,

    /// Used to feed leave notifications back through broadcast
    broadcast_tx: mpsc::WeakSender<Message>,

    /// Used by grace timers to post expiry checks
    control_tx: mpsc::WeakSender<Control>,

    /// Room id generator
    next_id: IdSource,
}

impl ControlLoop {
    pub(crate) fn new(
        config: HubConfig,
        broadcast_tx: mpsc::WeakSender<Message>,
        control_tx: mpsc::WeakSender<Control>,
    ) -> Self {
        Self {
            config,
            rooms: HashMap::new(),
            broadcast_tx,
            control_tx,
            next_id: Box::new(RoomId::generate),
        }
    }

    /// Replace the room id generator
    #[cfg(test)]
    pub(crate) fn with_id_source(mut self, source: impl FnMut() -> RoomId + Send + 'static) -> Self {
        self.next_id = Box::new(source);
        self
    }

    /// Serve requests until every hub handle is dropped
    pub(crate) async fn run(mut self, mut inbox: Inbox) {
        tracing::info!("Hub control loop started");

        loop {
            tokio::select! {
                Some(registration) = inbox.register.recv() => self.handle_register(registration),
                Some(instruction) = inbox.unregister.recv() => self.handle_unregister(instruction),
                Some(message) = inbox.broadcast.recv() => self.handle_broadcast(message),
                Some(control) = inbox.control.recv() => self.handle_control(control),
                else => break,
            }
        }

        tracing::info!(rooms = self.rooms.len(), "Hub control loop stopped");
    }

    pub(crate) fn handle_register(&mut self, registration: Registration) {
        let Registration {
            client,
            room,
            responder,
        } = registration;

        let Some(entry) = self.rooms.get_mut(&room) else {
            tracing::warn!(room = %room, client = %client.id(), "Register for unknown room");
            // Dropping the client closes its connection
            let _ = responder.send(Err(HubError::RoomNotFound(room)));
            return;
        };

        let id = client.id();
        let outbound = client.start(self.config.client_queue_capacity);
        entry.add(Member::new(id, outbound));
        stats::client_connected();

        tracing::info!(
            room = %room,
            client = %id,
            members = entry.client_count(),
            "Client registered"
        );

        let _ = responder.send(Ok(()));
    }

    pub(crate) fn handle_unregister(&mut self, instruction: Instruction) {
        let Instruction { client, room, name } = instruction;

        let Some(entry) = self.rooms.get_mut(&room) else {
            tracing::debug!(room = %room, client = %client, "Unregister for unknown room");
            return;
        };

        let Some(member) = entry.remove(client) else {
            tracing::debug!(room = %room, client = %client, "Client already unregistered");
            return;
        };

        tracing::info!(
            room = %room,
            client = %client,
            members = entry.client_count(),
            "Client unregistered"
        );

        // The set-name broadcast may still be queued behind this request
        let name = if member.name.is_empty() {
            name
        } else {
            member.name.clone()
        };
        if !name.is_empty() {
            self.feed_back(Message::leave(Author::new(member.id, name), room.clone()));
        }

        // Closes the queue; the forwarder then closes the connection
        drop(member);

        self.schedule_room_termination(room);
        stats::client_disconnected();
    }

    pub(crate) fn handle_broadcast(&mut self, message: Message) {
        let Some(entry) = self.rooms.get_mut(&message.room) else {
            tracing::debug!(room = %message.room, kind = %message.kind, "Broadcast to unknown room dropped");
            return;
        };

        if message.kind == MessageKind::SetName {
            let Some(member) = entry.member_mut(message.author.id) else {
                tracing::debug!(
                    room = %message.room,
                    client = %message.author.id,
                    "Set-name from departed client dropped"
                );
                return;
            };
            if let Some(name) = message.name_payload() {
                if member.name.is_empty() {
                    member.name = name.to_owned();
                }
            }
        }

        stats::message_received();

        let frame = message.encode();

        for member in entry.members().filter(|m| m.id != message.author.id) {
            match member.send(frame.clone()) {
                Ok(()) => stats::message_broadcasted(),
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        room = %message.room,
                        client = %member.id,
                        "Client queue full, dropping message"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(
                        room = %message.room,
                        client = %member.id,
                        "Client queue closed"
                    );
                }
            }
        }
    }

    pub(crate) fn handle_control(&mut self, control: Control) {
        match control {
            Control::CreateRoom { responder } => {
                let id = self.create_room();
                let _ = responder.send(id);
            }
            Control::GetRoom { id, responder } => {
                let room = self.rooms.get(id.as_str()).map(|r| r.id().clone());
                let _ = responder.send(room);
            }
            Control::RoomStats { id, responder } => {
                let snapshot = self.rooms.get(id.as_str()).map(Room::stats);
                let _ = responder.send(snapshot);
            }
            Control::RoomCount { responder } => {
                let _ = responder.send(self.rooms.len());
            }
            Control::Expire(room) => self.expire_room(&room),
        }
    }

    /// Insert a new empty room under a fresh id
    pub(crate) fn create_room(&mut self) -> RoomId {
        let id = loop {
            let candidate = (self.next_id)();
            if !self.rooms.contains_key(&candidate) {
                break candidate;
            }
            tracing::debug!(room = %candidate, "Room id collision, regenerating");
        };

        self.rooms.insert(id.clone(), Room::new(id.clone()));
        self.schedule_room_termination(id.clone());
        stats::room_opened();

        tracing::info!(room = %id, rooms = self.rooms.len(), "Room created");
        id
    }

    /// Remove the room if it has stayed empty for the whole grace period
    pub(crate) fn expire_room(&mut self, room: &RoomId) {
        let grace_period = self.config.grace_period;
        let expired = self
            .rooms
            .get(room)
            .is_some_and(|entry| entry.is_expired(Instant::now(), grace_period));

        if expired {
            self.rooms.remove(room);
            stats::room_closed();
            tracing::info!(room = %room, rooms = self.rooms.len(), "Room removed after idle grace period");
        }
    }

    #[cfg(test)]
    pub(crate) fn room(&self, id: &str) -> Option<&Room> {
        self.rooms.get(id)
    }

    #[cfg(test)]
    pub(crate) fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Arm a one-shot timer that posts an expiry check after the grace period
    ///
    /// Timers are never cancelled; the check re-validates the room when it fires.
    fn schedule_room_termination(&self, room: RoomId) {
        let control = self.control_tx.clone();
        let grace_period = self.config.grace_period;

        tokio::spawn(async move {
            tokio::time::sleep(grace_period).await;
            if let Some(tx) = control.upgrade() {
                let _ = tx.send(Control::Expire(room)).await;
            }
        });
    }

    /// Re-enter a message through the broadcast channel without blocking the loop
    fn feed_back(&self, message: Message) {
        if let Some(tx) = self.broadcast_tx.upgrade() {
            tokio::spawn(async move {
                let _ = tx.send(message).await;
            });
        }
    }
}
