//! Session state machine
//!
//! Tracks one connection from upgrade to disconnect and decides which inbound
//! frames become messages.

use bytes::Bytes;

use crate::error::ProtocolError;
use crate::hub::{ClientId, RoomId};
use crate::protocol::{parse_frame, Author, Message, MessageKind};

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Registered, no display name yet
    Anonymous,
    /// Display name set; all message kinds accepted
    Named,
}

/// Per-connection state kept by the read loop
#[derive(Debug)]
pub struct SessionState {
    /// Client id assigned at connect
    pub client: ClientId,

    /// Room the client joined
    pub room: RoomId,

    /// Current phase
    pub phase: SessionPhase,

    /// Display name, empty while anonymous
    name: String,

    /// Frames turned into messages
    pub messages_accepted: u64,
}

impl SessionState {
    pub fn new(client: ClientId, room: RoomId) -> Self {
        Self {
            client,
            room,
            phase: SessionPhase::Anonymous,
            name: String::new(),
            messages_accepted: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_named(&self) -> bool {
        self.phase == SessionPhase::Named
    }

    /// Turn an inbound text frame into a message for the hub
    ///
    /// Returns `Ok(None)` for frames that are dropped without ending the
    /// session (a repeated set-name). Any error ends the session.
    pub fn accept(&mut self, frame: Bytes) -> Result<Option<Message>, ProtocolError> {
        let (kind, payload) = parse_frame(frame)?;

        if kind == MessageKind::SetName {
            if self.is_named() {
                tracing::debug!(
                    client = %self.client,
                    name = %self.name,
                    "Ignoring repeated set-name"
                );
                return Ok(None);
            }

            let name = String::from_utf8_lossy(&payload).into_owned();
            if name.is_empty() {
                return Err(ProtocolError::EmptyName);
            }

            self.name = name;
            self.phase = SessionPhase::Named;
        } else if !self.is_named() {
            return Err(ProtocolError::NameRequired(kind.as_u8()));
        }

        self.messages_accepted += 1;

        let author = Author::new(self.client, self.name.clone());
        Ok(Some(Message::new(
            author,
            self.room.clone(),
            kind,
            Some(payload),
        )))
    }
}
