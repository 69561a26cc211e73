//! Chat message types and wire encoding
//!
//! Inbound frames (client to server) are a kind digit followed by raw payload:
//! ```text
//! +---------+----------------+
//! | Kind(1) | Payload(N)     |
//! | '1'-'6' |                |
//! +---------+----------------+
//! ```
//!
//! Outbound frames (server to client) name the author and always contain the
//! separator, even when the payload is omitted:
//! ```text
//! +---------+--------------+-----+-------------------+
//! | Kind(1) | AuthorName   | '|' | Payload (text only)|
//! +---------+--------------+-----+-------------------+
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::hub::{ClientId, RoomId};

use super::constants::{MAX_KIND, MIN_KIND, NAME_SEPARATOR};

/// Message kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    /// Chat text, forwarded verbatim
    Text = 1,
    /// Sets the author's display name
    SetName = 2,
    /// Author left the room
    Leave = 3,
    /// Author started typing
    Typing = 4,
    /// Author stopped typing
    StopTyping = 5,
    /// Accepted on the wire but has no defined meaning
    Reserved = 6,
}

impl MessageKind {
    /// Parse the numeric tag (1-6)
    pub fn from_u8(n: u8) -> Option<Self> {
        match n {
            1 => Some(MessageKind::Text),
            2 => Some(MessageKind::SetName),
            3 => Some(MessageKind::Leave),
            4 => Some(MessageKind::Typing),
            5 => Some(MessageKind::StopTyping),
            6 => Some(MessageKind::Reserved),
            _ => None,
        }
    }

    /// Parse the ASCII digit that leads an inbound frame
    pub fn from_digit(b: u8) -> Result<Self, ProtocolError> {
        if !b.is_ascii_digit() {
            return Err(ProtocolError::InvalidKind(b));
        }
        let n = b - b'0';
        if !(MIN_KIND..=MAX_KIND).contains(&n) {
            return Err(ProtocolError::InvalidKind(b));
        }
        Self::from_u8(n).ok_or(ProtocolError::InvalidKind(b))
    }

    /// Numeric tag value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// ASCII digit used on the wire
    pub fn digit(self) -> u8 {
        b'0' + self.as_u8()
    }

    /// Whether messages of this kind keep their payload
    pub fn carries_payload(self) -> bool {
        matches!(self, MessageKind::Text | MessageKind::SetName)
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MessageKind::Text => "text",
            MessageKind::SetName => "set-name",
            MessageKind::Leave => "leave",
            MessageKind::Typing => "typing",
            MessageKind::StopTyping => "stop-typing",
            MessageKind::Reserved => "reserved",
        };
        f.write_str(name)
    }
}

/// Who sent a message, as seen at the time it was sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    /// Connection the message came from
    pub id: ClientId,
    /// Display name (empty for anonymous clients)
    pub name: String,
}

impl Author {
    pub fn new(id: ClientId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A single message routed through the hub
///
/// Built per inbound frame or per synthetic event, consumed once by fan-out.
#[derive(Debug, Clone)]
pub struct Message {
    /// Kind tag
    pub kind: MessageKind,
    /// Sender
    pub author: Author,
    /// Room the message is scoped to
    pub room: RoomId,
    /// Payload, present only for text and set-name
    pub payload: Option<Bytes>,
}

impl Message {
    /// Create a message, discarding the payload for kinds that carry none
    pub fn new(author: Author, room: RoomId, kind: MessageKind, payload: Option<Bytes>) -> Self {
        let payload = if kind.carries_payload() {
            payload
        } else {
            None
        };

        Self {
            kind,
            author,
            room,
            payload,
        }
    }

    /// Create a text message
    pub fn text(author: Author, room: RoomId, text: impl Into<Bytes>) -> Self {
        Self::new(author, room, MessageKind::Text, Some(text.into()))
    }

    /// Create a leave notification
    pub fn leave(author: Author, room: RoomId) -> Self {
        Self::new(author, room, MessageKind::Leave, None)
    }

    /// Payload interpreted as a display name (set-name only)
    pub fn name_payload(&self) -> Option<&str> {
        if self.kind != MessageKind::SetName {
            return None;
        }
        self.payload
            .as_ref()
            .and_then(|p| std::str::from_utf8(p).ok())
    }

    /// Encode for delivery to other room members
    ///
    /// The payload segment is written only for text messages.
    pub fn encode(&self) -> Bytes {
        let payload = match (self.kind, &self.payload) {
            (MessageKind::Text, Some(p)) => p.as_ref(),
            _ => &[],
        };

        let mut buf = BytesMut::with_capacity(2 + self.author.name.len() + payload.len());
        buf.put_u8(self.kind.digit());
        buf.put_slice(self.author.name.as_bytes());
        buf.put_u8(NAME_SEPARATOR);
        buf.put_slice(payload);
        buf.freeze()
    }
}

/// Split an inbound frame into its kind and raw payload
///
/// The payload shares the frame's allocation.
pub fn parse_frame(frame: Bytes) -> Result<(MessageKind, Bytes), ProtocolError> {
    let first = *frame.first().ok_or(ProtocolError::EmptyFrame)?;
    let kind = MessageKind::from_digit(first)?;
    Ok((kind, frame.slice(1..)))
}
