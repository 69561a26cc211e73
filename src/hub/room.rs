//! Room types
//!
//! A room is the broadcast domain: every message scoped to a room is fanned
//! out to its members. Rooms live in the hub's table and are only touched by
//! the control loop.

use std::borrow::Borrow;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::Instant;
use uuid::Uuid;

use super::client::ClientId;

/// Unique room identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(Arc<str>);

impl RoomId {
    /// Generate a fresh random id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string().into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self(id.into())
    }
}

impl From<String> for RoomId {
    fn from(id: String) -> Self {
        Self(id.into())
    }
}

impl Borrow<str> for RoomId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RoomId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered client as seen by the hub
#[derive(Debug)]
pub(crate) struct Member {
    /// Client identity
    pub id: ClientId,

    /// Display name, empty until the client sends set-name
    pub name: String,

    /// Write side of the client's outbound queue
    ///
    /// Dropping it closes the queue, which ends the forwarding task and
    /// closes the connection.
    outbound: mpsc::Sender<Bytes>,
}

impl Member {
    pub(crate) fn new(id: ClientId, outbound: mpsc::Sender<Bytes>) -> Self {
        Self {
            id,
            name: String::new(),
            outbound,
        }
    }

    /// Queue a frame without waiting
    pub(crate) fn send(&self, frame: Bytes) -> Result<(), TrySendError<Bytes>> {
        self.outbound.try_send(frame)
    }
}

/// A named set of connected clients
#[derive(Debug)]
pub struct Room {
    id: RoomId,

    /// Members in join order
    members: Vec<Member>,

    /// When the room was created
    created_at: Instant,

    /// When the room last became empty (None while occupied)
    empty_since: Option<Instant>,
}

impl Room {
    /// Create an empty room
    pub(crate) fn new(id: RoomId) -> Self {
        let now = Instant::now();
        Self {
            id,
            members: Vec::new(),
            created_at: now,
            empty_since: Some(now),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    /// Number of connected members
    pub fn client_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Age of the room
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub(crate) fn add(&mut self, member: Member) {
        self.members.push(member);
        self.empty_since = None;
    }

    /// Remove a member, keeping the order of the rest
    pub(crate) fn remove(&mut self, id: ClientId) -> Option<Member> {
        let index = self.members.iter().position(|m| m.id == id)?;
        let member = self.members.remove(index);

        if self.members.is_empty() {
            self.empty_since = Some(Instant::now());
        }

        Some(member)
    }

    pub(crate) fn member_mut(&mut self, id: ClientId) -> Option<&mut Member> {
        self.members.iter_mut().find(|m| m.id == id)
    }

    pub(crate) fn members(&self) -> impl Iterator<Item = &Member> {
        self.members.iter()
    }

    /// Whether the room has been empty for at least `grace_period`
    pub fn is_expired(&self, now: Instant, grace_period: Duration) -> bool {
        match self.empty_since {
            Some(since) if self.members.is_empty() => {
                now.saturating_duration_since(since) >= grace_period
            }
            _ => false,
        }
    }

    /// Snapshot for introspection
    pub fn stats(&self) -> RoomStats {
        RoomStats {
            client_count: self.members.len(),
            names: self
                .members
                .iter()
                .filter(|m| !m.name.is_empty())
                .map(|m| m.name.clone())
                .collect(),
            idle_for: self.empty_since.map(|since| since.elapsed()),
            age: self.age(),
        }
    }
}

/// Point-in-time statistics for a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomStats {
    /// Connected members
    pub client_count: usize,
    /// Names of members that have set one, in join order
    pub names: Vec<String>,
    /// How long the room has been empty (None while occupied)
    pub idle_for: Option<Duration>,
    /// Time since the room was created
    pub age: Duration,
}
