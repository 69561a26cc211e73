//! Room hub
//!
//! The hub owns every room and every registered client. All membership
//! changes and all routing decisions happen inside one control loop task;
//! everything else talks to it through channels.
//!
//! # Architecture
//!
//! ```text
//!      Hub (cloneable handle)
//!   register ─┐  unregister ─┐  broadcast ─┐  control ─┐
//!             ▼              ▼             ▼           ▼
//!          ┌──────────────────────────────────────────────┐
//!          │ ControlLoop                                  │
//!          │   rooms: HashMap<RoomId, Room {              │
//!          │     members: Vec<Member { outbound: Tx }>    │
//!          │   }>                                         │
//!          └───────────────────┬──────────────────────────┘
//!                              │ try_send(encoded frame)
//!         ┌────────────────────┼────────────────────┐
//!         ▼                    ▼                    ▼
//!    [forwarder]          [forwarder]          [forwarder]
//!     queue.recv()         queue.recv()         queue.recv()
//!         │                    │                    │
//!         └──► sink.send() ──► WebSocket
//! ```
//!
//! # Room reclamation
//!
//! Creating a room, and every unregister that removes a member, arms a
//! one-shot timer. When it fires, the loop removes the room only if it is
//! still present and has been empty for the whole grace period, so stale
//! timers are harmless.

pub mod client;
pub mod config;
mod control;
pub mod handle;
pub mod instruction;
pub mod room;

pub use client::{Client, ClientId};
pub use config::HubConfig;
pub use handle::Hub;
pub use instruction::Instruction;
pub use room::{Room, RoomId, RoomStats};
