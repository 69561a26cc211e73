//! Room-based chat relay over WebSockets
//!
//! Clients create a room over HTTP, connect to it with a WebSocket and pick
//! a display name. Every frame a client sends is relayed to the other
//! members of its room in a compact text encoding. Rooms nobody is using
//! are reclaimed after a grace period.
//!
//! # Example
//!
//! ```no_run
//! use relay_rs::{RelayServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> relay_rs::Result<()> {
//!     let server = RelayServer::new(ServerConfig::default());
//!     server.run_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     }).await
//! }
//! ```
//!
//! # Modules
//!
//! - [`hub`]: room table, control loop and client forwarding
//! - [`session`]: per-connection read loop and naming rules
//! - [`protocol`]: message kinds and wire encoding
//! - [`server`]: HTTP routes, WebSocket upgrade, listener
//! - [`stats`]: Prometheus metrics

pub mod error;
pub mod hub;
pub mod protocol;
pub mod server;
pub mod session;
pub mod stats;

pub use error::{Error, HubError, ProtocolError, Result};
pub use hub::{Client, ClientId, Hub, HubConfig, RoomId};
pub use protocol::{Message, MessageKind};
pub use server::{RelayServer, ServerConfig};
