//! Client sessions
//!
//! A session covers one connection after it has been registered with the
//! hub: it tracks the display name and turns inbound frames into messages.

pub mod reader;
pub mod state;

pub use reader::{DisconnectReason, InboundFrame, SessionReader};
pub use state::{SessionPhase, SessionState};
