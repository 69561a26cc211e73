//! Relay wire protocol
//!
//! Every WebSocket text frame carries one message. Clients send a kind digit
//! followed by the payload; the server forwards `<kind><author>|<payload>`.

pub mod constants;
pub mod message;

pub use message::{parse_frame, Author, Message, MessageKind};
