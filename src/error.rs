//! Error types for the relay
//!
//! Peer-facing failures are split into protocol errors (bad frames from a
//! client) and hub errors (room lookups, a stopped control loop). Both fold
//! into the crate-level [`Error`].

use std::io;

use crate::hub::RoomId;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O failure (bind, accept, socket)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A client broke the wire protocol
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Hub request failed
    #[error("hub error: {0}")]
    Hub(#[from] HubError),

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Metrics exporter could not be installed
    #[error("metrics error: {0}")]
    Metrics(String),
}

/// Wire protocol violations
///
/// Every variant is fatal to the session that produced it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// Frame carried no bytes at all
    #[error("empty frame")]
    EmptyFrame,

    /// Leading byte is not a digit in the valid kind range
    #[error("invalid message kind byte {0:#04x}")]
    InvalidKind(u8),

    /// A message other than set-name arrived before the client had a name
    #[error("name must be set before sending kind {0}")]
    NameRequired(u8),

    /// Set-name carried an empty payload
    #[error("empty display name")]
    EmptyName,
}

/// Errors returned by [`Hub`](crate::hub::Hub) operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HubError {
    /// Room does not exist (never created, or already reclaimed)
    #[error("room not found: {0}")]
    RoomNotFound(RoomId),

    /// The control loop has stopped
    #[error("hub is closed")]
    Closed,
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for HubError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        HubError::Closed
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for HubError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        HubError::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        assert_eq!(
            ProtocolError::InvalidKind(b'9').to_string(),
            "invalid message kind byte 0x39"
        );
        assert_eq!(
            ProtocolError::NameRequired(1).to_string(),
            "name must be set before sending kind 1"
        );
    }

    #[test]
    fn test_error_conversions() {
        let err: Error = ProtocolError::EmptyFrame.into();
        assert!(matches!(err, Error::Protocol(ProtocolError::EmptyFrame)));

        let err: Error = HubError::Closed.into();
        assert_eq!(err.to_string(), "hub error: hub is closed");
    }
}
