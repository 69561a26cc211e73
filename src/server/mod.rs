//! HTTP and WebSocket front end

pub mod config;
pub mod connection;
pub mod listener;
pub mod routes;

pub use config::ServerConfig;
pub use listener::RelayServer;
pub use routes::router;
