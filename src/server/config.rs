//! Server configuration

use std::net::{Ipv4Addr, SocketAddr};

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8080;

/// Default Prometheus scrape port
pub const DEFAULT_METRICS_PORT: u16 = 2112;

/// Wildcard CORS origin
pub const ANY_ORIGIN: &str = "*";

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to
    pub bind_addr: SocketAddr,

    /// Prometheus exporter address (None = metrics export disabled)
    pub metrics_addr: Option<SocketAddr>,

    /// Allowed CORS origin ("*" = any)
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            metrics_addr: Some(SocketAddr::from((
                Ipv4Addr::UNSPECIFIED,
                DEFAULT_METRICS_PORT,
            ))),
            cors_origin: ANY_ORIGIN.to_string(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Keep the bind IP, change the port
    pub fn port(mut self, port: u16) -> Self {
        self.bind_addr.set_port(port);
        self
    }

    /// Set the metrics exporter address
    pub fn metrics_addr(mut self, addr: SocketAddr) -> Self {
        self.metrics_addr = Some(addr);
        self
    }

    /// Disable the metrics exporter
    pub fn disable_metrics(mut self) -> Self {
        self.metrics_addr = None;
        self
    }

    /// Set the allowed CORS origin
    pub fn cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors_origin = origin.into();
        self
    }

    /// True when any origin may connect
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origin == ANY_ORIGIN
    }
}
