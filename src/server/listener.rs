//! Relay server listener
//!
//! Binds the HTTP listener and serves the room routes; WebSocket
//! connections are spawned by axum per upgrade.

use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::hub::{Hub, HubConfig};
use crate::server::config::ServerConfig;
use crate::server::routes;

/// Chat relay server
pub struct RelayServer {
    config: ServerConfig,
    hub: Hub,
    hub_task: JoinHandle<()>,
}

impl RelayServer {
    /// Create a new server with the given configuration
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_hub_config(config, HubConfig::default())
    }

    /// Create a new server with custom hub configuration
    pub fn with_hub_config(config: ServerConfig, hub_config: HubConfig) -> Self {
        let (hub, hub_task) = Hub::spawn(hub_config);
        Self {
            config,
            hub,
            hub_task,
        }
    }

    /// Get a handle to the hub
    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the HTTP router for this server
    pub fn router(&self) -> Result<Router> {
        routes::router(self.hub.clone(), &self.config.cors_origin)
    }

    /// Run the server
    ///
    /// This method blocks until the server fails.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Relay server listening");

        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router()?;

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        Ok(())
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}

impl Drop for RelayServer {
    fn drop(&mut self) {
        self.hub_task.abort();
    }
}
