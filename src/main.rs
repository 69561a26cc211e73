use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use relay_rs::server::config::{DEFAULT_METRICS_PORT, DEFAULT_PORT};
use relay_rs::{HubConfig, RelayServer, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "relay-server")]
#[command(about = "Room-based WebSocket chat relay")]
#[command(version)]
struct Cli {
    /// HTTP port
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Allowed CORS origin ("*" for any)
    #[arg(long, env = "CORS_ORIGIN", default_value = "*")]
    cors_origin: String,

    /// Prometheus scrape port
    #[arg(long, env = "METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    metrics_port: u16,

    /// Do not start the metrics exporter
    #[arg(long)]
    no_metrics: bool,

    /// Seconds an empty room is kept before it is removed
    #[arg(long, env = "ROOM_GRACE_SECS", default_value_t = 60)]
    room_grace_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("relay_rs=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = ServerConfig::default()
        .port(cli.port)
        .cors_origin(cli.cors_origin);
    config = if cli.no_metrics {
        config.disable_metrics()
    } else {
        config.metrics_addr(SocketAddr::from((Ipv4Addr::UNSPECIFIED, cli.metrics_port)))
    };

    if let Some(addr) = config.metrics_addr {
        relay_rs::stats::install_exporter(addr).context("failed to start metrics exporter")?;
    }

    let hub_config = HubConfig::default().grace_period(Duration::from_secs(cli.room_grace_secs));
    let server = RelayServer::with_hub_config(config, hub_config);

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await
        .with_context(|| format!("relay server on {} failed", server.bind_addr()))?;

    Ok(())
}
