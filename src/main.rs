//! Gateway entry point.
//!
//! ```text
//! http-gateway --config gateway.toml
//! http-gateway --bind 0.0.0.0:8888 \
//!     --backend 'http://127.0.0.1:8801->3' --backend 'http://127.0.0.1:8802->1'
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use http_gateway::config::{load_config, validate_config, GatewayConfig};
use http_gateway::lifecycle::{wait_for_signal, Shutdown};
use http_gateway::observability::{logging, metrics};
use http_gateway::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "http-gateway")]
#[command(about = "Weighted-random HTTP reverse-proxy gateway", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overriding the file.
    #[arg(short, long)]
    bind: Option<String>,

    /// Backend as 'address->weight'; repeat for more. Replaces the file's list.
    #[arg(long = "backend")]
    backends: Vec<String>,

    /// Value sent to backends as X-FROM.
    #[arg(long)]
    gateway_id: Option<String>,

    /// Log level when RUST_LOG is unset.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<GatewayConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => GatewayConfig::default(),
        };

        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
        if !self.backends.is_empty() {
            config.routing.backends = self.backends;
        }
        if let Some(id) = self.gateway_id {
            config.gateway.id = id;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }

        if let Err(errors) = validate_config(&config) {
            let joined = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(format!("invalid configuration: {joined}").into());
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init_logging(&config.observability.log_level)?;
    tracing::info!("http-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backends = ?config.routing.backends,
        gateway_id = %config.gateway.id,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let server = HttpServer::new(config)?;

    let listener = TcpListener::bind(&server.config().listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
