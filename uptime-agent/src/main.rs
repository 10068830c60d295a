//! Uptime Agent - connects to the uptime gateway and keeps the link alive.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use uptime_agent::{Config, ConnectionPhase, GatewayConnection, TracingLogger, WsTransport};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    println!("uptime-agent {}", VERSION);
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Handle --version / -V
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--version" || a == "-V") {
        print_version();
        return Ok(ExitCode::SUCCESS);
    }

    // Load configuration
    let config = Config::load().map_err(|e| {
        format!(
            "Failed to load configuration: {}. \
             Make sure config.toml exists or set UPTIME__GATEWAY__HOST and UPTIME__GATEWAY__IDENTIFY environment variables.",
            e
        )
    })?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting uptime-agent {}", VERSION);

    let transport = WsTransport::from(&config.gateway);
    let mut connection = GatewayConnection::new(config.gateway.clone(), transport, Arc::new(TracingLogger));

    tokio::select! {
        _ = connection.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
            return Ok(ExitCode::SUCCESS);
        }
    }

    match connection.phase() {
        ConnectionPhase::ReconnectExhausted => {
            tracing::error!("Gateway unreachable, restart the agent once the gateway is back");
        }
        phase => {
            tracing::error!("Gateway client stopped unexpectedly in phase {:?}", phase);
        }
    }

    Ok(ExitCode::FAILURE)
}
