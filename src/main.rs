//! Chat Relay - Entry Point
//!
//! Loads configuration, starts the TCP listener and serves until ctrl-c.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chat_relay::{ChatServer, Config};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// TCP port to listen on
    port: Option<u16>,
    /// Maximum number of clients served at once
    max_clients: Option<usize>,
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Interface to bind
    #[arg(short = 'H', long)]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_relay::chat=off
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("chat_relay=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(max_clients) = args.max_clients {
        config.server.max_clients = max_clients;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }

    let listener = TcpListener::bind(config.server.listen_addr()).await?;
    let server = Arc::new(ChatServer::new(config));
    let mut serve = tokio::spawn(Arc::clone(&server).serve(listener));

    tokio::select! {
        result = &mut serve => {
            // Accept loop only returns on its own after an accept failure
            match result {
                Ok(Err(e)) => {
                    error!("ChatServer error: {}", e);
                    return Err(e.into());
                }
                Err(e) => {
                    error!("Accept task panicked: {}", e);
                    return Err(e.into());
                }
                Ok(Ok(())) => {}
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received");
            server.shutdown_all();
            let _ = serve.await;
        }
    }

    info!("ChatServer stopped");
    Ok(())
}
