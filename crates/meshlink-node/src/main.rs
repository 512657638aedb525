use std::path::PathBuf;

use clap::Parser;

use meshlink_bootstrap::ConnectionStatus;
use meshlink_node::{Node, NodeConfig};

#[derive(Parser)]
#[command(name = "meshlink-node", about = "6LoWPAN-ND / Thread mesh bootstrap node")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/meshlink/config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match NodeConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load config from {}: {e}", cli.config.display());
            std::process::exit(1);
        }
    };

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        meshlink_node::logging::init_json(&config.logging.level);
    } else {
        meshlink_node::logging::init(&config.logging.level);
    }

    let node = match Node::start(&config).await {
        Ok(node) => node,
        Err(e) => {
            tracing::error!("failed to start node: {e}");
            std::process::exit(1);
        }
    };
    let handle = node.handle();

    let sink = |status: ConnectionStatus| {
        tracing::info!(%status, code = status as u8, "connection status");
    };
    if let Err(e) = handle.connect(sink).await {
        tracing::error!("connect failed: {e}");
        node.shutdown().await;
        std::process::exit(1);
    }

    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("received SIGINT, shutting down");

    if let Err(e) = handle.disconnect().await {
        tracing::warn!("disconnect failed: {e}");
    }
    node.shutdown().await;
}
