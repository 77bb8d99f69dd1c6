use anyhow::Result;
use channeld_api::{open_store, ChannelServer};
use channeld_core::config::Config;
use channeld_core::logging::init_logging_with_config;
use channeld_core::metrics::init_metrics;
use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "channeld")]
#[command(about = "Channel CRUD HTTP service", long_about = None)]
struct Args {
    /// TOML configuration file; CHANNELD_* variables apply on top
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    host: Option<IpAddr>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.apply_env()?;

    if let Some(host) = args.host {
        config.server.bind_address.set_ip(host);
    }
    if let Some(port) = args.port {
        config.server.bind_address.set_port(port);
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    init_logging_with_config(config.logging.to_log_config()?)?;
    init_metrics();

    info!(
        backend = ?config.store.backend,
        "channeld starting on {}", config.server.bind_address
    );

    let channels = open_store(&config.store)?;
    ChannelServer::new(channels, config.server).run().await
}
