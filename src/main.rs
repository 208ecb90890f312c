//! SimpleFIN Exporter CLI
//!
//! Polls SimpleFIN on an interval and serves the balances on `/metrics`.

use clap::{Parser, Subcommand};
use simplefin_exporter::{
    config::{redact_url, ConfigError, ExporterConfig},
    metrics::{ExporterMetrics, MetricsError, MetricsServer, ServerError, SnapshotCache},
    poller::{PollError, Poller},
    upstream::Fetcher,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "simplefin-exporter", about = "Serve metrics for simplefin data")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Poll SimpleFIN and serve the metrics endpoint
    Serve(ServeArgs),
    /// Print the version of simplefin-exporter
    Version,
}

#[derive(Debug, clap::Args)]
struct ServeArgs {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SimpleFIN access URL, overrides the config file
    #[arg(long, env = "SIMPLEFIN_ACCESS_URL", hide_env_values = true)]
    access_url: Option<String>,

    /// Seconds between polls, overrides the config file
    #[arg(short, long)]
    interval: Option<u64>,

    /// Address for the metrics server, overrides the config file
    #[arg(short, long)]
    bind: Option<SocketAddr>,
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Metrics(#[from] MetricsError),
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error(transparent)]
    Poll(#[from] PollError),
    #[error("poller task stopped unexpectedly: {0}")]
    PollerTask(#[from] tokio::task::JoinError),
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Version => println!("{}", simplefin_exporter::VERSION),
        Command::Serve(args) => {
            if let Err(e) = serve(args).await {
                error!("{}", e);
                std::process::exit(1);
            }
        }
    }
}

fn load_config(args: ServeArgs) -> Result<ExporterConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => ExporterConfig::from_file(path)?,
        None => ExporterConfig::default(),
    };

    if let Some(access_url) = args.access_url {
        config.access_url = access_url;
    }
    if let Some(interval) = args.interval {
        config.interval = interval;
    }
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }

    config.validate()?;
    Ok(config)
}

async fn serve(args: ServeArgs) -> Result<(), AppError> {
    let config = load_config(args)?;

    info!(
        "SimpleFIN exporter v{} polling {} every {}s",
        simplefin_exporter::VERSION,
        redact_url(&config.parsed_access_url()?),
        config.interval
    );

    let fetcher = Fetcher::new(&config)?;
    let cache = SnapshotCache::new();
    let exporter = ExporterMetrics::new()?;

    let poller = Poller::from_config(fetcher, cache.clone(), exporter.clone(), &config).spawn();
    let server = MetricsServer::new(config.server.clone(), cache, exporter);

    tokio::select! {
        result = server.run(shutdown_signal()) => result?,
        result = poller => result??,
    }

    info!("Done");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
