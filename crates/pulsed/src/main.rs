//! pulsed — the pulse-fetch daemon.
//!
//! # Usage
//!
//! ```text
//! pulsed serve --port 8080 --config pulse.toml --load 0.3
//! pulsed serve --simulate
//! pulsed probe --addr 127.0.0.1:8080 --path /items/1 --prefetch --count 10
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use pulse_core::PulseConfig;
use pulse_observer::{PulseClient, PulseObserver};
use pulse_publisher::LoadPublisher;
use pulsed::{ProbeOptions, build_app, run_probe, simulate_load};

#[derive(Parser)]
#[command(name = "pulsed", about = "pulse-fetch daemon")]
struct Cli {
    /// Path to a pulse.toml configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the demo application behind a load publisher.
    Serve {
        /// Port to listen on.
        #[arg(long, default_value = "8080")]
        port: u16,

        /// Initial simulated load (overrides the config file).
        #[arg(long)]
        load: Option<f64>,

        /// Sweep the load up and down continuously.
        #[arg(long)]
        simulate: bool,

        /// Simulator tick in milliseconds.
        #[arg(long, default_value = "1000")]
        tick_ms: u64,
    },

    /// Probe a server and report the observed pulse.
    Probe {
        /// Server address (host:port).
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: String,

        /// Path to request.
        #[arg(long, default_value = "/")]
        path: String,

        /// Tag requests as prefetches.
        #[arg(long)]
        prefetch: bool,

        /// Number of requests.
        #[arg(long, default_value = "1")]
        count: u32,

        /// Delay between requests in milliseconds.
        #[arg(long, default_value = "1000")]
        interval_ms: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,pulsed=debug,pulse=debug")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Serve {
            port,
            load,
            simulate,
            tick_ms,
        } => run_serve(config, port, load, simulate, Duration::from_millis(tick_ms)).await,
        Command::Probe {
            addr,
            path,
            prefetch,
            count,
            interval_ms,
        } => {
            let options = ProbeOptions {
                path,
                prefetch,
                count,
                interval: Duration::from_millis(interval_ms),
            };
            run_probe_command(config, addr, options).await
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PulseConfig> {
    match path {
        Some(path) => {
            let config = PulseConfig::from_file(path)?;
            info!(path = ?path, "configuration loaded");
            Ok(config)
        }
        None => Ok(PulseConfig::default()),
    }
}

async fn run_serve(
    config: PulseConfig,
    port: u16,
    load: Option<f64>,
    simulate: bool,
    tick: Duration,
) -> anyhow::Result<()> {
    let mut publisher_config = config.publisher_config();
    if let Some(load) = load {
        publisher_config.initial_load = load;
    }

    let publisher = Arc::new(LoadPublisher::configure(publisher_config)?);
    info!(
        endpoint = publisher.endpoint(),
        load = %publisher.current_load(),
        "load publisher configured"
    );

    let router = build_app(publisher.clone())?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let simulator = simulate.then(|| {
        tokio::spawn(simulate_load(publisher.clone(), tick, 0.05, shutdown_rx.clone()))
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "pulse server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    if let Some(handle) = simulator {
        let _ = handle.await;
    }

    info!("pulse server stopped");
    Ok(())
}

async fn run_probe_command(
    config: PulseConfig,
    addr: String,
    options: ProbeOptions,
) -> anyhow::Result<()> {
    let observer = PulseObserver::new(config.observer_config());
    let client = PulseClient::new(addr, observer);

    let report = run_probe(&client, &options).await?;
    info!(
        sent = report.sent,
        fetched = report.fetched,
        rejected = report.rejected,
        failed = report.failed,
        skipped = report.skipped,
        "probe finished"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
