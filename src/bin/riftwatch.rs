//! Riftwatch CLI - replay an event stream and serve snapshots, or query a server
//!
//! `serve` drives the runtime from newline-delimited JSON events (a file or
//! stdin) on one blocking sequencing thread while the snapshot listener runs
//! on the tokio runtime. `fetch` prints the latest snapshot of a running server.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use riftwatch::runtime::error::{self, EventError};
use riftwatch::runtime::event::EventEnvelope;
use riftwatch::service::client::SnapshotClient;
use riftwatch::{Runtime, RuntimeConfig, ServerConfig, SnapshotServer};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "riftwatch")]
#[command(about = "Guardians of the Rift state tracker and snapshot publisher", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay events and serve snapshots
    Serve {
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Bind address (overrides the config file)
        #[arg(long)]
        bind: Option<String>,

        /// Port (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,

        /// NDJSON event file, or `-` for stdin
        #[arg(short, long)]
        events: Option<String>,
    },

    /// Print the latest snapshot of a running server
    Fetch {
        /// Server address
        #[arg(short, long, default_value = "127.0.0.1:8765")]
        addr: String,

        /// Response timeout in milliseconds
        #[arg(long, default_value = "5000")]
        timeout_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            bind,
            port,
            events,
        } => {
            let mut config = match config {
                Some(path) => RuntimeConfig::load(&path)?,
                None => RuntimeConfig::default(),
            };
            if let Some(bind) = bind {
                config.bind_address = bind;
            }
            if let Some(port) = port {
                config.port = port;
            }
            config.validate()?;
            serve(config, events).await
        }

        Commands::Fetch { addr, timeout_ms } => fetch(&addr, Duration::from_millis(timeout_ms)),
    }
}

async fn serve(config: RuntimeConfig, events: Option<String>) -> Result<()> {
    let runtime = Runtime::new(config);
    let server_config = ServerConfig::from(runtime.config());
    let server = SnapshotServer::start(&server_config, runtime.publisher().clone()).await?;
    println!("riftwatch listening on {}", server.local_addr());

    if let Some(source) = events {
        let replay = tokio::task::spawn_blocking(move || replay(runtime, &source));
        let processed = replay.await.context("replay thread panicked")??;
        info!(processed, "event stream finished; still serving the last snapshot");
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    server.stop().await?;
    Ok(())
}

/// Drive the runtime from an event source; returns the number of events applied
fn replay(mut runtime: Runtime, source: &str) -> error::Result<u64> {
    let reader: Box<dyn BufRead> = if source == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(source).map_err(EventError::from)?))
    };

    let mut processed = 0;
    for line in reader.lines() {
        let line = line.map_err(EventError::from)?;
        if line.trim().is_empty() {
            continue;
        }
        match EventEnvelope::parse(&line) {
            Ok(envelope) => {
                let now = envelope.at.unwrap_or_else(Utc::now);
                runtime.handle(envelope.event, now);
                processed += 1;
            }
            Err(err) => warn!(error = %err, "skipping event"),
        }
    }
    Ok(processed)
}

fn fetch(addr: &str, timeout: Duration) -> Result<()> {
    let mut client =
        SnapshotClient::connect(addr).with_context(|| format!("failed to connect to {addr}"))?;
    client.set_timeout(Some(timeout))?;
    client.handshake("riftwatch-cli")?;

    let snapshot = client.snapshot().context("failed to fetch snapshot")?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
