//! Command-line entry point for the crypto market data pipeline.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crypto_pipeline_core::ConfigLoader;

#[derive(Parser)]
#[command(name = "crypto-pipeline", version, about = "Crypto market data pipeline")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config/Config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the Bybit liquidation stream service until interrupted.
    Stream {
        /// Symbols to subscribe to (overrides the config).
        #[arg(long, value_delimiter = ',')]
        symbols: Option<Vec<String>>,

        /// WebSocket endpoint URL.
        #[arg(long)]
        ws_url: Option<String>,

        /// SQLite database path.
        #[arg(long)]
        db: Option<String>,

        /// Directory for parquet snapshot files.
        #[arg(long)]
        snapshot_dir: Option<String>,

        /// Flush after this many buffered events.
        #[arg(long)]
        flush_size: Option<usize>,

        /// Flush after this many seconds since the last flush.
        #[arg(long)]
        flush_interval: Option<u64>,

        /// Subscription topic template; `{}` is replaced by the symbol.
        #[arg(long)]
        topic: Option<String>,

        /// Skip parquet snapshots for this run.
        #[arg(long)]
        no_snapshots: bool,
    },

    /// Run every REST collector once and refresh the derived signals.
    Collect,

    /// Print a plain-text market report.
    Report,

    /// Export all tables to a timestamped CSV session directory.
    Export,

    /// Create the database schema.
    InitDb,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = ConfigLoader::load_from(&cli.config)?;

    match cli.command {
        Command::Stream {
            symbols,
            ws_url,
            db,
            snapshot_dir,
            flush_size,
            flush_interval,
            topic,
            no_snapshots,
        } => {
            if let Some(symbols) = symbols {
                config.stream.symbols = symbols;
            }
            if let Some(ws_url) = ws_url {
                config.stream.ws_url = ws_url;
            }
            if let Some(db) = db {
                config.database.path = db;
            }
            if let Some(snapshot_dir) = snapshot_dir {
                config.stream.snapshot_dir = snapshot_dir;
            }
            if let Some(flush_size) = flush_size {
                config.stream.flush_size = flush_size;
            }
            if let Some(flush_interval) = flush_interval {
                config.stream.flush_interval_secs = flush_interval;
            }
            if let Some(topic) = topic {
                config.stream.topic_template = topic;
            }
            if no_snapshots {
                config.stream.snapshots_enabled = false;
            }

            crypto_pipeline_bybit::service::run(&config).await
        }
        Command::Collect => commands::collect(&config).await,
        Command::Report => commands::report::run(&config).await,
        Command::Export => commands::export(&config).await,
        Command::InitDb => commands::init_db(&config).await,
    }
}
