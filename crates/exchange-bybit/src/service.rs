//! Stream service supervisor.
//!
//! Owns the resources the stream client runs on: database handle, batching
//! writer, snapshot sink, and the shutdown channel. On SIGINT/SIGTERM the
//! client winds down, the writer is flushed one last time, and the database
//! is closed, so buffered events survive a restart.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crypto_pipeline_core::AppConfig;
use crypto_pipeline_data::{Database, LiquidationRepository, ParquetSnapshotWriter};

use crate::websocket::BybitStreamClient;
use crate::writer::LiquidationWriter;

/// Runs the liquidation stream service until a shutdown signal arrives.
///
/// # Errors
/// Returns an error if the database or snapshot directory cannot be opened.
pub async fn run(config: &AppConfig) -> Result<()> {
    let db = Database::connect(&config.database.path).await?;
    db.ensure_schema().await?;

    let repo = LiquidationRepository::new(db.pool());
    let snapshots = if config.stream.snapshots_enabled {
        Some(ParquetSnapshotWriter::new(&config.stream.snapshot_dir)?)
    } else {
        None
    };

    let writer = Arc::new(LiquidationWriter::new(
        repo,
        snapshots,
        config.stream.flush_size,
        Duration::from_secs(config.stream.flush_interval_secs),
    ));

    let (stop_tx, stop_rx) = watch::channel(false);
    spawn_signal_listener(stop_tx);

    let mut client = BybitStreamClient::new(config.stream.clone(), Arc::clone(&writer), stop_rx);
    client.run().await;

    // Drain whatever is still buffered before letting the process exit
    writer.flush().await;
    db.close().await;
    tracing::info!("Stream service shut down cleanly");

    Ok(())
}

/// Flips the stop channel on SIGINT or SIGTERM.
fn spawn_signal_listener(stop_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!("Failed to install SIGTERM handler: {}", e);
                    return;
                }
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }

        tracing::info!("Shutdown signal received");
        let _ = stop_tx.send(true);
    });
}
