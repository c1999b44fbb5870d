//! CSV export job.
//!
//! Dumps every pipeline table to a timestamped session directory, one CSV
//! per table. A failed table is logged and skipped; the rest still export.

use anyhow::{Context, Result};
use chrono::Utc;
use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::database::Database;
use crate::repositories::{LiquidationRepository, MarketRepository, SignalRepository};

/// Raw event rows are capped per export session; the full history stays in
/// the database.
const LIQUIDATION_EXPORT_LIMIT: i64 = 1000;

pub struct CsvExporter {
    root: PathBuf,
}

impl CsvExporter {
    /// Creates an exporter rooted at the given directory.
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Exports all tables into a new `export_<timestamp>` session directory
    /// and returns its path.
    ///
    /// # Errors
    /// Returns an error if the session directory cannot be created.
    pub async fn run(&self, db: &Database) -> Result<PathBuf> {
        let session = self
            .root
            .join(format!("export_{}", Utc::now().format("%Y%m%d_%H%M%S_UTC")));
        std::fs::create_dir_all(&session)
            .with_context(|| format!("Failed to create export directory {session:?}"))?;

        let market = MarketRepository::new(db.pool());
        let liquidations = LiquidationRepository::new(db.pool());
        let signals = SignalRepository::new(db.pool());

        export_table(&session, "metrics", market.recent_metrics(i64::MAX).await);
        export_table(&session, "coingecko", market.recent_prices(i64::MAX).await);
        export_table(&session, "bybit", market.recent_funding(i64::MAX).await);
        export_table(&session, "sopr", market.recent_sopr(i64::MAX).await);
        export_table(&session, "mempool", market.recent_mempool(i64::MAX).await);
        export_table(
            &session,
            "stablecoins",
            market.recent_stablecoins(i64::MAX).await,
        );
        export_table(&session, "altme", market.recent_fear_greed(i64::MAX).await);
        export_table(
            &session,
            "bybit_liquidations",
            liquidations.recent_events(LIQUIDATION_EXPORT_LIMIT).await,
        );
        export_table(
            &session,
            "bybit_liquidations_hourly",
            liquidations.recent_hourly(i64::MAX).await,
        );
        export_table(&session, "signals", signals.recent(i64::MAX).await);

        tracing::info!("Export completed to {:?}", session);
        Ok(session)
    }
}

fn export_table<T: Serialize>(dir: &Path, name: &str, rows: Result<Vec<T>>) {
    let rows = match rows {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("Failed to export {}: {}", name, e);
            return;
        }
    };

    if let Err(e) = write_csv(dir, name, &rows) {
        tracing::error!("Failed to export {}: {}", name, e);
    } else {
        tracing::info!("Exported {} ({} rows)", name, rows.len());
    }
}

fn write_csv<T: Serialize>(dir: &Path, name: &str, rows: &[T]) -> Result<()> {
    let path = dir.join(format!("{name}.csv"));
    let file =
        File::create(&path).with_context(|| format!("Failed to create CSV file {path:?}"))?;
    let mut writer = Writer::from_writer(file);

    for row in rows {
        writer.serialize(row)?;
    }

    writer.flush()?;
    Ok(())
}
