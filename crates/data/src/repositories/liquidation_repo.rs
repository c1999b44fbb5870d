//! Liquidation repository.
//!
//! The durable sink of the ingestion pipeline: appends raw events and
//! maintains the hourly rolling aggregates, one transaction per batch.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::models::{HourlyLiquidationRow, LiquidationEvent, LiquidationRow};

/// Repository for liquidation events and hourly aggregates.
#[derive(Debug, Clone)]
pub struct LiquidationRepository {
    pool: SqlitePool,
}

impl LiquidationRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persists a flushed batch: inserts every event as a raw row and
    /// accumulates it into the hourly aggregate, committing once.
    ///
    /// On error the whole batch rolls back; partial persistence never
    /// survives.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn persist_batch(&self, events: &[LiquidationEvent]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for event in events {
            sqlx::query(
                "INSERT INTO bybit_liquidations (ts, symbol, side, price, qty, qty_usd, raw)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(event.ts)
            .bind(&event.symbol)
            .bind(&event.side)
            .bind(event.price)
            .bind(event.qty)
            .bind(event.qty_usd())
            .bind(&event.raw)
            .execute(&mut *tx)
            .await?;
        }

        for event in events {
            sqlx::query(
                "INSERT INTO bybit_liquidations_hourly
                     (hour_start, symbol, side, total_qty_usd, events_count)
                 VALUES (?, ?, ?, ?, 1)
                 ON CONFLICT(hour_start, symbol, side) DO UPDATE SET
                     total_qty_usd = total_qty_usd + excluded.total_qty_usd,
                     events_count = events_count + 1",
            )
            .bind(event.hour_start())
            .bind(&event.symbol)
            .bind(&event.side)
            .bind(event.qty_usd())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Fetches one hourly aggregate by its full key.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn hourly_aggregate(
        &self,
        hour_start: i64,
        symbol: &str,
        side: &str,
    ) -> Result<Option<HourlyLiquidationRow>> {
        let row = sqlx::query_as::<_, HourlyLiquidationRow>(
            "SELECT hour_start, symbol, side, total_qty_usd, events_count
             FROM bybit_liquidations_hourly
             WHERE hour_start = ? AND symbol = ? AND side = ?",
        )
        .bind(hour_start)
        .bind(symbol)
        .bind(side)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Returns the most recent hourly aggregates.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn recent_hourly(&self, limit: i64) -> Result<Vec<HourlyLiquidationRow>> {
        let rows = sqlx::query_as::<_, HourlyLiquidationRow>(
            "SELECT hour_start, symbol, side, total_qty_usd, events_count
             FROM bybit_liquidations_hourly
             ORDER BY hour_start DESC, total_qty_usd DESC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Returns the most recent raw event rows.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn recent_events(&self, limit: i64) -> Result<Vec<LiquidationRow>> {
        let rows = sqlx::query_as::<_, LiquidationRow>(
            "SELECT id, ts, symbol, side, price, qty, qty_usd, raw
             FROM bybit_liquidations
             ORDER BY ts DESC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Counts all persisted raw events.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn event_count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bybit_liquidations")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
