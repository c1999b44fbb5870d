//! Market metrics repository.
//!
//! Typed access for the one-shot REST collector tables and the combined
//! `metrics` snapshot row the signal layer reads.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::models::{
    FearGreedRow, FundingRow, MempoolRow, MetricsRow, PriceRow, SoprRow, StablecoinRow,
};

#[derive(Debug, Clone)]
pub struct MarketRepository {
    pool: SqlitePool,
}

impl MarketRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts a batch of spot price samples at one timestamp.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn insert_prices(&self, ts: i64, prices: &[(String, f64)]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for (symbol, price_usd) in prices {
            sqlx::query("INSERT INTO coingecko (ts, symbol, price_usd) VALUES (?, ?, ?)")
                .bind(ts)
                .bind(symbol)
                .bind(price_usd)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Inserts a funding / open interest sample.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_funding(
        &self,
        ts: i64,
        symbol: &str,
        funding: Option<f64>,
        open_interest: Option<f64>,
    ) -> Result<()> {
        sqlx::query("INSERT INTO bybit (ts, symbol, funding, open_interest) VALUES (?, ?, ?, ?)")
            .bind(ts)
            .bind(symbol)
            .bind(funding)
            .bind(open_interest)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Upserts a mempool congestion sample.
    ///
    /// # Errors
    /// Returns an error if the upsert fails.
    pub async fn insert_mempool(
        &self,
        ts: i64,
        tx_count: i64,
        fee_fastest: f64,
        fee_30m: f64,
    ) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO mempool (ts, tx_count, fee_fastest, fee_30m)
             VALUES (?, ?, ?, ?)",
        )
        .bind(ts)
        .bind(tx_count)
        .bind(fee_fastest)
        .bind(fee_30m)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Upserts a SOPR sample.
    ///
    /// # Errors
    /// Returns an error if the upsert fails.
    pub async fn insert_sopr(&self, ts: i64, value: f64) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO sopr (ts, value) VALUES (?, ?)")
            .bind(ts)
            .bind(value)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Upserts a fear & greed index sample.
    ///
    /// # Errors
    /// Returns an error if the upsert fails.
    pub async fn insert_fear_greed(&self, ts: i64, fng: i64) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO altme (ts, fng) VALUES (?, ?)")
            .bind(ts)
            .bind(fng)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Upserts a stablecoin supply sample.
    ///
    /// # Errors
    /// Returns an error if the upsert fails.
    pub async fn insert_stablecoins(
        &self,
        ts: i64,
        total: f64,
        usdt: f64,
        usdc: f64,
    ) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO stablecoins (ts, total, usdt, usdc) VALUES (?, ?, ?, ?)",
        )
        .bind(ts)
        .bind(total)
        .bind(usdt)
        .bind(usdc)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Combines the latest sample from every series into one `metrics` row.
    ///
    /// Series that have not collected yet contribute NULL.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn snapshot_metrics(&self, ts: i64) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO metrics
                 (ts, sopr, stablecoins, mempool_tx_count, mempool_fee_fastest, fng,
                  oi_btc, oi_eth, funding_btc, funding_eth)
             VALUES (
                 ?,
                 (SELECT value FROM sopr ORDER BY ts DESC LIMIT 1),
                 (SELECT total FROM stablecoins ORDER BY ts DESC LIMIT 1),
                 (SELECT tx_count FROM mempool ORDER BY ts DESC LIMIT 1),
                 (SELECT fee_fastest FROM mempool ORDER BY ts DESC LIMIT 1),
                 (SELECT fng FROM altme ORDER BY ts DESC LIMIT 1),
                 (SELECT open_interest FROM bybit WHERE symbol = 'BTCUSDT'
                      ORDER BY ts DESC LIMIT 1),
                 (SELECT open_interest FROM bybit WHERE symbol = 'ETHUSDT'
                      ORDER BY ts DESC LIMIT 1),
                 (SELECT funding FROM bybit WHERE symbol = 'BTCUSDT'
                      ORDER BY ts DESC LIMIT 1),
                 (SELECT funding FROM bybit WHERE symbol = 'ETHUSDT'
                      ORDER BY ts DESC LIMIT 1)
             )",
        )
        .bind(ts)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetches the most recent combined metrics row.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn latest_metrics(&self) -> Result<Option<MetricsRow>> {
        let row = sqlx::query_as::<_, MetricsRow>(
            "SELECT ts, sopr, stablecoins, mempool_tx_count, mempool_fee_fastest, fng,
                    oi_btc, oi_eth, funding_btc, funding_eth
             FROM metrics ORDER BY ts DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Returns recent spot price rows, newest first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn recent_prices(&self, limit: i64) -> Result<Vec<PriceRow>> {
        let rows = sqlx::query_as::<_, PriceRow>(
            "SELECT id, ts, symbol, price_usd FROM coingecko ORDER BY ts DESC, id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Returns recent funding / open interest rows, newest first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn recent_funding(&self, limit: i64) -> Result<Vec<FundingRow>> {
        let rows = sqlx::query_as::<_, FundingRow>(
            "SELECT id, ts, symbol, funding, open_interest
             FROM bybit ORDER BY ts DESC, id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Returns recent mempool rows, newest first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn recent_mempool(&self, limit: i64) -> Result<Vec<MempoolRow>> {
        let rows = sqlx::query_as::<_, MempoolRow>(
            "SELECT ts, tx_count, fee_fastest, fee_30m FROM mempool ORDER BY ts DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Returns recent SOPR rows, newest first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn recent_sopr(&self, limit: i64) -> Result<Vec<SoprRow>> {
        let rows = sqlx::query_as::<_, SoprRow>(
            "SELECT ts, value FROM sopr ORDER BY ts DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Returns recent fear & greed rows, newest first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn recent_fear_greed(&self, limit: i64) -> Result<Vec<FearGreedRow>> {
        let rows = sqlx::query_as::<_, FearGreedRow>(
            "SELECT ts, fng FROM altme ORDER BY ts DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Returns recent stablecoin supply rows, newest first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn recent_stablecoins(&self, limit: i64) -> Result<Vec<StablecoinRow>> {
        let rows = sqlx::query_as::<_, StablecoinRow>(
            "SELECT ts, total, usdt, usdc FROM stablecoins ORDER BY ts DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Returns recent combined metrics rows, newest first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn recent_metrics(&self, limit: i64) -> Result<Vec<MetricsRow>> {
        let rows = sqlx::query_as::<_, MetricsRow>(
            "SELECT ts, sopr, stablecoins, mempool_tx_count, mempool_fee_fastest, fng,
                    oi_btc, oi_eth, funding_btc, funding_eth
             FROM metrics ORDER BY ts DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    async fn temp_repo() -> (tempfile::TempDir, MarketRepository) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::connect(path.to_str().unwrap()).await.unwrap();
        db.ensure_schema().await.unwrap();
        (dir, MarketRepository::new(db.pool()))
    }

    #[tokio::test]
    async fn test_insert_and_query_prices() {
        let (_dir, repo) = temp_repo().await;

        repo.insert_prices(
            1_700_000_000,
            &[("btc".to_string(), 50000.0), ("eth".to_string(), 3000.0)],
        )
        .await
        .unwrap();

        let rows = repo.recent_prices(10).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].ts, 1_700_000_000);
    }

    #[tokio::test]
    async fn test_metrics_snapshot_combines_latest_values() {
        let (_dir, repo) = temp_repo().await;

        repo.insert_funding(1_700_000_000, "BTCUSDT", Some(0.0005), Some(120_000.0))
            .await
            .unwrap();
        repo.insert_funding(1_700_000_100, "BTCUSDT", Some(0.0008), Some(130_000.0))
            .await
            .unwrap();
        repo.insert_mempool(1_700_000_000, 45_000, 30.0, 22.0)
            .await
            .unwrap();
        repo.insert_fear_greed(1_700_000_000, 62).await.unwrap();

        repo.snapshot_metrics(1_700_000_200).await.unwrap();

        let metrics = repo.latest_metrics().await.unwrap().unwrap();
        assert_eq!(metrics.ts, 1_700_000_200);
        // Latest funding sample wins
        assert_eq!(metrics.funding_btc, Some(0.0008));
        assert_eq!(metrics.oi_btc, Some(130_000.0));
        assert_eq!(metrics.mempool_tx_count, Some(45_000));
        assert_eq!(metrics.fng, Some(62));
        // Never-collected series stay NULL
        assert_eq!(metrics.sopr, None);
        assert_eq!(metrics.funding_eth, None);
    }

    #[tokio::test]
    async fn test_sopr_upsert_and_snapshot() {
        let (_dir, repo) = temp_repo().await;

        repo.insert_sopr(1_700_000_000, 1.02).await.unwrap();
        // Same timestamp replaces
        repo.insert_sopr(1_700_000_000, 1.03).await.unwrap();
        repo.insert_sopr(1_700_000_100, 0.99).await.unwrap();

        let rows = repo.recent_sopr(10).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].value, Some(0.99));

        repo.snapshot_metrics(1_700_000_200).await.unwrap();
        let metrics = repo.latest_metrics().await.unwrap().unwrap();
        assert_eq!(metrics.sopr, Some(0.99));
    }

    #[tokio::test]
    async fn test_latest_metrics_empty_db() {
        let (_dir, repo) = temp_repo().await;

        assert!(repo.latest_metrics().await.unwrap().is_none());
    }
}
