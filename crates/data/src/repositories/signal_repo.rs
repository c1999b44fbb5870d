//! Signal repository.
//!
//! Stores derived classification signals keyed by (ts, name) so multiple
//! signals can coexist at the same timestamp.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::models::SignalRow;

#[derive(Debug, Clone)]
pub struct SignalRepository {
    pool: SqlitePool,
}

impl SignalRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Stores a set of signals at one timestamp, replacing same-key rows.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn store(&self, signals: &[SignalRow]) -> Result<()> {
        if signals.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for signal in signals {
            sqlx::query(
                "INSERT OR REPLACE INTO signals (ts, name, value, classification)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(signal.ts)
            .bind(&signal.name)
            .bind(signal.value)
            .bind(&signal.classification)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Fetches the latest signal snapshot (all rows sharing the max ts).
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn latest(&self) -> Result<Vec<SignalRow>> {
        let rows = sqlx::query_as::<_, SignalRow>(
            "SELECT ts, name, value, classification FROM signals
             WHERE ts = (SELECT MAX(ts) FROM signals)
             ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Returns recent signal rows, newest first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<SignalRow>> {
        let rows = sqlx::query_as::<_, SignalRow>(
            "SELECT ts, name, value, classification FROM signals
             ORDER BY ts DESC, name LIMIT ?",
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

    async fn temp_repo() -> (tempfile::TempDir, SignalRepository) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::connect(path.to_str().unwrap()).await.unwrap();
        db.ensure_schema().await.unwrap();
        (dir, SignalRepository::new(db.pool()))
    }

    fn signal(ts: i64, name: &str, value: f64, classification: &str) -> SignalRow {
        SignalRow {
            ts,
            name: name.to_string(),
            value: Some(value),
            classification: Some(classification.to_string()),
        }
    }

    #[tokio::test]
    async fn test_store_and_latest() {
        let (_dir, repo) = temp_repo().await;

        repo.store(&[
            signal(100, "funding_btc", 0.02, "high"),
            signal(100, "mempool", 60000.0, "congested"),
        ])
        .await
        .unwrap();
        repo.store(&[signal(200, "funding_btc", 0.001, "low")])
            .await
            .unwrap();

        let latest = repo.latest().await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].ts, 200);
        assert_eq!(latest[0].classification.as_deref(), Some("low"));
    }

    #[tokio::test]
    async fn test_same_key_replaces() {
        let (_dir, repo) = temp_repo().await;

        repo.store(&[signal(100, "sopr", 1.02, "bullish")])
            .await
            .unwrap();
        repo.store(&[signal(100, "sopr", 0.98, "bearish")])
            .await
            .unwrap();

        let latest = repo.latest().await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].classification.as_deref(), Some("bearish"));
    }

    #[tokio::test]
    async fn test_latest_empty() {
        let (_dir, repo) = temp_repo().await;

        assert!(repo.latest().await.unwrap().is_empty());
    }
}
