//! SQLite database client.
//!
//! One explicitly owned handle per service instance: opened at startup,
//! closed at shutdown, passed into repositories by cloning the pool.

use anyhow::{Context, Result};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use std::str::FromStr;

/// Idempotent DDL for every pipeline table.
const DDL: &[(&str, &str)] = &[
    (
        "metrics",
        "CREATE TABLE IF NOT EXISTS metrics (
            ts INTEGER PRIMARY KEY,
            sopr REAL,
            stablecoins REAL,
            mempool_tx_count INTEGER,
            mempool_fee_fastest REAL,
            fng INTEGER,
            oi_btc REAL,
            oi_eth REAL,
            funding_btc REAL,
            funding_eth REAL
        )",
    ),
    (
        "coingecko",
        "CREATE TABLE IF NOT EXISTS coingecko (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ts INTEGER NOT NULL,
            symbol TEXT NOT NULL,
            price_usd REAL NOT NULL
        )",
    ),
    (
        "bybit",
        "CREATE TABLE IF NOT EXISTS bybit (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ts INTEGER NOT NULL,
            symbol TEXT NOT NULL,
            funding REAL,
            open_interest REAL
        )",
    ),
    (
        "sopr",
        "CREATE TABLE IF NOT EXISTS sopr (
            ts INTEGER PRIMARY KEY,
            value REAL
        )",
    ),
    (
        "altme",
        "CREATE TABLE IF NOT EXISTS altme (
            ts INTEGER PRIMARY KEY,
            fng INTEGER
        )",
    ),
    (
        "mempool",
        "CREATE TABLE IF NOT EXISTS mempool (
            ts INTEGER PRIMARY KEY,
            tx_count INTEGER,
            fee_fastest REAL,
            fee_30m REAL
        )",
    ),
    (
        "stablecoins",
        "CREATE TABLE IF NOT EXISTS stablecoins (
            ts INTEGER PRIMARY KEY,
            total REAL,
            usdt REAL,
            usdc REAL
        )",
    ),
    (
        "bybit_liquidations",
        "CREATE TABLE IF NOT EXISTS bybit_liquidations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ts INTEGER NOT NULL,
            symbol TEXT NOT NULL,
            side TEXT NOT NULL,
            price REAL,
            qty REAL,
            qty_usd REAL,
            raw TEXT
        )",
    ),
    (
        "bybit_liquidations_hourly",
        "CREATE TABLE IF NOT EXISTS bybit_liquidations_hourly (
            hour_start INTEGER NOT NULL,
            symbol TEXT NOT NULL,
            side TEXT NOT NULL,
            total_qty_usd REAL NOT NULL DEFAULT 0,
            events_count INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (hour_start, symbol, side)
        )",
    ),
    (
        "signals",
        "CREATE TABLE IF NOT EXISTS signals (
            ts INTEGER NOT NULL,
            name TEXT NOT NULL,
            value REAL,
            classification TEXT,
            PRIMARY KEY (ts, name)
        )",
    ),
    (
        "meta",
        "CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT
        )",
    ),
];

#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if missing) the SQLite database at `path` with WAL
    /// journaling and NORMAL synchronous mode.
    ///
    /// # Errors
    /// Returns an error if the parent directory cannot be created or the
    /// database cannot be opened.
    pub async fn connect(path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create database directory {parent:?}"))?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite://{path}"))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Returns a clone of the underlying pool for repository construction.
    #[must_use]
    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    /// Ensures all pipeline tables exist. Safe to run repeatedly.
    ///
    /// # Errors
    /// Returns an error if any DDL statement fails.
    pub async fn ensure_schema(&self) -> Result<()> {
        for (name, ddl) in DDL {
            sqlx::query(ddl).execute(&self.pool).await?;
            tracing::debug!("Ensured table: {}", name);
        }
        tracing::info!("Database schema ready");
        Ok(())
    }

    /// Reads a value from the `meta` key/value table.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let value: Option<(String,)> = sqlx::query_as("SELECT value FROM meta WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value.map(|(v,)| v))
    }

    /// Upserts a value into the `meta` key/value table.
    ///
    /// # Errors
    /// Returns an error if the upsert fails.
    pub async fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO meta (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Closes the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::connect(path.to_str().unwrap()).await.unwrap();
        db.ensure_schema().await.unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let (_dir, db) = temp_db().await;

        // Second run must not fail
        db.ensure_schema().await.unwrap();
    }

    #[tokio::test]
    async fn test_meta_roundtrip() {
        let (_dir, db) = temp_db().await;

        assert_eq!(db.get_meta("schema_version").await.unwrap(), None);

        db.set_meta("schema_version", "1").await.unwrap();
        assert_eq!(
            db.get_meta("schema_version").await.unwrap(),
            Some("1".to_string())
        );

        db.set_meta("schema_version", "2").await.unwrap();
        assert_eq!(
            db.get_meta("schema_version").await.unwrap(),
            Some("2".to_string())
        );
    }
}
