//! Row models for the one-shot market metric collectors.

use serde::Serialize;

/// A spot price sample (`coingecko` table).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PriceRow {
    pub id: i64,
    pub ts: i64,
    pub symbol: String,
    pub price_usd: f64,
}

/// A funding rate / open interest sample (`bybit` table).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FundingRow {
    pub id: i64,
    pub ts: i64,
    pub symbol: String,
    pub funding: Option<f64>,
    pub open_interest: Option<f64>,
}

/// A mempool congestion sample (`mempool` table).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MempoolRow {
    pub ts: i64,
    pub tx_count: i64,
    pub fee_fastest: f64,
    pub fee_30m: f64,
}

/// A SOPR (spent output profit ratio) sample (`sopr` table).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SoprRow {
    pub ts: i64,
    pub value: Option<f64>,
}

/// A fear & greed index sample (`altme` table).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FearGreedRow {
    pub ts: i64,
    pub fng: i64,
}

/// A stablecoin circulating supply sample (`stablecoins` table).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StablecoinRow {
    pub ts: i64,
    pub total: f64,
    pub usdt: f64,
    pub usdc: f64,
}

/// A combined snapshot of the latest value from every metric series
/// (`metrics` table). Any series that has not collected yet is NULL.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MetricsRow {
    pub ts: i64,
    pub sopr: Option<f64>,
    pub stablecoins: Option<f64>,
    pub mempool_tx_count: Option<i64>,
    pub mempool_fee_fastest: Option<f64>,
    pub fng: Option<i64>,
    pub oi_btc: Option<f64>,
    pub oi_eth: Option<f64>,
    pub funding_btc: Option<f64>,
    pub funding_eth: Option<f64>,
}

/// A derived classification signal (`signals` table, PK (ts, name)).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SignalRow {
    pub ts: i64,
    pub name: String,
    pub value: Option<f64>,
    pub classification: Option<String>,
}
