//! Liquidation data models.
//!
//! Captures normalized liquidation events from the exchange feed, the
//! persisted raw rows, and the hourly rolling aggregates.

use serde::{Deserialize, Serialize};

/// A normalized liquidation event, produced once per inbound feed record.
///
/// Events with a missing symbol or non-positive price/quantity never reach
/// this type; the normalizer filters them before buffering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidationEvent {
    /// Uppercased instrument identifier (e.g., "BTCUSDT")
    pub symbol: String,
    /// Uppercased exchange side string ("BUY", "SELL", or "UNKNOWN")
    pub side: String,
    /// Liquidation price
    pub price: f64,
    /// Liquidated quantity in base-asset units
    pub qty: f64,
    /// Event timestamp, milliseconds since epoch UTC
    pub ts: i64,
    /// Original JSON payload, kept for the durable row
    pub raw: String,
}

impl LiquidationEvent {
    /// Returns the notional USD value of the liquidation.
    #[must_use]
    pub fn qty_usd(&self) -> f64 {
        self.price * self.qty
    }

    /// Returns the start of the event's UTC hour, in epoch seconds.
    #[must_use]
    pub fn hour_start(&self) -> i64 {
        self.ts / 1000 / 3600 * 3600
    }

    /// Classifies the liquidated position direction.
    ///
    /// A SELL liquidation order closes a long position, a BUY order closes
    /// a short.
    #[must_use]
    pub fn side_class(&self) -> LiquidationSide {
        LiquidationSide::from_exchange_side(&self.side)
    }
}

/// Direction of the liquidated position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiquidationSide {
    Long,
    Short,
    Unknown,
}

impl LiquidationSide {
    /// Derives the position direction from the exchange order side.
    #[must_use]
    pub fn from_exchange_side(side: &str) -> Self {
        match side.to_uppercase().as_str() {
            "SELL" => LiquidationSide::Long,
            "BUY" => LiquidationSide::Short,
            _ => LiquidationSide::Unknown,
        }
    }

    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LiquidationSide::Long => "LONG",
            LiquidationSide::Short => "SHORT",
            LiquidationSide::Unknown => "UNKNOWN",
        }
    }
}

/// A persisted raw liquidation row (`bybit_liquidations` table).
///
/// Append-only; immutable once written.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LiquidationRow {
    pub id: i64,
    pub ts: i64,
    pub symbol: String,
    pub side: String,
    pub price: f64,
    pub qty: f64,
    pub qty_usd: f64,
    pub raw: Option<String>,
}

/// An hourly rolling aggregate row (`bybit_liquidations_hourly` table).
///
/// Keyed by (hour_start, symbol, side); accumulated additively, never
/// overwritten or deleted.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct HourlyLiquidationRow {
    /// Start of the UTC hour, epoch seconds
    pub hour_start: i64,
    pub symbol: String,
    pub side: String,
    pub total_qty_usd: f64,
    pub events_count: i64,
}
