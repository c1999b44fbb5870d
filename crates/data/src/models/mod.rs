//! Data models for all persisted pipeline entities.

mod liquidation;
mod market;

pub use liquidation::{HourlyLiquidationRow, LiquidationEvent, LiquidationRow, LiquidationSide};
pub use market::{
    FearGreedRow, FundingRow, MempoolRow, MetricsRow, PriceRow, SignalRow, SoprRow, StablecoinRow,
};
