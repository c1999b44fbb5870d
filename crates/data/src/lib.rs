//! Data storage and management for the crypto market data pipeline.
//!
//! This crate provides:
//! - SQLite database client with schema DDL
//! - Data models for all persisted entities
//! - Repositories for typed database access
//! - Parquet snapshot and CSV export utilities

pub mod csv_export;
pub mod database;
pub mod models;
pub mod parquet_storage;
pub mod repositories;

pub use csv_export::CsvExporter;
pub use database::Database;
pub use parquet_storage::ParquetSnapshotWriter;

pub use models::{
    FearGreedRow, FundingRow, HourlyLiquidationRow, LiquidationEvent, LiquidationRow,
    LiquidationSide, MempoolRow, MetricsRow, PriceRow, SignalRow, SoprRow, StablecoinRow,
};

pub use repositories::{LiquidationRepository, MarketRepository, SignalRepository};
