//! Core configuration for the crypto market data pipeline.

pub mod config;
pub mod config_loader;

pub use config::{AppConfig, CollectorsConfig, DatabaseConfig, ExportConfig, StreamConfig};
pub use config_loader::ConfigLoader;
