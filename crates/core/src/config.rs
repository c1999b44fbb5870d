use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub stream: StreamConfig,
    pub collectors: CollectorsConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: String,
}

/// Settings for the Bybit liquidation stream service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    pub ws_url: String,
    pub symbols: Vec<String>,
    /// Subscription topic template; `{}` is replaced by the symbol.
    pub topic_template: String,
    /// Flush after this many buffered events.
    pub flush_size: usize,
    /// Flush after this many seconds since the last flush.
    pub flush_interval_secs: u64,
    /// Directory for parquet snapshot files.
    pub snapshot_dir: String,
    /// Disable to skip parquet snapshots entirely.
    pub snapshots_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorsConfig {
    /// CoinGecko coin ids for the price collector.
    pub coins: Vec<String>,
    /// Bybit symbols for the funding / open interest collector.
    pub funding_symbols: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Root directory for CSV export sessions.
    pub dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                path: "data/crypto.db".to_string(),
            },
            stream: StreamConfig::default(),
            collectors: CollectorsConfig {
                coins: vec![
                    "bitcoin".to_string(),
                    "ethereum".to_string(),
                    "solana".to_string(),
                    "chainlink".to_string(),
                ],
                funding_symbols: vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()],
            },
            export: ExportConfig {
                dir: "exports".to_string(),
            },
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            ws_url: "wss://stream.bybit.com/v5/public/linear".to_string(),
            symbols: vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()],
            topic_template: "liquidation.{}".to_string(),
            flush_size: 100,
            flush_interval_secs: 5,
            snapshot_dir: "data/bybit_liquidations".to_string(),
            snapshots_enabled: true,
        }
    }
}

impl StreamConfig {
    /// Expands the topic template for one symbol.
    #[must_use]
    pub fn topic_for(&self, symbol: &str) -> String {
        self.topic_template.replace("{}", symbol)
    }

    /// Returns the topic prefix used to match inbound liquidation messages.
    #[must_use]
    pub fn topic_prefix(&self) -> &str {
        self.topic_template
            .split("{}")
            .next()
            .unwrap_or(self.topic_template.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.database.path, "data/crypto.db");
        assert_eq!(config.stream.flush_size, 100);
        assert_eq!(config.stream.flush_interval_secs, 5);
        assert!(config.stream.snapshots_enabled);
        assert_eq!(config.collectors.coins.len(), 4);
    }

    #[test]
    fn test_topic_for_symbol() {
        let config = StreamConfig::default();

        assert_eq!(config.topic_for("BTCUSDT"), "liquidation.BTCUSDT");
    }

    #[test]
    fn test_topic_prefix() {
        let config = StreamConfig::default();

        assert_eq!(config.topic_prefix(), "liquidation.");
    }

    #[test]
    fn test_topic_prefix_custom_template() {
        let config = StreamConfig {
            topic_template: "allLiquidation.{}".to_string(),
            ..StreamConfig::default()
        };

        assert_eq!(config.topic_for("ETHUSDT"), "allLiquidation.ETHUSDT");
        assert_eq!(config.topic_prefix(), "allLiquidation.");
    }
}
