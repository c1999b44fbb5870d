//! CoinGecko spot price collector.

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;

const API_URL: &str = "https://api.coingecko.com/api/v3/coins/markets";

/// Fetches USD market data for a set of CoinGecko coin ids.
pub struct CoinGeckoCollector {
    client: Client,
}

impl CoinGeckoCollector {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetches the markets listing for the configured coins and returns
    /// `(ticker symbol, current price)` pairs. Entries without a symbol
    /// are skipped; a missing price stores as zero.
    ///
    /// # Errors
    /// Returns an error if the request fails or the body is not JSON.
    pub async fn fetch(&self, coins: &[String]) -> Result<Vec<(String, f64)>> {
        let ids = coins.join(",");
        let body: Value = self
            .client
            .get(API_URL)
            .query(&[
                ("vs_currency", "usd"),
                ("ids", ids.as_str()),
                ("price_change_percentage", "24h"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("CoinGecko returned a non-JSON body")?;

        Ok(parse_prices(&body))
    }
}

fn parse_prices(body: &Value) -> Vec<(String, f64)> {
    let Some(items) = body.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let symbol = item.get("symbol")?.as_str()?.to_string();
            let price = item
                .get("current_price")
                .and_then(Value::as_f64)
                .unwrap_or(0.0);
            Some((symbol, price))
        })
        .collect()
}
