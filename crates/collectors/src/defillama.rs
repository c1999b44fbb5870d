//! Stablecoin circulating supply collector (DefiLlama).

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;

const API_URL: &str = "https://stablecoins.llama.fi/stablecoins";

/// Aggregate USD-pegged supply plus the two largest issuers.
#[derive(Debug, Clone, PartialEq)]
pub struct StablecoinSample {
    pub total: f64,
    pub usdt: f64,
    pub usdc: f64,
}

pub struct StablecoinCollector {
    client: Client,
}

impl StablecoinCollector {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetches the current circulating supply snapshot.
    ///
    /// # Errors
    /// Returns an error if the request fails or no pegged assets are
    /// present.
    pub async fn fetch(&self) -> Result<StablecoinSample> {
        let body: Value = self
            .client
            .get(API_URL)
            .query(&[("includePrices", "true")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Stablecoin endpoint returned a non-JSON body")?;

        parse_supply(&body).context("Stablecoin response carried no pegged assets")
    }
}

fn parse_supply(body: &Value) -> Option<StablecoinSample> {
    let assets = body.get("peggedAssets")?.as_array()?;
    if assets.is_empty() {
        return None;
    }

    let mut sample = StablecoinSample {
        total: 0.0,
        usdt: 0.0,
        usdc: 0.0,
    };
    for asset in assets {
        let Some(circulating) = asset
            .get("circulating")
            .and_then(|c| c.get("peggedUSD"))
            .and_then(Value::as_f64)
        else {
            continue;
        };

        sample.total += circulating;
        match asset.get("symbol").and_then(Value::as_str) {
            Some("USDT") => sample.usdt = circulating,
            Some("USDC") => sample.usdc = circulating,
            _ => {}
        }
    }

    Some(sample)
}
