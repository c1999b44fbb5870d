//! Fear & greed index collector (alternative.me).

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;

const API_URL: &str = "https://api.alternative.me/fng/";

pub struct FearGreedCollector {
    client: Client,
}

impl FearGreedCollector {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetches the current fear & greed index value.
    ///
    /// # Errors
    /// Returns an error if the request fails or the value is missing.
    pub async fn fetch(&self) -> Result<i64> {
        let body: Value = self
            .client
            .get(API_URL)
            .query(&[("limit", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Fear & greed endpoint returned a non-JSON body")?;

        parse_index(&body).context("Fear & greed response missing the index value")
    }
}

/// The index arrives as a string under `data[0].value`.
fn parse_index(body: &Value) -> Option<i64> {
    let value = body.get("data")?.get(0)?.get("value")?;
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}
