//! Bybit funding rate and open interest collector.
//!
//! The open interest endpoint rejects interval values some deployments
//! disable, so the fetch walks a fallback ladder of intervals and keeps
//! the first that answers with data.

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;

const FUNDING_URL: &str = "https://api.bybit.com/v5/market/funding/history";
const OPEN_INTEREST_URL: &str = "https://api.bybit.com/v5/market/open-interest";

const OI_INTERVALS: &[&str] = &["5min", "1h", "4h"];

pub struct BybitRestCollector {
    client: Client,
}

impl BybitRestCollector {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetches the latest funding rate for one symbol. `None` when the
    /// response carries no usable sample.
    ///
    /// # Errors
    /// Returns an error if the request fails or the body is not JSON.
    pub async fn fetch_funding(&self, symbol: &str) -> Result<Option<f64>> {
        let body: Value = self
            .client
            .get(FUNDING_URL)
            .query(&[("category", "linear"), ("symbol", symbol), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Bybit funding endpoint returned a non-JSON body")?;

        Ok(parse_first_list_field(&body, "fundingRate"))
    }

    /// Fetches the latest open interest for one symbol, trying each interval
    /// in the fallback ladder until one answers.
    ///
    /// # Errors
    /// Returns an error if a request fails or a body is not JSON.
    pub async fn fetch_open_interest(&self, symbol: &str) -> Result<Option<f64>> {
        for interval in OI_INTERVALS {
            let body: Value = self
                .client
                .get(OPEN_INTEREST_URL)
                .query(&[
                    ("category", "linear"),
                    ("symbol", symbol),
                    ("intervalTime", interval),
                    ("limit", "1"),
                ])
                .send()
                .await?
                .error_for_status()?
                .json()
                .await
                .context("Bybit open interest endpoint returned a non-JSON body")?;

            if let Some(oi) = parse_first_list_field(&body, "openInterest") {
                return Ok(Some(oi));
            }
            tracing::debug!(
                "No open interest for {} at interval {}, trying next",
                symbol,
                interval
            );
        }

        Ok(None)
    }
}

/// Pulls `result.list[0].<field>` out of a v5 market response. Bybit
/// serializes numbers as strings.
fn parse_first_list_field(body: &Value, field: &str) -> Option<f64> {
    let value = body.get("result")?.get("list")?.get(0)?.get(field)?;
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_funding_rate_string() {
        let body = json!({
            "retCode": 0,
            "result": {"list": [{"symbol": "BTCUSDT", "fundingRate": "0.0001"}]}
        });

        assert_eq!(parse_first_list_field(&body, "fundingRate"), Some(0.0001));
    }

    #[test]
    fn test_parse_open_interest() {
        let body = json!({
            "result": {"list": [{"openInterest": "54321.5", "timestamp": "1700000000000"}]}
        });

        assert_eq!(parse_first_list_field(&body, "openInterest"), Some(54321.5));
    }

    #[test]
    fn test_empty_list_yields_none() {
        let body = json!({"result": {"list": []}});

        assert_eq!(parse_first_list_field(&body, "fundingRate"), None);
    }

    #[test]
    fn test_error_body_yields_none() {
        let body = json!({"retCode": 10001, "retMsg": "params error"});

        assert_eq!(parse_first_list_field(&body, "fundingRate"), None);
    }
}
