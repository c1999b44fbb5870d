//! Bitcoin mempool congestion collector (mempool.space).

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;

const FEES_URL: &str = "https://mempool.space/api/v1/fees/recommended";
const MEMPOOL_URL: &str = "https://mempool.space/api/mempool";

/// One combined congestion sample.
#[derive(Debug, Clone, PartialEq)]
pub struct MempoolSample {
    pub tx_count: i64,
    pub fee_fastest: f64,
    pub fee_30m: f64,
}

pub struct MempoolCollector {
    client: Client,
}

impl MempoolCollector {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetches recommended fees and the pending transaction count.
    ///
    /// # Errors
    /// Returns an error if a request fails or a body is missing the
    /// expected fields.
    pub async fn fetch(&self) -> Result<MempoolSample> {
        let fees: Value = self
            .client
            .get(FEES_URL)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Fee endpoint returned a non-JSON body")?;
        let mempool: Value = self
            .client
            .get(MEMPOOL_URL)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Mempool endpoint returned a non-JSON body")?;

        parse_sample(&fees, &mempool).context("Mempool response missing expected fields")
    }
}

fn parse_sample(fees: &Value, mempool: &Value) -> Option<MempoolSample> {
    Some(MempoolSample {
        tx_count: mempool.get("count")?.as_i64()?,
        fee_fastest: fees.get("fastestFee")?.as_f64()?,
        fee_30m: fees.get("halfHourFee")?.as_f64()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_sample() {
        let fees = json!({"fastestFee": 42, "halfHourFee": 30, "hourFee": 25});
        let mempool = json!({"count": 61234, "vsize": 12345678, "total_fee": 9.8});

        let sample = parse_sample(&fees, &mempool).unwrap();

        assert_eq!(
            sample,
            MempoolSample {
                tx_count: 61234,
                fee_fastest: 42.0,
                fee_30m: 30.0,
            }
        );
    }

    #[test]
    fn test_missing_count_yields_none() {
        let fees = json!({"fastestFee": 42, "halfHourFee": 30});
        let mempool = json!({"vsize": 12345678});

        assert!(parse_sample(&fees, &mempool).is_none());
    }

    #[test]
    fn test_missing_fee_yields_none() {
        let fees = json!({"fastestFee": 42});
        let mempool = json!({"count": 61234});

        assert!(parse_sample(&fees, &mempool).is_none());
    }
}
