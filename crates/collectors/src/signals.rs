//! Derived classification signals.
//!
//! Pure threshold classification over the latest combined metrics row.
//! A metric that has never been collected produces no signal at all rather
//! than a misleading default.

use crypto_pipeline_data::{MetricsRow, SignalRow};

/// Funding above this per-interval rate is treated as overheated.
pub const FUNDING_HIGH_THRESHOLD: f64 = 0.01;
/// Pending transactions above this count classify the mempool as congested.
pub const MEMPOOL_CONGESTED_TX: i64 = 50_000;

/// Computes the signal set for one metrics snapshot.
#[must_use]
pub fn compute_signals(metrics: &MetricsRow) -> Vec<SignalRow> {
    let mut signals = Vec::new();

    if let Some(sopr) = metrics.sopr {
        let classification = if sopr > 1.0 { "bullish" } else { "bearish" };
        signals.push(signal(metrics.ts, "sopr", sopr, classification));
    }

    for (name, funding) in [
        ("funding_btc", metrics.funding_btc),
        ("funding_eth", metrics.funding_eth),
    ] {
        if let Some(rate) = funding {
            let classification = if rate > FUNDING_HIGH_THRESHOLD {
                "high"
            } else {
                "low"
            };
            signals.push(signal(metrics.ts, name, rate, classification));
        }
    }

    if let Some(tx_count) = metrics.mempool_tx_count {
        let classification = if tx_count > MEMPOOL_CONGESTED_TX {
            "congested"
        } else {
            "normal"
        };
        #[allow(clippy::cast_precision_loss)]
        signals.push(signal(metrics.ts, "mempool", tx_count as f64, classification));
    }

    signals
}

fn signal(ts: i64, name: &str, value: f64, classification: &str) -> SignalRow {
    SignalRow {
        ts,
        name: name.to_string(),
        value: Some(value),
        classification: Some(classification.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> MetricsRow {
        MetricsRow {
            ts: 1_700_000_000,
            sopr: None,
            stablecoins: None,
            mempool_tx_count: None,
            mempool_fee_fastest: None,
            fng: None,
            oi_btc: None,
            oi_eth: None,
            funding_btc: None,
            funding_eth: None,
        }
    }

    fn find<'a>(signals: &'a [SignalRow], name: &str) -> &'a SignalRow {
        signals
            .iter()
            .find(|s| s.name == name)
            .unwrap_or_else(|| panic!("signal {name} missing"))
    }

    #[test]
    fn test_empty_metrics_produce_no_signals() {
        assert!(compute_signals(&metrics()).is_empty());
    }

    #[test]
    fn test_sopr_classification() {
        let mut m = metrics();
        m.sopr = Some(1.03);
        assert_eq!(
            find(&compute_signals(&m), "sopr").classification.as_deref(),
            Some("bullish")
        );

        m.sopr = Some(0.97);
        assert_eq!(
            find(&compute_signals(&m), "sopr").classification.as_deref(),
            Some("bearish")
        );

        // Exactly 1.0 is not above the threshold
        m.sopr = Some(1.0);
        assert_eq!(
            find(&compute_signals(&m), "sopr").classification.as_deref(),
            Some("bearish")
        );
    }

    #[test]
    fn test_funding_classification_per_symbol() {
        let mut m = metrics();
        m.funding_btc = Some(0.02);
        m.funding_eth = Some(0.0001);

        let signals = compute_signals(&m);

        assert_eq!(
            find(&signals, "funding_btc").classification.as_deref(),
            Some("high")
        );
        assert_eq!(
            find(&signals, "funding_eth").classification.as_deref(),
            Some("low")
        );
    }

    #[test]
    fn test_mempool_classification() {
        let mut m = metrics();
        m.mempool_tx_count = Some(61_000);
        assert_eq!(
            find(&compute_signals(&m), "mempool")
                .classification
                .as_deref(),
            Some("congested")
        );

        m.mempool_tx_count = Some(12_000);
        let signals = compute_signals(&m);
        let mempool = find(&signals, "mempool");
        assert_eq!(mempool.classification.as_deref(), Some("normal"));
        assert_eq!(mempool.value, Some(12_000.0));
    }

    #[test]
    fn test_signals_carry_the_snapshot_timestamp() {
        let mut m = metrics();
        m.sopr = Some(1.1);
        m.funding_btc = Some(0.0);

        for s in compute_signals(&m) {
            assert_eq!(s.ts, 1_700_000_000);
        }
    }
}
