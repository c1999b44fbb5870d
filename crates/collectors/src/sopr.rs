//! SOPR (spent output profit ratio) collector (bitcoin-data.com).
//!
//! The source publishes the full series as CSV and allows 4 requests per
//! hour, so fetches are rate-limited through the `sopr_last_fetch` meta
//! key and only the newest row of each download is kept.

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::Client;

const API_URL: &str = "https://bitcoin-data.com/v1/sopr/csv";

/// Minimum seconds between fetches (4 req/hour).
pub const MIN_FETCH_INTERVAL_SECS: i64 = 900;

/// Column header aliases seen across published revisions of the file.
const VALUE_COLUMNS: &[&str] = &["sopr", "SOPR", "value"];
const TS_COLUMNS: &[&str] = &["unixTs", "unix"];

pub struct SoprCollector {
    client: Client,
}

impl SoprCollector {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Downloads the series and returns the newest `(ts, value)` sample,
    /// or `None` when no row parses.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn fetch(&self) -> Result<Option<(i64, f64)>> {
        let text = self
            .client
            .get(API_URL)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
            .context("SOPR endpoint returned an unreadable body")?;

        Ok(parse_latest(&text, Utc::now().timestamp()))
    }
}

/// Returns whether enough time has passed since the last recorded fetch.
/// An unparseable record does not block the fetch.
#[must_use]
pub fn fetch_due(last_fetch: Option<&str>, now: i64) -> bool {
    match last_fetch.and_then(|v| v.parse::<i64>().ok()) {
        Some(last) => now - last >= MIN_FETCH_INTERVAL_SECS,
        None => true,
    }
}

/// Scans the CSV and keeps the last row with a parseable value. Rows
/// without a usable timestamp fall back to `fallback_ts`.
fn parse_latest(text: &str, fallback_ts: i64) -> Option<(i64, f64)> {
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let headers = reader.headers().ok()?.clone();

    let value_idx = find_column(&headers, VALUE_COLUMNS)?;
    let ts_idx = find_column(&headers, TS_COLUMNS);

    let mut latest = None;
    for record in reader.records().flatten() {
        let Some(value) = record
            .get(value_idx)
            .and_then(|v| v.trim().parse::<f64>().ok())
        else {
            continue;
        };
        let ts = ts_idx
            .and_then(|i| record.get(i))
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(fallback_ts);
        latest = Some((ts, value));
    }

    latest
}

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers.iter().position(|h| names.contains(&h.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FALLBACK_TS: i64 = 1_700_000_000;

    #[test]
    fn test_parse_takes_the_last_valid_row() {
        let csv = "d,unixTs,sopr\n\
                   2023-11-12,1699747200,1.0123\n\
                   2023-11-13,1699833600,0.9987\n\
                   2023-11-14,1699920000,1.0045\n";

        let (ts, value) = parse_latest(csv, FALLBACK_TS).unwrap();

        assert_eq!(ts, 1_699_920_000);
        assert!((value - 1.0045).abs() < 1e-9);
    }

    #[test]
    fn test_unparseable_rows_are_skipped() {
        let csv = "d,unixTs,sopr\n\
                   2023-11-13,1699833600,1.0011\n\
                   2023-11-14,1699920000,n/a\n";

        let (ts, value) = parse_latest(csv, FALLBACK_TS).unwrap();

        assert_eq!(ts, 1_699_833_600);
        assert!((value - 1.0011).abs() < 1e-9);
    }

    #[test]
    fn test_alternate_column_names() {
        let csv = "date,unix,value\n2023-11-14,1699920000,1.02\n";

        let (ts, value) = parse_latest(csv, FALLBACK_TS).unwrap();

        assert_eq!(ts, 1_699_920_000);
        assert!((value - 1.02).abs() < 1e-9);
    }

    #[test]
    fn test_missing_timestamp_column_uses_fallback() {
        let csv = "d,sopr\n2023-11-14,1.05\n";

        let (ts, value) = parse_latest(csv, FALLBACK_TS).unwrap();

        assert_eq!(ts, FALLBACK_TS);
        assert!((value - 1.05).abs() < 1e-9);
    }

    #[test]
    fn test_no_valid_rows_yields_none() {
        assert!(parse_latest("d,unixTs,sopr\n", FALLBACK_TS).is_none());
        assert!(parse_latest("unrelated,columns\n1,2\n", FALLBACK_TS).is_none());
        assert!(parse_latest("", FALLBACK_TS).is_none());
    }

    // =========================================================================
    // Rate limiting
    // =========================================================================

    #[test]
    fn test_first_fetch_is_due() {
        assert!(fetch_due(None, 1_700_000_000));
    }

    #[test]
    fn test_recent_fetch_blocks() {
        let now = 1_700_000_000;
        assert!(!fetch_due(Some("1699999500"), now)); // 500s ago
        assert!(fetch_due(Some("1699999100"), now)); // 900s ago
    }

    #[test]
    fn test_garbage_record_does_not_block() {
        assert!(fetch_due(Some("not-a-number"), 1_700_000_000));
    }
}
