//! Event normalizer.
//!
//! Turns a raw decoded feed record into zero or one [`LiquidationEvent`].
//! The feed mixes long-form and short-form field names depending on stream
//! version, so every logical field carries an ordered alias list; the first
//! present-and-valid value wins. Records missing a symbol or carrying a
//! non-positive price/quantity are expected feed noise and dropped silently.

use crypto_pipeline_data::LiquidationEvent;
use serde_json::Value;

const SYMBOL_ALIASES: &[&str] = &["symbol", "s"];
const SIDE_ALIASES: &[&str] = &["side", "S"];
const PRICE_ALIASES: &[&str] = &["price", "p"];
const QTY_ALIASES: &[&str] = &["qty", "q"];
const TS_ALIASES: &[&str] = &["ts", "T"];

/// Normalizes one raw record. Pure function of its input; `ingest_ms` is
/// substituted when the payload carries no usable timestamp.
#[must_use]
pub fn normalize(record: &Value, ingest_ms: i64) -> Option<LiquidationEvent> {
    let symbol = string_field(record, SYMBOL_ALIASES)?.to_uppercase();

    let price = numeric_field(record, PRICE_ALIASES).unwrap_or(0.0);
    let qty = numeric_field(record, QTY_ALIASES).unwrap_or(0.0);
    if !price.is_finite() || !qty.is_finite() || price <= 0.0 || qty <= 0.0 {
        return None;
    }

    let side = string_field(record, SIDE_ALIASES)
        .map(|s| s.to_uppercase())
        .unwrap_or_else(|| "UNKNOWN".to_string());

    let ts = integer_field(record, TS_ALIASES).unwrap_or(ingest_ms);

    Some(LiquidationEvent {
        symbol,
        side,
        price,
        qty,
        ts,
        raw: record.to_string(),
    })
}

fn string_field(record: &Value, aliases: &[&str]) -> Option<String> {
    for key in aliases {
        if let Some(Value::String(s)) = record.get(*key) {
            if !s.is_empty() {
                return Some(s.clone());
            }
        }
    }
    None
}

fn numeric_field(record: &Value, aliases: &[&str]) -> Option<f64> {
    for key in aliases {
        let parsed = match record.get(*key) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.parse::<f64>().ok(),
            _ => None,
        };
        if parsed.is_some() {
            return parsed;
        }
    }
    None
}

fn integer_field(record: &Value, aliases: &[&str]) -> Option<i64> {
    for key in aliases {
        let parsed = match record.get(*key) {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.parse::<i64>().ok(),
            _ => None,
        };
        if parsed.is_some() {
            return parsed;
        }
    }
    None
}
