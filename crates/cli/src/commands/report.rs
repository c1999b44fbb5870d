//! Plain-text market report.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;

use crypto_pipeline_core::AppConfig;
use crypto_pipeline_data::{
    Database, HourlyLiquidationRow, LiquidationRepository, LiquidationSide, MarketRepository,
    MetricsRow, PriceRow, SignalRepository, SignalRow,
};

const HOURLY_ROWS: i64 = 10;

pub async fn run(config: &AppConfig) -> Result<()> {
    let db = Database::connect(&config.database.path).await?;
    db.ensure_schema().await?;

    let market = MarketRepository::new(db.pool());
    let liquidations = LiquidationRepository::new(db.pool());
    let signals = SignalRepository::new(db.pool());

    let price_limit = config.collectors.coins.len() as i64;
    let report = render_report(
        &market.recent_prices(price_limit.max(1)).await?,
        market.latest_metrics().await?.as_ref(),
        &liquidations.recent_hourly(HOURLY_ROWS).await?,
        &signals.latest().await?,
    );
    println!("{report}");

    db.close().await;
    Ok(())
}

fn render_report(
    prices: &[PriceRow],
    metrics: Option<&MetricsRow>,
    hourly: &[HourlyLiquidationRow],
    signals: &[SignalRow],
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Crypto Market Report ===");

    let _ = writeln!(out, "\nSpot prices:");
    if prices.is_empty() {
        let _ = writeln!(out, "  (no data)");
    }
    for price in prices {
        let _ = writeln!(out, "  {:<12} {:>14.2} USD", price.symbol, price.price_usd);
    }

    let _ = writeln!(out, "\nMetrics:");
    match metrics {
        Some(m) => {
            let _ = writeln!(out, "  snapshot ts      {}", format_ts(m.ts));
            let _ = writeln!(out, "  funding BTC      {}", format_rate(m.funding_btc));
            let _ = writeln!(out, "  funding ETH      {}", format_rate(m.funding_eth));
            let _ = writeln!(out, "  OI BTC           {}", format_amount(m.oi_btc));
            let _ = writeln!(out, "  OI ETH           {}", format_amount(m.oi_eth));
            let _ = writeln!(
                out,
                "  mempool txs      {}",
                m.mempool_tx_count
                    .map_or_else(|| "-".to_string(), |v| v.to_string())
            );
            let _ = writeln!(
                out,
                "  fear & greed     {}",
                m.fng.map_or_else(|| "-".to_string(), |v| v.to_string())
            );
            let _ = writeln!(out, "  stablecoins      {}", format_amount(m.stablecoins));
        }
        None => {
            let _ = writeln!(out, "  (no snapshot yet; run `collect` first)");
        }
    }

    let _ = writeln!(out, "\nTop hourly liquidations:");
    if hourly.is_empty() {
        let _ = writeln!(out, "  (no data)");
    }
    for row in hourly {
        // SELL orders liquidate longs, BUY orders liquidate shorts
        let direction = LiquidationSide::from_exchange_side(&row.side).as_str();
        let _ = writeln!(
            out,
            "  {}  {:<10} {:<7} {:<7} {:>14.2} USD  ({} events)",
            format_ts(row.hour_start),
            row.symbol,
            row.side,
            direction,
            row.total_qty_usd,
            row.events_count
        );
    }

    let _ = writeln!(out, "\nSignals:");
    if signals.is_empty() {
        let _ = writeln!(out, "  (no data)");
    }
    for signal in signals {
        let _ = writeln!(
            out,
            "  {:<14} {:>12}  [{}]",
            signal.name,
            signal
                .value
                .map_or_else(|| "-".to_string(), |v| format!("{v:.4}")),
            signal.classification.as_deref().unwrap_or("-")
        );
    }

    out
}

fn format_ts(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map_or_else(|| ts.to_string(), |dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
}

fn format_rate(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.6}"))
}

fn format_amount(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.1}"))
}
