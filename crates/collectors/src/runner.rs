//! One-shot collection run.
//!
//! Each source is independent: a failing endpoint is logged and skipped so
//! the remaining sources, the metrics snapshot, and the signal pass still
//! run. The run as a whole only fails on local errors (database, client
//! construction).

use anyhow::Result;
use chrono::Utc;
use std::time::Duration;

use crypto_pipeline_core::AppConfig;
use crypto_pipeline_data::{Database, MarketRepository, SignalRepository};

use crate::altme::FearGreedCollector;
use crate::bybit::BybitRestCollector;
use crate::coingecko::CoinGeckoCollector;
use crate::defillama::StablecoinCollector;
use crate::mempool::MempoolCollector;
use crate::signals::compute_signals;
use crate::sopr::{self, SoprCollector};

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Runs every collector once, snapshots the combined metrics row, and
/// refreshes the derived signals.
///
/// # Errors
/// Returns an error if the HTTP client cannot be built or a database
/// write fails.
pub async fn collect_all(db: &Database, config: &AppConfig) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent("crypto-pipeline/0.1")
        .build()?;

    let market = MarketRepository::new(db.pool());
    let ts = Utc::now().timestamp();

    collect_prices(&client, &market, config, ts).await?;
    collect_funding(&client, &market, config, ts).await?;
    collect_sopr(&client, db, &market, ts).await?;
    collect_mempool(&client, &market, ts).await?;
    collect_fear_greed(&client, &market, ts).await?;
    collect_stablecoins(&client, &market, ts).await?;

    market.snapshot_metrics(ts).await?;
    tracing::info!("Metrics snapshot stored at ts {}", ts);

    if let Some(metrics) = market.latest_metrics().await? {
        let signals = compute_signals(&metrics);
        SignalRepository::new(db.pool()).store(&signals).await?;
        tracing::info!("Stored {} signals", signals.len());
    }

    Ok(())
}

async fn collect_prices(
    client: &reqwest::Client,
    market: &MarketRepository,
    config: &AppConfig,
    ts: i64,
) -> Result<()> {
    match CoinGeckoCollector::new(client.clone())
        .fetch(&config.collectors.coins)
        .await
    {
        Ok(prices) => {
            market.insert_prices(ts, &prices).await?;
            tracing::info!("Collected {} spot prices", prices.len());
        }
        Err(e) => tracing::error!("CoinGecko collection failed: {:#}", e),
    }
    Ok(())
}

async fn collect_funding(
    client: &reqwest::Client,
    market: &MarketRepository,
    config: &AppConfig,
    ts: i64,
) -> Result<()> {
    let collector = BybitRestCollector::new(client.clone());

    for symbol in &config.collectors.funding_symbols {
        let funding = match collector.fetch_funding(symbol).await {
            Ok(f) => f,
            Err(e) => {
                tracing::error!("Funding collection failed for {}: {:#}", symbol, e);
                None
            }
        };
        let open_interest = match collector.fetch_open_interest(symbol).await {
            Ok(oi) => oi,
            Err(e) => {
                tracing::error!("Open interest collection failed for {}: {:#}", symbol, e);
                None
            }
        };

        if funding.is_some() || open_interest.is_some() {
            market.insert_funding(ts, symbol, funding, open_interest).await?;
            tracing::info!(
                "Collected funding={:?} oi={:?} for {}",
                funding,
                open_interest,
                symbol
            );
        }
    }
    Ok(())
}

async fn collect_sopr(
    client: &reqwest::Client,
    db: &Database,
    market: &MarketRepository,
    now: i64,
) -> Result<()> {
    let last_fetch = db.get_meta("sopr_last_fetch").await?;
    if !sopr::fetch_due(last_fetch.as_deref(), now) {
        tracing::warn!("Skipping SOPR fetch to respect the source rate limit");
        return Ok(());
    }

    match SoprCollector::new(client.clone()).fetch().await {
        Ok(Some((ts, value))) => {
            market.insert_sopr(ts, value).await?;
            db.set_meta("sopr_last_fetch", &now.to_string()).await?;
            tracing::info!("Collected SOPR: {:.4}", value);
        }
        Ok(None) => tracing::warn!("SOPR download contained no valid rows"),
        Err(e) => tracing::error!("SOPR collection failed: {:#}", e),
    }
    Ok(())
}

async fn collect_mempool(
    client: &reqwest::Client,
    market: &MarketRepository,
    ts: i64,
) -> Result<()> {
    match MempoolCollector::new(client.clone()).fetch().await {
        Ok(sample) => {
            market
                .insert_mempool(ts, sample.tx_count, sample.fee_fastest, sample.fee_30m)
                .await?;
            tracing::info!("Collected mempool sample: {} pending txs", sample.tx_count);
        }
        Err(e) => tracing::error!("Mempool collection failed: {:#}", e),
    }
    Ok(())
}

async fn collect_fear_greed(
    client: &reqwest::Client,
    market: &MarketRepository,
    ts: i64,
) -> Result<()> {
    match FearGreedCollector::new(client.clone()).fetch().await {
        Ok(fng) => {
            market.insert_fear_greed(ts, fng).await?;
            tracing::info!("Collected fear & greed index: {}", fng);
        }
        Err(e) => tracing::error!("Fear & greed collection failed: {:#}", e),
    }
    Ok(())
}

async fn collect_stablecoins(
    client: &reqwest::Client,
    market: &MarketRepository,
    ts: i64,
) -> Result<()> {
    match StablecoinCollector::new(client.clone()).fetch().await {
        Ok(sample) => {
            market
                .insert_stablecoins(ts, sample.total, sample.usdt, sample.usdc)
                .await?;
            tracing::info!("Collected stablecoin supply: {:.0}", sample.total);
        }
        Err(e) => tracing::error!("Stablecoin collection failed: {:#}", e),
    }
    Ok(())
}
