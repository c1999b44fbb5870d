//! One-shot REST collectors and derived signals.
//!
//! This crate provides:
//! - Collectors for spot prices, funding / open interest, mempool
//!   congestion, fear & greed, and stablecoin supply
//! - The combined metrics snapshot and threshold signal pass
//! - A runner that executes a full collection round

pub mod altme;
pub mod bybit;
pub mod coingecko;
pub mod defillama;
pub mod mempool;
pub mod runner;
pub mod signals;
pub mod sopr;

pub use runner::collect_all;
pub use signals::compute_signals;
