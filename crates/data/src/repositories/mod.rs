//! Typed repositories over the SQLite pool.

mod liquidation_repo;
mod market_repo;
mod signal_repo;

pub use liquidation_repo::LiquidationRepository;
pub use market_repo::MarketRepository;
pub use signal_repo::SignalRepository;
