//! Real-time Bybit liquidation ingestion.
//!
//! This crate provides:
//! - WebSocket stream client with reconnect and exponential backoff
//! - Alias-aware event normalizer
//! - Batching writer over the SQLite and parquet sinks
//! - Service supervisor with graceful shutdown

pub mod backoff;
pub mod normalizer;
pub mod service;
pub mod websocket;
pub mod writer;

pub use backoff::Backoff;
pub use websocket::{classify_frame, BybitStreamClient, ConnectionState, FrameRoute};
pub use writer::LiquidationWriter;
