//! Candle-swing spot trading engine: classifies recent bars per pair, trades
//! against a locally persisted ledger in paper or live mode.

pub mod config;
pub mod connectors;
pub mod core;
pub mod error;
pub mod storage;
pub mod strategies;
pub mod types;
pub mod utils;
