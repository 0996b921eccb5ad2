// src/storage/mod.rs
//! Persistence collaborators: analysed market data (read-only) and the ledger file.

pub mod balances;
pub mod market;

use crate::error::EngineError;
use crate::types::{BalanceMap, PositionState, SymbolPair, SymbolStats, TradingMode};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use balances::JsonBalanceStore;
pub use market::JsonMarketStore;

/// Persisted form of the ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub balances: BalanceMap,
    #[serde(default)]
    pub positions: BTreeMap<String, PositionState>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Mode of the session that wrote the file. Files without it predate the
    /// field and are treated as paper ledgers.
    #[serde(default)]
    pub mode: Option<TradingMode>,
}

pub trait MarketStore: Send {
    /// Active pairs with their move statistics. `cached` reuses the last read.
    fn load_symbols(&mut self, cached: bool) -> Result<Vec<SymbolStats>, EngineError>;

    /// Pairs dropped from the active list that may still hold a position.
    fn obsolete_symbols(&mut self, cached: bool) -> Result<Vec<SymbolPair>, EngineError>;

    fn fee(&mut self, venue: &str) -> Result<Decimal, EngineError>;
}

pub trait BalanceStore: Send {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<LedgerSnapshot>, EngineError>;

    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), EngineError>;
}
