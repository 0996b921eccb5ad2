// src/core/ledger.rs
//! Locally authoritative balances and per-coin positions.

use crate::error::EngineError;
use crate::storage::{BalanceStore, LedgerSnapshot};
use crate::types::{BalanceMap, PositionState, TradingMode};
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// How a fill changes the two balances of a pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BalanceUpdate {
    /// Venue-reported free balances after the fill.
    Absolute { coin: Decimal, fiat: Decimal },
    /// Locally simulated deltas.
    Relative { coin: Decimal, fiat: Decimal },
}

/// Balances and positions. Sufficiency is the caller's job: the ledger
/// accepts any value, including negative results of `add_balance`.
pub struct Ledger {
    balances: BalanceMap,
    positions: BTreeMap<String, PositionState>,
    mode: TradingMode,
    saved_mode: Option<TradingMode>,
    store: Box<dyn BalanceStore>,
}

impl Ledger {
    pub fn new(store: Box<dyn BalanceStore>) -> Self {
        Self {
            balances: BalanceMap::new(),
            positions: BTreeMap::new(),
            mode: TradingMode::Paper,
            saved_mode: None,
            store,
        }
    }

    /// Mode stamped on every snapshot this ledger writes.
    pub fn set_mode(&mut self, mode: TradingMode) {
        self.mode = mode;
    }

    /// Mode recorded in the last loaded file, if any.
    pub fn saved_mode(&self) -> Option<TradingMode> {
        self.saved_mode
    }

    pub fn balance(&self, asset: &str) -> Decimal {
        self.balances.get(asset).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn set_balance(&mut self, asset: &str, amount: Decimal) {
        self.balances.insert(asset.to_string(), amount);
    }

    pub fn add_balance(&mut self, asset: &str, delta: Decimal) {
        *self.balances.entry(asset.to_string()).or_insert(Decimal::ZERO) += delta;
    }

    pub fn balances(&self) -> &BalanceMap {
        &self.balances
    }

    pub fn position(&self, coin: &str) -> PositionState {
        self.positions.get(coin).copied().unwrap_or_default()
    }

    pub fn set_position(&mut self, coin: &str, position: PositionState) {
        self.positions.insert(coin.to_string(), position);
    }

    pub fn has_entry(&self, coin: &str) -> bool {
        self.position(coin).is_open()
    }

    pub fn clear_positions(&mut self) {
        self.positions.clear();
    }

    /// Writes both balances and the coin's position together, the only way a
    /// fill touches the ledger.
    pub fn apply_fill(
        &mut self,
        coin: &str,
        fiat: &str,
        update: BalanceUpdate,
        position: PositionState,
    ) {
        match update {
            BalanceUpdate::Absolute { coin: c, fiat: f } => {
                self.set_balance(coin, c);
                self.set_balance(fiat, f);
            }
            BalanceUpdate::Relative { coin: c, fiat: f } => {
                self.add_balance(coin, c);
                self.add_balance(fiat, f);
            }
        }
        self.set_position(coin, position);

        match position {
            PositionState::Open { entry_price } => {
                info!(" ** New Entry: {} at {}", coin, entry_price)
            }
            PositionState::Flat => info!(" ** New Exit: {}", coin),
        }
        info!(
            " ** Balance updated: {}: {} | {}: {}",
            coin,
            self.balance(coin),
            fiat,
            self.balance(fiat)
        );
    }

    /// Zeroes every listed asset and closes every position.
    pub fn reset(&mut self, assets: &[String]) {
        self.balances.clear();
        self.positions.clear();
        for asset in assets {
            self.balances.insert(asset.clone(), Decimal::ZERO);
        }
    }

    /// Loads the saved ledger, returning false when nothing was saved.
    pub fn load(&mut self) -> Result<bool, EngineError> {
        match self.store.load()? {
            Some(snapshot) => {
                self.balances = snapshot.balances;
                self.positions = snapshot.positions;
                self.saved_mode = snapshot.mode;
                debug!("Loaded {} cached balances", self.balances.len());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn persist(&self) -> Result<(), EngineError> {
        self.store.save(&self.snapshot())
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            balances: self.balances.clone(),
            positions: self.positions.clone(),
            updated_at: Some(Utc::now()),
            mode: Some(self.mode),
        }
    }

    /// `BTC: 0.1 | USDT: 900` over non-zero balances.
    pub fn summary(&self) -> String {
        let parts: Vec<String> = self
            .balances
            .iter()
            .filter(|(_, amount)| !amount.is_zero())
            .map(|(asset, amount)| format!("{}: {}", asset, amount.normalize()))
            .collect();
        if parts.is_empty() {
            "empty".to_string()
        } else {
            parts.join(" | ")
        }
    }
}
