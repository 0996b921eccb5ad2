// src/types.rs
use crate::error::EngineError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Free balance per asset symbol.
pub type BalanceMap = BTreeMap<String, Decimal>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingMode {
    Paper,
    Live,
}

impl TradingMode {
    pub fn from_live_flag(live: bool) -> Self {
        if live {
            TradingMode::Live
        } else {
            TradingMode::Paper
        }
    }
}

/// One aggregated candle. Series are ordered oldest to newest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub open: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Bar {
    pub fn new(open: Decimal, close: Decimal, volume: Decimal) -> Self {
        Self {
            open,
            close,
            volume,
        }
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// A `COIN/FIAT` market, e.g. `BTC/USDT`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolPair {
    coin: String,
    fiat: String,
}

impl SymbolPair {
    pub fn coin(&self) -> &str {
        &self.coin
    }

    pub fn fiat(&self) -> &str {
        &self.fiat
    }

    /// Venue ticker without separator (`BTCUSDT`).
    pub fn venue_symbol(&self) -> String {
        format!("{}{}", self.coin, self.fiat)
    }
}

impl FromStr for SymbolPair {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('/') {
            Some((coin, fiat))
                if !coin.is_empty() && !fiat.is_empty() && !fiat.contains('/') =>
            {
                Ok(Self {
                    coin: coin.to_uppercase(),
                    fiat: fiat.to_uppercase(),
                })
            }
            _ => Err(EngineError::InvalidPair(s.to_string())),
        }
    }
}

impl fmt::Display for SymbolPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.coin, self.fiat)
    }
}

impl Serialize for SymbolPair {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SymbolPair {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Historical move magnitudes of a tracked pair, computed offline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolStats {
    pub symbol: SymbolPair,
    pub avg_up: Decimal,
    pub avg_down: Decimal,
}

/// Position held in a coin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PositionState {
    #[default]
    Flat,
    Open { entry_price: Decimal },
}

impl PositionState {
    pub fn entry_price(&self) -> Option<Decimal> {
        match self {
            PositionState::Flat => None,
            PositionState::Open { entry_price } => Some(*entry_price),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, PositionState::Open { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeStatus {
    Ok,
    InsufficientBalance,
    ExecutionFailed,
}

/// Result of a buy/sell attempt. Expected failures are reported here, not raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeOutcome {
    pub status: TradeStatus,
    pub message: String,
}

impl TradeOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: TradeStatus::Ok,
            message: message.into(),
        }
    }

    pub fn insufficient(message: impl Into<String>) -> Self {
        Self {
            status: TradeStatus::InsufficientBalance,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: TradeStatus::ExecutionFailed,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == TradeStatus::Ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    Info,
    Entry,
    TakeProfit,
    StopLoss,
    ObsoleteExit,
    Failure,
}

impl NotifyKind {
    pub fn icon(&self) -> &'static str {
        match self {
            NotifyKind::Info => ":thought_balloon:",
            NotifyKind::Entry => ":blue_circle:",
            NotifyKind::TakeProfit => ":green_circle:",
            NotifyKind::StopLoss => ":red_circle:",
            NotifyKind::ObsoleteExit => ":yellow_circle:",
            NotifyKind::Failure => ":warning:",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotifyKind,
    pub message: String,
}

impl Notification {
    pub fn new(kind: NotifyKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotifyKind::Info, message)
    }
}
