// src/strategies/traits.rs
use crate::strategies::signals::CandleStatus;
use crate::types::{PositionState, Side, SymbolPair, SymbolStats};
use rust_decimal::Decimal;

/// Why the strategy wants to trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeReason {
    Entry,
    TakeProfit,
    StopLoss,
    ObsoleteExit,
}

impl TradeReason {
    pub fn side(&self) -> Side {
        match self {
            TradeReason::Entry => Side::Buy,
            _ => Side::Sell,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// Trade at the given price.
    Advice(TradeReason, Decimal),
    Hold,
}

/// Everything known about one pair at decision time.
#[derive(Debug, Clone)]
pub struct SymbolContext<'a> {
    pub pair: &'a SymbolPair,
    /// `None` for obsolete pairs, which only get exit treatment.
    pub stats: Option<&'a SymbolStats>,
    pub candle: CandleStatus,
    pub volume_valid: bool,
    pub position: PositionState,
    pub fee: Decimal,
}

pub trait Strategy: Send + Sync {
    fn name(&self) -> String;

    fn evaluate(&self, ctx: &SymbolContext<'_>) -> Signal;
}
