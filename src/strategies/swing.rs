// src/strategies/swing.rs
use crate::config::StrategyConfig;
use crate::strategies::signals::{relative_change, Direction};
use crate::strategies::traits::{Signal, Strategy, SymbolContext, TradeReason};
use rust_decimal::Decimal;
use tracing::warn;

/// Buys a down run that already exceeds the pair's typical drop and sells on
/// a typical rise (take profit) or an outsized drop (stop loss).
pub struct SwingStrategy {
    entry_factor: Decimal,
    take_profit_factor: Decimal,
    stop_loss_multiplier: Decimal,
    obsolete_fee_multiple: Decimal,
    require_volume_confirmation: bool,
}

impl SwingStrategy {
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            entry_factor: config.entry_factor,
            take_profit_factor: config.take_profit_factor,
            stop_loss_multiplier: config.stop_loss_multiplier,
            obsolete_fee_multiple: config.obsolete_fee_multiple,
            require_volume_confirmation: config.require_volume_confirmation,
        }
    }

    fn evaluate_entry(&self, ctx: &SymbolContext<'_>) -> Signal {
        let Some(stats) = ctx.stats else {
            // obsolete pairs are never re-entered
            return Signal::Hold;
        };
        if ctx.candle.direction != Direction::Down {
            return Signal::Hold;
        }
        if self.require_volume_confirmation && !ctx.volume_valid {
            return Signal::Hold;
        }

        let change = match ctx.candle.change() {
            Ok(change) => change,
            Err(e) => {
                warn!("{}: cannot measure run: {}", ctx.pair, e);
                return Signal::Hold;
            }
        };

        if change < stats.avg_down * self.entry_factor {
            Signal::Advice(TradeReason::Entry, ctx.candle.last_close)
        } else {
            Signal::Hold
        }
    }

    fn evaluate_exit(&self, ctx: &SymbolContext<'_>, entry_price: Decimal) -> Signal {
        let price = ctx.candle.last_close;
        let entry_change = match relative_change(price, entry_price) {
            Ok(change) => change,
            Err(e) => {
                warn!("{}: cannot measure position: {}", ctx.pair, e);
                return Signal::Hold;
            }
        };

        match (ctx.stats, ctx.candle.direction) {
            (Some(stats), Direction::Up)
                if entry_change > stats.avg_up * self.take_profit_factor =>
            {
                Signal::Advice(TradeReason::TakeProfit, price)
            }
            (Some(stats), Direction::Down)
                if entry_change < stats.avg_down * self.stop_loss_multiplier =>
            {
                Signal::Advice(TradeReason::StopLoss, price)
            }
            (None, Direction::Up) if entry_change > ctx.fee * self.obsolete_fee_multiple => {
                Signal::Advice(TradeReason::ObsoleteExit, price)
            }
            _ => Signal::Hold,
        }
    }
}

impl Strategy for SwingStrategy {
    fn name(&self) -> String {
        "swing".to_string()
    }

    fn evaluate(&self, ctx: &SymbolContext<'_>) -> Signal {
        match ctx.position.entry_price() {
            Some(entry_price) => self.evaluate_exit(ctx, entry_price),
            None => self.evaluate_entry(ctx),
        }
    }
}
