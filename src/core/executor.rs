// src/core/executor.rs
use crate::connectors::traits::VenueGateway;
use crate::core::ledger::{BalanceUpdate, Ledger};
use crate::types::{BalanceMap, PositionState, SymbolPair, TradeOutcome, TradingMode};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Buys and sells against the ledger. Paper mode simulates the fill with the
/// venue fee; live mode places the order and copies the venue's balances.
pub struct TradeExecutor {
    mode: TradingMode,
    fee: Decimal,
    gateway: Arc<dyn VenueGateway>,
}

impl TradeExecutor {
    pub fn new(mode: TradingMode, fee: Decimal, gateway: Arc<dyn VenueGateway>) -> Self {
        Self { mode, fee, gateway }
    }

    pub fn mode(&self) -> TradingMode {
        self.mode
    }

    pub fn fee(&self) -> Decimal {
        self.fee
    }

    /// Spends `notional` fiat on the pair's coin at `price`.
    ///
    /// The fiat check runs right before the order goes out; the amount is
    /// sized from `price`, so a live fill at a worse price may cost more than
    /// `notional`. The venue balances copied afterwards absorb the difference.
    pub async fn buy(
        &self,
        ledger: &mut Ledger,
        pair: &SymbolPair,
        price: Decimal,
        notional: Decimal,
    ) -> TradeOutcome {
        let (coin, fiat) = (pair.coin(), pair.fiat());

        let fiat_balance = ledger.balance(fiat);
        if fiat_balance < notional {
            let msg = format!(
                "There isn't enough balance to buy {}\nFiat balance: {} | Requested: {}",
                pair, fiat_balance, notional
            );
            error!("{}", msg);
            return TradeOutcome::insufficient(msg);
        }

        let Some(amount) = self.buy_amount(price, notional) else {
            let msg = format!("Cannot size buy of {} at price {}", pair, price);
            error!("{}", msg);
            return TradeOutcome::failed(msg);
        };

        let update = match self.mode {
            TradingMode::Live => match self.gateway.buy(pair, amount).await {
                Ok(balances) => absolute_update(&balances, coin, fiat),
                Err(e) => {
                    let msg = format!("Failed to buy {} ! ({})", pair, e);
                    error!("{}", msg);
                    return TradeOutcome::failed(msg);
                }
            },
            TradingMode::Paper => BalanceUpdate::Relative {
                coin: amount,
                fiat: -notional,
            },
        };

        ledger.apply_fill(coin, fiat, update, PositionState::Open { entry_price: price });
        self.persist(ledger);

        TradeOutcome::ok(format!(
            "{} Bought at {}\nBalance: {:.3}",
            coin,
            price,
            ledger.balance(coin)
        ))
    }

    /// Sells the pair's coin at `price`. `None` closes the whole position,
    /// `Some(notional)` sells `notional / price` coins.
    pub async fn sell(
        &self,
        ledger: &mut Ledger,
        pair: &SymbolPair,
        price: Decimal,
        notional: Option<Decimal>,
    ) -> TradeOutcome {
        let (coin, fiat) = (pair.coin(), pair.fiat());
        let coin_balance = ledger.balance(coin);

        if price <= Decimal::ZERO {
            let msg = format!("Cannot sell {} at price {}", pair, price);
            error!("{}", msg);
            return TradeOutcome::failed(msg);
        }

        let amount = match notional.filter(|n| !n.is_zero()) {
            None => coin_balance,
            Some(notional) => {
                let amount = notional / price;
                if amount > coin_balance {
                    let msg = format!(
                        "There isn't enough balance to sell {}\nCoin balance: {} | Requested: {}",
                        pair, coin_balance, amount
                    );
                    error!("{}", msg);
                    return TradeOutcome::insufficient(msg);
                }
                amount
            }
        };

        let proceeds = match self.mode {
            TradingMode::Paper => match self.sell_proceeds(price, amount) {
                Some(proceeds) => proceeds,
                None => {
                    let msg = format!("Cannot price sell of {} with fee {}", pair, self.fee);
                    error!("{}", msg);
                    return TradeOutcome::failed(msg);
                }
            },
            TradingMode::Live => Decimal::ZERO,
        };

        let update = match self.mode {
            TradingMode::Live => match self.gateway.sell(pair, amount).await {
                Ok(balances) => absolute_update(&balances, coin, fiat),
                Err(e) => {
                    let msg = format!("Failed to sell {} ! ({})", pair, e);
                    error!("{}", msg);
                    return TradeOutcome::failed(msg);
                }
            },
            TradingMode::Paper => BalanceUpdate::Relative {
                coin: -amount,
                fiat: proceeds,
            },
        };

        ledger.apply_fill(coin, fiat, update, PositionState::Flat);
        self.persist(ledger);

        TradeOutcome::ok(format!(
            "{} Sold at {}\nBalance: {:.2}",
            coin,
            price,
            ledger.balance(fiat)
        ))
    }

    /// `notional / price / (1 + fee)`
    fn buy_amount(&self, price: Decimal, notional: Decimal) -> Option<Decimal> {
        if price <= Decimal::ZERO {
            return None;
        }
        notional
            .checked_div(price)?
            .checked_div(Decimal::ONE + self.fee)
    }

    /// `amount * price / (1 + fee)`
    fn sell_proceeds(&self, price: Decimal, amount: Decimal) -> Option<Decimal> {
        amount
            .checked_mul(price)?
            .checked_div(Decimal::ONE + self.fee)
    }

    fn persist(&self, ledger: &Ledger) {
        if let Err(e) = ledger.persist() {
            // The fill already happened; keep running on the in-memory ledger.
            error!("Failed to persist ledger after fill: {}", e);
        }
    }
}

fn absolute_update(balances: &BalanceMap, coin: &str, fiat: &str) -> BalanceUpdate {
    let free = |asset: &str| match balances.get(asset) {
        Some(amount) => *amount,
        None => {
            warn!("Venue reported no balance for {}, assuming 0", asset);
            Decimal::ZERO
        }
    };
    let update = BalanceUpdate::Absolute {
        coin: free(coin),
        fiat: free(fiat),
    };
    info!("Resynced {}/{} from venue balances", coin, fiat);
    update
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::JsonBalanceStore;
    use crate::types::{Bar, TradeStatus};
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::str::FromStr;
    use std::sync::Mutex;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    /// Venue that answers orders from a fixed balance report, or fails.
    #[derive(Default)]
    struct ScriptedVenue {
        fill: Option<BalanceMap>,
        orders: Mutex<Vec<(String, Decimal)>>,
    }

    impl ScriptedVenue {
        fn filling(balances: &[(&str, &str)]) -> Self {
            Self {
                fill: Some(balances.iter().map(|(a, v)| (a.to_string(), d(v))).collect()),
                orders: Mutex::new(Vec::new()),
            }
        }

        fn order_count(&self) -> usize {
            self.orders.lock().unwrap().len()
        }

        fn respond(&self, side: &str, amount: Decimal) -> Result<BalanceMap> {
            self.orders.lock().unwrap().push((side.to_string(), amount));
            self.fill.clone().ok_or_else(|| anyhow!("order rejected"))
        }
    }

    #[async_trait]
    impl VenueGateway for ScriptedVenue {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn connect(&self) -> Result<()> {
            Ok(())
        }

        async fn get_balances(&self) -> Result<BalanceMap> {
            Ok(self.fill.clone().unwrap_or_default())
        }

        async fn get_candles(&self, _: &SymbolPair, _: &str, _: usize) -> Result<Vec<Bar>> {
            Ok(Vec::new())
        }

        async fn buy(&self, _: &SymbolPair, amount: Decimal) -> Result<BalanceMap> {
            self.respond("buy", amount)
        }

        async fn sell(&self, _: &SymbolPair, amount: Decimal) -> Result<BalanceMap> {
            self.respond("sell", amount)
        }
    }

    fn setup(fiat: &str) -> (tempfile::TempDir, Ledger, SymbolPair) {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = Ledger::new(Box::new(JsonBalanceStore::new(
            dir.path().join("balances.json"),
        )));
        ledger.set_balance("USDT", d(fiat));
        (dir, ledger, SymbolPair::from_str("ABC/USDT").unwrap())
    }

    #[tokio::test]
    async fn paper_buy_then_full_sell_applies_fees() {
        let (_dir, mut ledger, pair) = setup("1000");
        let executor = TradeExecutor::new(
            TradingMode::Paper,
            d("0.001"),
            Arc::new(ScriptedVenue::default()),
        );

        let bought = executor.buy(&mut ledger, &pair, d("10"), d("100")).await;
        assert!(bought.is_ok(), "{}", bought.message);
        assert_eq!(ledger.balance("USDT"), d("900"));
        assert_eq!(ledger.balance("ABC").round_dp(9), d("9.990009990"));
        assert_eq!(ledger.position("ABC").entry_price(), Some(d("10")));

        let coins = ledger.balance("ABC");
        let sold = executor.sell(&mut ledger, &pair, d("12"), None).await;
        assert!(sold.is_ok(), "{}", sold.message);
        assert_eq!(ledger.balance("ABC"), Decimal::ZERO);
        assert_eq!(ledger.position("ABC"), PositionState::Flat);

        let proceeds = coins * d("12") / d("1.001");
        assert_eq!(proceeds.round_dp(3), d("119.760"));
        assert_eq!(ledger.balance("USDT"), d("900") + proceeds);
    }

    #[tokio::test]
    async fn zero_fee_round_trip_restores_fiat() {
        let (_dir, mut ledger, pair) = setup("500");
        let executor = TradeExecutor::new(
            TradingMode::Paper,
            Decimal::ZERO,
            Arc::new(ScriptedVenue::default()),
        );

        executor.buy(&mut ledger, &pair, d("8"), d("100")).await;
        executor.sell(&mut ledger, &pair, d("8"), None).await;

        assert_eq!(ledger.balance("USDT"), d("500"));
        assert_eq!(ledger.balance("ABC"), Decimal::ZERO);
    }

    #[tokio::test]
    async fn buy_without_fiat_leaves_ledger_untouched() {
        let (_dir, mut ledger, pair) = setup("99.99");
        let venue = Arc::new(ScriptedVenue::filling(&[("ABC", "1"), ("USDT", "0")]));
        let executor = TradeExecutor::new(TradingMode::Live, d("0.001"), venue.clone());

        let before = ledger.balances().clone();
        let outcome = executor.buy(&mut ledger, &pair, d("10"), d("100")).await;

        assert_eq!(outcome.status, TradeStatus::InsufficientBalance);
        assert_eq!(ledger.balances(), &before);
        assert!(!ledger.has_entry("ABC"));
        assert_eq!(venue.order_count(), 0);
    }

    #[tokio::test]
    async fn partial_sell_beyond_holdings_is_rejected() {
        let (_dir, mut ledger, pair) = setup("0");
        ledger.set_balance("ABC", d("1"));
        let executor = TradeExecutor::new(
            TradingMode::Paper,
            Decimal::ZERO,
            Arc::new(ScriptedVenue::default()),
        );

        let outcome = executor.sell(&mut ledger, &pair, d("10"), Some(d("20"))).await;
        assert_eq!(outcome.status, TradeStatus::InsufficientBalance);
        assert_eq!(ledger.balance("ABC"), d("1"));

        let outcome = executor.sell(&mut ledger, &pair, d("10"), Some(d("5"))).await;
        assert!(outcome.is_ok());
        assert_eq!(ledger.balance("ABC"), d("0.5"));
        assert_eq!(ledger.balance("USDT"), d("5"));
    }

    #[tokio::test]
    async fn live_buy_copies_venue_balances() {
        let (_dir, mut ledger, pair) = setup("1000");
        let venue = Arc::new(ScriptedVenue::filling(&[("ABC", "9.98"), ("USDT", "899.7")]));
        let executor = TradeExecutor::new(TradingMode::Live, d("0.001"), venue.clone());

        let outcome = executor.buy(&mut ledger, &pair, d("10"), d("100")).await;
        assert!(outcome.is_ok());
        assert_eq!(ledger.balance("ABC"), d("9.98"));
        assert_eq!(ledger.balance("USDT"), d("899.7"));
        assert_eq!(ledger.position("ABC").entry_price(), Some(d("10")));

        let orders = venue.orders.lock().unwrap().clone();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].0, "buy");
        assert_eq!(orders[0].1.round_dp(9), d("9.990009990"));
    }

    #[tokio::test]
    async fn live_failure_changes_nothing() {
        let (_dir, mut ledger, pair) = setup("1000");
        ledger.set_balance("ABC", d("2"));
        ledger.set_position(
            "ABC",
            PositionState::Open {
                entry_price: d("10"),
            },
        );
        let executor = TradeExecutor::new(
            TradingMode::Live,
            d("0.001"),
            Arc::new(ScriptedVenue::default()),
        );

        let before = ledger.balances().clone();
        let buy = executor.buy(&mut ledger, &pair, d("10"), d("100")).await;
        let sell = executor.sell(&mut ledger, &pair, d("11"), None).await;

        assert_eq!(buy.status, TradeStatus::ExecutionFailed);
        assert_eq!(sell.status, TradeStatus::ExecutionFailed);
        assert_eq!(ledger.balances(), &before);
        assert!(ledger.has_entry("ABC"));
    }

    #[tokio::test]
    async fn live_sell_resets_entry_from_venue_report() {
        let (_dir, mut ledger, pair) = setup("900");
        ledger.set_balance("ABC", d("9.99"));
        ledger.set_position(
            "ABC",
            PositionState::Open {
                entry_price: d("10"),
            },
        );
        let venue = Arc::new(ScriptedVenue::filling(&[
            ("ABC", "0.00001"),
            ("USDT", "1019.5"),
        ]));
        let executor = TradeExecutor::new(TradingMode::Live, d("0.001"), venue);

        let outcome = executor.sell(&mut ledger, &pair, d("12"), None).await;
        assert!(outcome.is_ok());
        assert_eq!(ledger.balance("ABC"), d("0.00001"));
        assert_eq!(ledger.balance("USDT"), d("1019.5"));
        assert_eq!(ledger.position("ABC"), PositionState::Flat);
    }

    #[tokio::test]
    async fn fills_are_persisted() {
        let (dir, mut ledger, pair) = setup("1000");
        let executor = TradeExecutor::new(
            TradingMode::Paper,
            Decimal::ZERO,
            Arc::new(ScriptedVenue::default()),
        );
        executor.buy(&mut ledger, &pair, d("4"), d("100")).await;

        let mut reloaded = Ledger::new(Box::new(JsonBalanceStore::new(
            dir.path().join("balances.json"),
        )));
        assert!(reloaded.load().unwrap());
        assert_eq!(reloaded.balance("ABC"), d("25"));
        assert!(reloaded.has_entry("ABC"));
    }

    #[tokio::test]
    async fn zero_price_is_an_execution_failure() {
        let (_dir, mut ledger, pair) = setup("1000");
        let executor = TradeExecutor::new(
            TradingMode::Paper,
            Decimal::ZERO,
            Arc::new(ScriptedVenue::default()),
        );

        let outcome = executor.buy(&mut ledger, &pair, Decimal::ZERO, d("100")).await;
        assert_eq!(outcome.status, TradeStatus::ExecutionFailed);
        assert_eq!(ledger.balance("USDT"), d("1000"));
    }

    #[tokio::test]
    async fn degenerate_fee_fails_paper_sell() {
        let (_dir, mut ledger, pair) = setup("0");
        ledger.set_balance("ABC", d("2"));
        let executor = TradeExecutor::new(
            TradingMode::Paper,
            d("-1"),
            Arc::new(ScriptedVenue::default()),
        );

        let outcome = executor.sell(&mut ledger, &pair, d("10"), None).await;
        assert_eq!(outcome.status, TradeStatus::ExecutionFailed);
        assert_eq!(ledger.balance("ABC"), d("2"));
        assert_eq!(ledger.balance("USDT"), Decimal::ZERO);
    }
}
