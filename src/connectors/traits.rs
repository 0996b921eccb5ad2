use crate::types::{BalanceMap, Bar, Notification, SymbolPair};
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Spot venue used for market data and, in live mode, for orders.
#[async_trait]
pub trait VenueGateway: Send + Sync {
    fn name(&self) -> &str;

    async fn connect(&self) -> Result<()>;

    /// Free balance of every asset on the account.
    async fn get_balances(&self) -> Result<BalanceMap>;

    /// Closed and in-progress bars, oldest first.
    async fn get_candles(
        &self,
        pair: &SymbolPair,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Bar>>;

    /// Market buy of `amount` coins. Returns free balances after the fill.
    async fn buy(&self, pair: &SymbolPair, amount: Decimal) -> Result<BalanceMap>;

    /// Market sell of `amount` coins. Returns free balances after the fill.
    async fn sell(&self, pair: &SymbolPair, amount: Decimal) -> Result<BalanceMap>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<()>;
}
