// src/connectors/messages.rs
use crate::types::Bar;
use rust_decimal::Decimal;
use serde::Deserialize;

/// One row of `GET /api/v3/klines`. Binance sends klines as positional arrays:
/// `[openTime, open, high, low, close, volume, closeTime, quoteVolume, trades,
///   takerBuyBase, takerBuyQuote, ignore]`.
#[derive(Debug, Deserialize)]
pub struct BinanceKline(
    pub i64,
    pub Decimal,
    pub Decimal,
    pub Decimal,
    pub Decimal,
    pub Decimal,
    pub i64,
    pub Decimal,
    pub u64,
    pub Decimal,
    pub Decimal,
    pub serde_json::Value,
);

impl BinanceKline {
    pub fn open_time(&self) -> i64 {
        self.0
    }
}

impl From<BinanceKline> for Bar {
    fn from(k: BinanceKline) -> Self {
        Bar::new(k.1, k.4, k.5)
    }
}

#[derive(Debug, Deserialize)]
pub struct AccountBalance {
    pub asset: String,
    pub free: Decimal,
}

/// `GET /api/v3/account`
#[derive(Debug, Deserialize)]
pub struct AccountInfo {
    pub balances: Vec<AccountBalance>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "filterType")]
pub enum SymbolFilter {
    #[serde(rename = "LOT_SIZE")]
    LotSize {
        #[serde(rename = "stepSize")]
        step_size: Decimal,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,
    pub filters: Vec<SymbolFilter>,
}

/// `GET /api/v3/exchangeInfo?symbol=...`
#[derive(Debug, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

impl ExchangeInfo {
    pub fn step_size(&self, symbol: &str) -> Option<Decimal> {
        self.symbols
            .iter()
            .find(|s| s.symbol == symbol)?
            .filters
            .iter()
            .find_map(|f| match f {
                SymbolFilter::LotSize { step_size } => Some(*step_size),
                SymbolFilter::Other => None,
            })
    }
}

/// `POST /api/v3/order` acknowledgement (RESULT response type).
#[derive(Debug, Deserialize)]
pub struct OrderAck {
    #[serde(rename = "orderId")]
    pub order_id: u64,
    pub symbol: String,
    pub status: String,
    #[serde(rename = "executedQty")]
    pub executed_qty: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn kline_row_maps_to_bar() {
        let raw = r#"[[1499040000000,"0.01634790","0.80000000","0.01575800","0.01577100",
            "148976.11427815",1499644799999,"2434.19055334",308,"1756.87402397",
            "28.46694368","0"]]"#;
        let rows: Vec<BinanceKline> = serde_json::from_str(raw).unwrap();
        assert_eq!(rows[0].open_time(), 1499040000000);

        let bar: Bar = rows.into_iter().next().unwrap().into();
        assert_eq!(bar.open, Decimal::from_str("0.01634790").unwrap());
        assert_eq!(bar.close, Decimal::from_str("0.01577100").unwrap());
        assert_eq!(bar.volume, Decimal::from_str("148976.11427815").unwrap());
    }

    #[test]
    fn finds_lot_size_step() {
        let raw = r#"{"symbols":[{"symbol":"ETHBTC","filters":[
            {"filterType":"PRICE_FILTER","minPrice":"0.00000100","maxPrice":"100000.00000000","tickSize":"0.00000100"},
            {"filterType":"LOT_SIZE","minQty":"0.00100000","maxQty":"100000.00000000","stepSize":"0.00100000"}
        ]}]}"#;
        let info: ExchangeInfo = serde_json::from_str(raw).unwrap();
        assert_eq!(info.step_size("ETHBTC"), Some(Decimal::from_str("0.001").unwrap()));
        assert_eq!(info.step_size("BTCUSDT"), None);
    }

    #[test]
    fn parses_account_and_order_ack() {
        let account: AccountInfo = serde_json::from_str(
            r#"{"makerCommission":15,"balances":[{"asset":"BTC","free":"4723846.89208129","locked":"0.00000000"}]}"#,
        )
        .unwrap();
        assert_eq!(account.balances[0].asset, "BTC");

        let ack: OrderAck = serde_json::from_str(
            r#"{"symbol":"BTCUSDT","orderId":28,"clientOrderId":"x","transactTime":1507725176595,
                "price":"0.00000000","origQty":"10.00000000","executedQty":"10.00000000",
                "status":"FILLED","type":"MARKET","side":"SELL"}"#,
        )
        .unwrap();
        assert_eq!(ack.order_id, 28);
        assert_eq!(ack.executed_qty, Decimal::from(10));
    }
}
