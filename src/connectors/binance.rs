// src/connectors/binance.rs
use crate::connectors::messages::{AccountInfo, BinanceKline, ExchangeInfo, OrderAck};
use crate::connectors::traits::VenueGateway;
use crate::types::{BalanceMap, Bar, Side, SymbolPair};
use crate::utils::precision::normalize_quantity;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method};
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

pub struct BinanceClient {
    api_key: String,
    secret_key: String,
    http_client: Client,
    base_rest_url: String,
    step_sizes: Mutex<HashMap<String, Decimal>>,
}

impl BinanceClient {
    pub fn new(api_key: String, secret_key: String, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            api_key,
            secret_key,
            http_client,
            base_rest_url: "https://api.binance.com".to_string(),
            step_sizes: Mutex::new(HashMap::new()),
        })
    }

    fn sign_and_build_query(&self, params: Vec<(&str, String)>) -> Result<String> {
        let mut params = params;
        let timestamp = Utc::now().timestamp_millis().to_string();
        params.push(("timestamp", timestamp));

        let query_string = serde_urlencoded::to_string(&params)?;

        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .context("Invalid secret key length")?;
        mac.update(query_string.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(format!("{}&signature={}", query_string, signature))
    }

    async fn send_signed_request<T: for<'de> Deserialize<'de>>(
        &self,
        method: Method,
        endpoint: &str,
        params: Vec<(&str, String)>,
    ) -> Result<T> {
        let full_query = self.sign_and_build_query(params)?;
        let url = format!("{}{}?{}", self.base_rest_url, endpoint, full_query);

        let response = self
            .http_client
            .request(method, &url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn send_public_request<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_rest_url, endpoint);
        let response = self.http_client.get(&url).query(params).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Binance responded {}: {}", status, body);
        }
        Ok(response.json::<T>().await?)
    }

    /// LOT_SIZE step for the symbol, fetched once and cached.
    async fn step_size(&self, symbol: &str) -> Result<Decimal> {
        let cached = self
            .step_sizes
            .lock()
            .map_err(|_| anyhow!("step size cache poisoned"))?
            .get(symbol)
            .copied();
        if let Some(step) = cached {
            return Ok(step);
        }

        let info: ExchangeInfo = self
            .send_public_request("/api/v3/exchangeInfo", &[("symbol", symbol.to_string())])
            .await?;
        let step = info
            .step_size(symbol)
            .ok_or_else(|| anyhow!("No LOT_SIZE filter for {}", symbol))?;

        self.step_sizes
            .lock()
            .map_err(|_| anyhow!("step size cache poisoned"))?
            .insert(symbol.to_string(), step);
        Ok(step)
    }

    async fn place_market_order(
        &self,
        pair: &SymbolPair,
        side: Side,
        amount: Decimal,
    ) -> Result<BalanceMap> {
        let symbol = pair.venue_symbol();
        let quantity = normalize_quantity(amount, self.step_size(&symbol).await?);
        if quantity <= Decimal::ZERO {
            bail!("Quantity {} of {} rounds to zero", amount, pair);
        }

        let side_str = match side {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        };
        let params = vec![
            ("symbol", symbol.clone()),
            ("side", side_str.to_string()),
            ("type", "MARKET".to_string()),
            ("quantity", quantity.to_string()),
            ("newClientOrderId", Uuid::new_v4().simple().to_string()),
            ("newOrderRespType", "RESULT".to_string()),
        ];

        info!("🚀 Sending Order: {} {} {}", side_str, quantity, symbol);

        let ack: OrderAck = self
            .send_signed_request(Method::POST, "/api/v3/order", params)
            .await?;

        if ack.executed_qty.is_zero() {
            bail!("Order {} on {} not filled (status {})", ack.order_id, ack.symbol, ack.status);
        }
        info!(
            "✅ Order {} {}: executed {} {}",
            ack.order_id, ack.status, ack.executed_qty, ack.symbol
        );

        self.get_balances().await
    }
}

#[async_trait]
impl VenueGateway for BinanceClient {
    fn name(&self) -> &str {
        "binance"
    }

    async fn connect(&self) -> Result<()> {
        let url = format!("{}/api/v3/ping", self.base_rest_url);
        self.http_client
            .get(&url)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn get_balances(&self) -> Result<BalanceMap> {
        let account: AccountInfo = self
            .send_signed_request(Method::GET, "/api/v3/account", vec![])
            .await?;

        Ok(account
            .balances
            .into_iter()
            .map(|b| (b.asset, b.free))
            .collect())
    }

    async fn get_candles(
        &self,
        pair: &SymbolPair,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Bar>> {
        let rows: Vec<BinanceKline> = self
            .send_public_request(
                "/api/v3/klines",
                &[
                    ("symbol", pair.venue_symbol()),
                    ("interval", interval.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await
            .with_context(|| format!("Failed to fetch candles for {}", pair))?;

        debug!("Fetched {} candles for {}", rows.len(), pair);
        Ok(rows.into_iter().map(Bar::from).collect())
    }

    async fn buy(&self, pair: &SymbolPair, amount: Decimal) -> Result<BalanceMap> {
        self.place_market_order(pair, Side::Buy, amount).await
    }

    async fn sell(&self, pair: &SymbolPair, amount: Decimal) -> Result<BalanceMap> {
        self.place_market_order(pair, Side::Sell, amount).await
    }
}
