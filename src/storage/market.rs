// src/storage/market.rs
use crate::error::EngineError;
use crate::storage::MarketStore;
use crate::types::{SymbolPair, SymbolStats};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Layout of the market file written by the analyzer:
///
/// ```json
/// {
///   "fees": { "binance": "0.001" },
///   "symbols": [ { "symbol": "BTC/USDT", "avg_up": "0.021", "avg_down": "-0.034" } ],
///   "obsolete": [ "XRP/USDT" ]
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
struct MarketFile {
    #[serde(default)]
    fees: HashMap<String, Decimal>,
    #[serde(default)]
    symbols: Vec<SymbolStats>,
    #[serde(default)]
    obsolete: Vec<SymbolPair>,
}

pub struct JsonMarketStore {
    path: PathBuf,
    cache: Option<MarketFile>,
}

impl JsonMarketStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: None,
        }
    }

    fn market(&mut self, cached: bool) -> Result<&MarketFile, EngineError> {
        if !cached || self.cache.is_none() {
            let market = match std::fs::read_to_string(&self.path) {
                Ok(data) => serde_json::from_str::<MarketFile>(&data)?,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!("Market file {} not found", self.path.display());
                    MarketFile::default()
                }
                Err(e) => return Err(e.into()),
            };
            debug!(
                "Loaded {} active / {} obsolete symbols from {}",
                market.symbols.len(),
                market.obsolete.len(),
                self.path.display()
            );
            self.cache = Some(market);
        }
        Ok(self.cache.get_or_insert_with(MarketFile::default))
    }
}

impl MarketStore for JsonMarketStore {
    fn load_symbols(&mut self, cached: bool) -> Result<Vec<SymbolStats>, EngineError> {
        Ok(self.market(cached)?.symbols.clone())
    }

    fn obsolete_symbols(&mut self, cached: bool) -> Result<Vec<SymbolPair>, EngineError> {
        let market = self.market(cached)?;
        Ok(market
            .obsolete
            .iter()
            .filter(|pair| !market.symbols.iter().any(|s| &s.symbol == *pair))
            .cloned()
            .collect())
    }

    fn fee(&mut self, venue: &str) -> Result<Decimal, EngineError> {
        match self.market(true)?.fees.get(venue) {
            Some(fee) => Ok(*fee),
            None => {
                warn!("No fee recorded for venue '{}', assuming 0", venue);
                Ok(Decimal::ZERO)
            }
        }
    }
}
