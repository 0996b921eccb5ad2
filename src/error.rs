// src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no tradable symbols found, run the market analyzer first")]
    DataUnavailable,

    #[error("need at least {need} bars, got {got}")]
    NotEnoughBars { need: usize, got: usize },

    #[error("invalid price data: {0}")]
    InvalidPrice(String),

    #[error("invalid symbol pair '{0}', expected COIN/FIAT")]
    InvalidPair(String),

    #[error("invalid interval '{0}'")]
    InvalidInterval(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Storage(e.to_string())
    }
}
