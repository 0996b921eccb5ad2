// src/storage/balances.rs
use crate::error::EngineError;
use crate::storage::{BalanceStore, LedgerSnapshot};
use std::path::PathBuf;

/// Ledger persisted as pretty JSON, replaced atomically on every save.
pub struct JsonBalanceStore {
    path: PathBuf,
}

impl JsonBalanceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BalanceStore for JsonBalanceStore {
    fn load(&self) -> Result<Option<LedgerSnapshot>, EngineError> {
        match std::fs::read_to_string(&self.path) {
            Ok(data) => Ok(Some(serde_json::from_str(&data)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), EngineError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let data = serde_json::to_string_pretty(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
