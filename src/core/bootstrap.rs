// src/core/bootstrap.rs
//! One-time startup: resolve the universe and seed the ledger.

use crate::connectors::notify::NotificationSink;
use crate::connectors::traits::VenueGateway;
use crate::core::ledger::Ledger;
use crate::error::EngineError;
use crate::storage::MarketStore;
use crate::types::{Notification, PositionState, SymbolStats, TradingMode};
use anyhow::Result;
use rust_decimal::Decimal;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    pub mode: TradingMode,
    /// Paper mode only: discard cached balances and re-fund.
    pub reset_balance: bool,
    pub base_asset: String,
    pub starting_balance: Decimal,
}

/// Distinct assets of all pairs, in order of first appearance.
pub fn tradable_assets(symbols: &[SymbolStats]) -> Vec<String> {
    let mut assets: Vec<String> = Vec::new();
    for stats in symbols {
        for asset in [stats.symbol.coin(), stats.symbol.fiat()] {
            if !assets.iter().any(|a| a == asset) {
                assets.push(asset.to_string());
            }
        }
    }
    assets
}

/// Seeds `ledger` and returns the active universe.
///
/// Fails with [`EngineError::DataUnavailable`] when the market store lists no
/// symbols; the caller must not start trading in that case.
pub async fn bootstrap(
    options: &BootstrapOptions,
    market: &mut dyn MarketStore,
    ledger: &mut Ledger,
    gateway: &dyn VenueGateway,
    notifications: &NotificationSink,
) -> Result<Vec<SymbolStats>> {
    let symbols = market.load_symbols(false)?;
    if symbols.is_empty() {
        return Err(EngineError::DataUnavailable.into());
    }

    let msg = format!(
        "Trading symbols: {}",
        symbols
            .iter()
            .map(|s| s.symbol.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    info!("{}", msg);
    notifications.send(Notification::info(msg));

    let assets = tradable_assets(&symbols);
    ledger.set_mode(options.mode);
    match options.mode {
        TradingMode::Paper => seed_paper(options, &assets, ledger)?,
        TradingMode::Live => seed_live(&assets, ledger, gateway).await?,
    }
    ledger.persist()?;

    let msg = format!("Current Balances: {}", ledger.summary());
    info!("{}", msg);
    notifications.send(Notification::info(msg));

    Ok(symbols)
}

fn seed_paper(options: &BootstrapOptions, assets: &[String], ledger: &mut Ledger) -> Result<()> {
    info!("Setting cached balances...");
    let loaded = ledger.load()?;
    let from_live = ledger.saved_mode() == Some(TradingMode::Live);
    if from_live {
        warn!("Saved ledger belongs to a live session, not reusing it for paper trading");
    }
    if options.reset_balance || !loaded || from_live || ledger.balances().is_empty() {
        info!("Resetting balances...");
        ledger.reset(assets);
        ledger.set_balance(&options.base_asset, options.starting_balance);
    }
    Ok(())
}

async fn seed_live(
    assets: &[String],
    ledger: &mut Ledger,
    gateway: &dyn VenueGateway,
) -> Result<()> {
    info!("Setting live balances...");
    // Saved positions carry entry prices the venue does not know about, but
    // only a live session's entries describe the real account.
    if ledger.load()? && ledger.saved_mode() != Some(TradingMode::Live) {
        warn!("Saved positions come from a paper session, starting live with none");
        ledger.clear_positions();
    }

    let venue_balances = gateway.get_balances().await?;
    for asset in assets {
        if let Some(free) = venue_balances.get(asset) {
            ledger.set_balance(asset, *free);
        }
    }

    for asset in assets {
        if ledger.has_entry(asset) && ledger.balance(asset).is_zero() {
            warn!("{} has an entry but no balance on the venue, marking flat", asset);
            ledger.set_position(asset, PositionState::Flat);
        }
    }
    Ok(())
}
