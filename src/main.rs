// src/main.rs
use dotenvy::dotenv;
use std::env;
use std::sync::Arc;
use swing_trader::config::AppConfig;
use swing_trader::connectors::binance::BinanceClient;
use swing_trader::connectors::discord::DiscordNotifier;
use swing_trader::connectors::notify::{
    close_notifier, spawn_notifier, LogNotifier, NotificationSink,
};
use swing_trader::connectors::traits::{Notifier, VenueGateway};
use swing_trader::core::bootstrap::{bootstrap, BootstrapOptions};
use swing_trader::core::engine::TradingEngine;
use swing_trader::core::executor::TradeExecutor;
use swing_trader::core::ledger::Ledger;
use swing_trader::error::EngineError;
use swing_trader::storage::{JsonBalanceStore, JsonMarketStore, MarketStore};
use swing_trader::strategies::swing::SwingStrategy;
use swing_trader::types::{Notification, TradingMode};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

fn env_flag(name: &str) -> bool {
    env::var(name)
        .unwrap_or("false".to_string())
        .parse::<bool>()
        .unwrap_or(false)
}

/// Stdout logging, or a daily file under `logs/` when running as a daemon.
fn init_tracing(daemon: bool) -> Option<WorkerGuard> {
    if daemon {
        let appender = tracing_appender::rolling::daily("logs", "trader.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_writer(writer)
            .with_ansi(false)
            .init();
        Some(guard)
    } else {
        tracing_subscriber::fmt().init();
        None
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // 1. Run flags (default to paper trading for safety)
    let live_trading = env_flag("LIVE_TRADING");
    let reset_balance = env_flag("RESET_BALANCE");
    let verbose = env_flag("VERBOSE");
    let _log_guard = init_tracing(env_flag("DAEMON"));

    let config = AppConfig::new()?;
    let mode = TradingMode::from_live_flag(live_trading);

    println!("========================================");
    println!("       SWING TRADER - v0.1.0");
    println!("========================================");
    println!("Base:   {} ({} per trade)", config.base_asset, config.trade_notional);
    println!(
        "Mode:   {}",
        if live_trading {
            "🚨 LIVE TRADING"
        } else {
            "📝 PAPER TRADING"
        }
    );
    println!("========================================");

    // 2. Notifications
    let notifier: Arc<dyn Notifier> = match &config.discord_webhook {
        Some(url) => Arc::new(DiscordNotifier::new(url, config.request_timeout())?),
        None => Arc::new(LogNotifier),
    };
    let (notify_tx, notify_rx) = mpsc::channel(100);
    let notifier_task = spawn_notifier(notifier, notify_rx);
    let notifications = NotificationSink::new(notify_tx);
    notifications.send(Notification::info("Trader Started!"));

    // 3. Venue
    let api_key = env::var("BINANCE_API_KEY").unwrap_or_default();
    let secret_key = env::var("BINANCE_SECRET_KEY").unwrap_or_default();
    let gateway: Arc<dyn VenueGateway> = Arc::new(BinanceClient::new(
        api_key,
        secret_key,
        config.request_timeout(),
    )?);
    match gateway.connect().await {
        Ok(()) => info!("CONNECTED to {}", gateway.name()),
        Err(e) => warn!("Could not reach {}: {}", gateway.name(), e),
    }

    // 4. Storage & ledger
    let mut market = JsonMarketStore::new(config.market_file.clone());
    let fee = market.fee(&config.venue)?;
    let mut ledger = Ledger::new(Box::new(JsonBalanceStore::new(config.balance_file.clone())));

    let options = BootstrapOptions {
        mode,
        reset_balance,
        base_asset: config.base_asset.clone(),
        starting_balance: config.starting_balance,
    };
    let seeded = bootstrap(
        &options,
        &mut market,
        &mut ledger,
        gateway.as_ref(),
        &notifications,
    )
    .await;
    if let Err(e) = seeded {
        // let queued startup messages go out before exiting
        close_notifier(notifications, notifier_task).await;
        if let Some(EngineError::DataUnavailable) = e.downcast_ref::<EngineError>() {
            error!("{}", e);
            return Ok(());
        }
        return Err(e);
    }

    // 5. Shutdown on Ctrl+C, honoured between symbols
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl+C received, finishing current symbol...");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                error!("Cannot listen for Ctrl+C: {}", e);
                // park with the sender so the engine keeps running
                let _keep_alive = shutdown_tx;
                std::future::pending::<()>().await;
            }
        }
    });

    // 6. Run Engine
    let strategy = SwingStrategy::new(&config.strategy);
    let executor = TradeExecutor::new(mode, fee, gateway.clone());
    let mut engine = TradingEngine::new(
        config,
        strategy,
        gateway,
        Box::new(market),
        ledger,
        executor,
        notifications,
    )
    .with_verbose(verbose);

    if let Err(e) = engine.run(shutdown_rx).await {
        error!("Fatal Engine Error: {}", e);
    }

    drop(engine);
    let _ = notifier_task.await;
    Ok(())
}
