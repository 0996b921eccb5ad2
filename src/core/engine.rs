// src/core/engine.rs
use crate::config::AppConfig;
use crate::connectors::notify::NotificationSink;
use crate::connectors::traits::VenueGateway;
use crate::core::executor::TradeExecutor;
use crate::core::ledger::Ledger;
use crate::error::EngineError;
use crate::storage::MarketStore;
use crate::strategies::signals::{candle_status, volume_status};
use crate::strategies::traits::{Signal, Strategy, SymbolContext, TradeReason};
use crate::types::{Bar, Notification, NotifyKind, Side, SymbolPair, SymbolStats, TradeOutcome};
use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

const IDLE_POLL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedTrade {
    pub pair: SymbolPair,
    pub reason: TradeReason,
    pub outcome: TradeOutcome,
}

/// What one pass over the universe did.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub evaluated: usize,
    pub faults: usize,
    pub trades: Vec<ExecutedTrade>,
    pub interrupted: bool,
}

pub struct TradingEngine<S> {
    config: AppConfig,
    strategy: S,
    gateway: Arc<dyn VenueGateway>,
    market: Box<dyn MarketStore>,
    ledger: Ledger,
    executor: TradeExecutor,
    notifications: NotificationSink,
    verbose: bool,
    last_cycle: Option<Instant>,
}

impl<S> TradingEngine<S>
where
    S: Strategy,
{
    pub fn new(
        config: AppConfig,
        strategy: S,
        gateway: Arc<dyn VenueGateway>,
        market: Box<dyn MarketStore>,
        ledger: Ledger,
        executor: TradeExecutor,
        notifications: NotificationSink,
    ) -> Self {
        Self {
            config,
            strategy,
            gateway,
            market,
            ledger,
            executor,
            notifications,
            verbose: false,
            last_cycle: None,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Duty-cycle loop: a cycle starts once `cycle_interval` has passed since the
    /// previous start. Overruns start the next cycle immediately, with no catch-up.
    /// Returns when `shutdown` flips to true.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let cycle = self.config.cycle_duration()?;
        info!(
            "Trading! strategy={} mode={:?} cycle={:?}",
            self.strategy.name(),
            self.executor.mode(),
            cycle
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            if let Some(last) = self.last_cycle {
                if last.elapsed() < cycle {
                    tokio::select! {
                        _ = tokio::time::sleep(IDLE_POLL) => {}
                        changed = shutdown.changed() => {
                            if changed.is_err() {
                                warn!("Shutdown channel closed, stopping");
                                break;
                            }
                        }
                    }
                    continue;
                }
            }

            self.last_cycle = Some(Instant::now());
            let report = self.run_cycle(&shutdown).await;
            debug!(
                "Cycle done: evaluated={} trades={} faults={}",
                report.evaluated,
                report.trades.len(),
                report.faults
            );
            if self.verbose {
                info!("-----");
            }
        }

        info!("Engine stopped. Balances: {}", self.ledger.summary());
        Ok(())
    }

    /// One pass: active pairs first, then obsolete pairs still holding a position.
    /// Pairs are handled one at a time in file order since a trade on one
    /// changes the fiat available to the next. Shutdown is honoured between pairs.
    pub async fn run_cycle(&mut self, shutdown: &watch::Receiver<bool>) -> CycleReport {
        let mut report = CycleReport::default();

        let active = match self.market.load_symbols(true) {
            Ok(symbols) => symbols,
            Err(e) => {
                error!("Failed to load symbols: {}", e);
                report.faults += 1;
                Vec::new()
            }
        };

        for stats in &active {
            if *shutdown.borrow() {
                report.interrupted = true;
                return report;
            }
            self.process(&stats.symbol, Some(stats), &mut report).await;
        }

        let held: Vec<SymbolPair> = match self.market.obsolete_symbols(true) {
            Ok(pairs) => pairs
                .into_iter()
                .filter(|p| self.ledger.has_entry(p.coin()))
                .collect(),
            Err(e) => {
                error!("Failed to load obsolete symbols: {}", e);
                report.faults += 1;
                Vec::new()
            }
        };

        for pair in &held {
            if *shutdown.borrow() {
                report.interrupted = true;
                return report;
            }
            self.process(pair, None, &mut report).await;
        }

        report
    }

    async fn process(
        &mut self,
        pair: &SymbolPair,
        stats: Option<&SymbolStats>,
        report: &mut CycleReport,
    ) {
        report.evaluated += 1;
        match self.evaluate_symbol(pair, stats).await {
            Ok(Some(trade)) => report.trades.push(trade),
            Ok(None) => {}
            Err(e) => {
                warn!("{}: skipped this cycle: {:#}", pair, e);
                report.faults += 1;
            }
        }
    }

    async fn evaluate_symbol(
        &mut self,
        pair: &SymbolPair,
        stats: Option<&SymbolStats>,
    ) -> Result<Option<ExecutedTrade>> {
        let bars = self.fetch_bars(pair).await?;
        let candle = candle_status(&bars)?;
        let volume_valid =
            volume_status(&bars, self.config.strategy.volume_window).unwrap_or(false);

        if self.verbose {
            info!(
                "{}: Dir={:?}, Open={}, Close={}, Volume={}",
                pair, candle.direction, candle.ref_open, candle.last_close, volume_valid
            );
        } else {
            debug!(
                "{}: Dir={:?}, Open={}, Close={}, Volume={}",
                pair, candle.direction, candle.ref_open, candle.last_close, volume_valid
            );
        }

        let ctx = SymbolContext {
            pair,
            stats,
            candle,
            volume_valid,
            position: self.ledger.position(pair.coin()),
            fee: self.executor.fee(),
        };

        let (reason, price) = match self.strategy.evaluate(&ctx) {
            Signal::Hold => return Ok(None),
            Signal::Advice(reason, price) => (reason, price),
        };

        let outcome = match reason.side() {
            Side::Buy => {
                info!(" ** Buying {}...", pair);
                self.executor
                    .buy(&mut self.ledger, pair, price, self.config.trade_notional)
                    .await
            }
            Side::Sell => {
                info!(" ** Selling {} ({:?})...", pair, reason);
                self.executor.sell(&mut self.ledger, pair, price, None).await
            }
        };

        let kind = if outcome.is_ok() {
            match reason {
                TradeReason::Entry => NotifyKind::Entry,
                TradeReason::TakeProfit => NotifyKind::TakeProfit,
                TradeReason::StopLoss => NotifyKind::StopLoss,
                TradeReason::ObsoleteExit => NotifyKind::ObsoleteExit,
            }
        } else {
            NotifyKind::Failure
        };
        self.notifications
            .send(Notification::new(kind, outcome.message.clone()));

        Ok(Some(ExecutedTrade {
            pair: pair.clone(),
            reason,
            outcome,
        }))
    }

    /// Candle fetch with a timeout per attempt and `candle_retries` extra tries.
    async fn fetch_bars(&self, pair: &SymbolPair) -> Result<Vec<Bar>> {
        let timeout = self.config.request_timeout();
        let mut last_error = anyhow!("no attempt made");

        for attempt in 0..=self.config.candle_retries {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(250 * u64::from(attempt))).await;
            }

            let fetch = self.gateway.get_candles(
                pair,
                &self.config.signal_interval,
                self.config.candle_limit,
            );
            match tokio::time::timeout(timeout, fetch).await {
                Ok(Ok(bars)) if bars.len() >= 2 => return Ok(bars),
                Ok(Ok(bars)) => {
                    return Err(EngineError::NotEnoughBars {
                        need: 2,
                        got: bars.len(),
                    }
                    .into())
                }
                Ok(Err(e)) => last_error = e,
                Err(_) => last_error = anyhow!("candle request timed out after {:?}", timeout),
            }
            debug!("{}: candle fetch attempt {} failed: {}", pair, attempt + 1, last_error);
        }

        Err(last_error)
    }
}
