//! Quoting engine.
//!
//! Owns every piece of mutable core state (estimator, TWAPs, detector,
//! reconciler) and is its single writer. Trades and fills are applied
//! between intervals; an interval works on one snapshot of prices and
//! holdings from start to finish.
//!
//! Interval flow:
//! 1. Snapshot prices and portfolio into a `ScoreContext`
//! 2. Evaluate the arbitrage detector on the TWAPs
//! 3. Plan each market (Routine / Suspended / Forced), forced markets first,
//!    net of what the other markets already committed; a failing market is
//!    logged and skipped
//! 4. Reconcile plans against resting orders, urgent markets first

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fairmm_core::{Asset, AssetId, Fill, Market, MarketId, TradeEvent};
use fairmm_detector::{ArbitrageDetector, ArbitrageSignal};
use fairmm_executor::{DynOrderGateway, OrderReconciler};
use fairmm_pricing::{ConfidenceIntervalEngine, PriceEstimator, PriceState, TwapTracker};
use fairmm_strategy::{
    Directive, IntervalBudget, OpportunitySearch, PriceGuard, ScoreContext, StrategyError,
};
use fairmm_telemetry::Metrics;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::feed::{now_ms, MarketEvent};
use crate::portfolio::PortfolioView;

/// Outcome of one interval.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntervalSummary {
    pub arbitrage_active: usize,
    pub planned: usize,
    pub candidates: usize,
    pub submitted: usize,
    pub cancelled: usize,
    /// Markets whose plan or reconcile failed this interval.
    pub failed: Vec<MarketId>,
}

/// Counters over an engine run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub intervals: u64,
    pub trades: u64,
    pub rejected: u64,
    pub fills: u64,
}

pub struct Engine {
    assets: HashMap<AssetId, Asset>,
    markets: Vec<Market>,
    market_assets: HashMap<MarketId, AssetId>,
    estimator: PriceEstimator,
    twaps: TwapTracker,
    search: OpportunitySearch,
    detector: ArbitrageDetector,
    reconciler: OrderReconciler,
    portfolio: Arc<dyn PortfolioView>,
    rng: StdRng,
    session_start_ms: Option<u64>,
    interval: Duration,
    metrics_log_interval_secs: u64,
    stats: EngineStats,
}

impl Engine {
    /// Build an engine from a validated configuration.
    pub fn new(
        config: &AppConfig,
        gateway: DynOrderGateway,
        portfolio: Arc<dyn PortfolioView>,
    ) -> AppResult<Self> {
        let search = OpportunitySearch::new(
            config.strategy.clone(),
            ConfidenceIntervalEngine::new(&config.pricing),
        );
        let reconciler_config = if config.strategy.kind.is_reactive() {
            config.reconciler.clone().for_reactive()
        } else {
            config.reconciler.clone()
        };
        let reconciler = OrderReconciler::new(
            gateway,
            reconciler_config,
            PriceGuard::from_config(&config.strategy),
        );
        let detector = ArbitrageDetector::new(config.detector.clone())?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        info!(
            assets = config.assets.len(),
            markets = config.markets.len(),
            pairs = detector.pair_count(),
            interval_ms = config.interval_ms,
            strategy = ?config.strategy.kind,
            scorer = search.scoring().scorer_name(),
            "Engine initialized"
        );

        Ok(Self {
            assets: config
                .assets
                .iter()
                .map(|a| (a.asset_id(), a.to_asset()))
                .collect(),
            markets: config.markets.clone(),
            market_assets: config.market_assets(),
            estimator: PriceEstimator::new(&config.pricing),
            twaps: TwapTracker::new(config.pricing.twap_window_ms),
            search,
            detector,
            reconciler,
            portfolio,
            rng,
            session_start_ms: None,
            interval: Duration::from_millis(config.interval_ms),
            metrics_log_interval_secs: config.metrics_log_interval_secs,
            stats: EngineStats::default(),
        })
    }

    /// Feed one trade to the estimator and the TWAP tracker.
    ///
    /// Invalid observations are counted and leave all state untouched.
    pub fn ingest(&mut self, trade: &TradeEvent) -> AppResult<PriceState> {
        let Some(asset) = self.market_assets.get(&trade.market).copied() else {
            Metrics::observation_rejected("unknown_market");
            self.stats.rejected += 1;
            return Err(AppError::UnknownMarket(trade.market));
        };

        let state = match self.estimator.observe(asset, trade.price) {
            Ok(state) => state,
            Err(e) => {
                Metrics::observation_rejected("invalid_price");
                self.stats.rejected += 1;
                return Err(e.into());
            }
        };
        self.twaps
            .record(trade.market, trade.price, trade.timestamp_ms);

        Metrics::trade_observed(&trade.market.to_string());
        Metrics::price_state(&asset.to_string(), state.mean(), state.volatility());
        self.stats.trades += 1;
        Ok(state)
    }

    /// Record one of our orders executing.
    pub fn on_fill(&mut self, fill: &Fill, now_ms: u64) {
        Metrics::fill(&fill.market.to_string(), &fill.side.to_string());
        info!(
            market = %fill.market,
            side = %fill.side,
            price = %fill.price,
            quantity = %fill.quantity,
            id = %fill.id,
            "Order filled"
        );
        self.reconciler.on_fill(fill);
        self.detector.on_fill(&fill.market, now_ms);
        self.stats.fills += 1;
    }

    /// Run one trading interval as of `now_ms`.
    pub async fn run_interval(&mut self, now_ms: u64) -> IntervalSummary {
        let started = Instant::now();
        let session_start = *self.session_start_ms.get_or_insert(now_ms);
        let elapsed = Duration::from_millis(now_ms.saturating_sub(session_start));

        let last_trades = self
            .markets
            .iter()
            .filter_map(|m| self.twaps.last_price(&m.id).map(|px| (m.id, px)))
            .collect();
        let ctx = ScoreContext::new(self.portfolio.snapshot(), self.estimator.snapshot(), now_ms)
            .with_last_trades(last_trades)
            .with_elapsed(elapsed);
        let signal = self.detector.evaluate(&self.twaps, now_ms);

        let mut summary = IntervalSummary {
            arbitrage_active: signal.active.len(),
            ..Default::default()
        };

        // Resting orders stay committed until their market is replanned
        let mut budget = IntervalBudget::new();
        for market in &self.markets {
            let resting = self
                .reconciler
                .resting(&market.id)
                .into_iter()
                .map(|r| r.order)
                .collect();
            budget.set(market.id, market.asset, resting);
        }

        let mut ordered: Vec<(&Market, Directive)> = self
            .markets
            .iter()
            .map(|m| (m, directive_for(&signal, &m.id)))
            .collect();
        ordered.sort_by_key(|(_, directive)| !matches!(directive, Directive::Forced { .. }));

        let mut plans = Vec::with_capacity(self.markets.len());
        for (market, directive) in ordered {
            let Some(asset) = self.assets.get(&market.asset) else {
                Metrics::market_failure(&market.id.to_string(), "plan");
                warn!(market = %market.id, asset = %market.asset, "Market quotes unknown asset");
                summary.failed.push(market.id);
                continue;
            };

            let committed = budget.excluding(&market.id, &market.asset);
            match self
                .search
                .plan(&ctx, market, asset, directive, &committed, &mut self.rng)
            {
                Ok(plan) => {
                    for c in &plan.candidates {
                        Metrics::candidate(&market.id.to_string(), &c.order.side.to_string());
                    }
                    if !plan.is_suspended() {
                        let orders = plan.candidates.iter().map(|c| c.order.clone()).collect();
                        budget.set(market.id, market.asset, orders);
                    }
                    summary.candidates += plan.candidates.len();
                    plans.push(plan);
                }
                Err(StrategyError::MissingPriceState(asset)) => {
                    debug!(market = %market.id, %asset, "No trades observed yet, skipping");
                }
                Err(e) => {
                    Metrics::market_failure(&market.id.to_string(), "plan");
                    warn!(market = %market.id, error = %e, "Planning failed, market skipped");
                    summary.failed.push(market.id);
                }
            }
        }
        summary.planned = plans.len();

        for (market, result) in self.reconciler.reconcile_all(plans).await {
            match result {
                Ok(report) => {
                    summary.submitted += report.submitted;
                    summary.cancelled += report.cancelled;
                    if !report.failures.is_empty() {
                        Metrics::market_failure(&market.to_string(), "gateway");
                        summary.failed.push(market);
                    }
                }
                Err(e) => {
                    Metrics::market_failure(&market.to_string(), "reconcile");
                    warn!(%market, error = %e, "Reconcile failed, retrying next interval");
                    summary.failed.push(market);
                }
            }
        }

        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        Metrics::interval_duration(duration_ms);
        self.stats.intervals += 1;

        debug!(
            interval = self.stats.intervals,
            arbitrage_active = summary.arbitrage_active,
            planned = summary.planned,
            candidates = summary.candidates,
            submitted = summary.submitted,
            cancelled = summary.cancelled,
            failed = summary.failed.len(),
            duration_ms,
            "Interval complete"
        );
        summary
    }

    /// Main loop: apply market events, run an interval on every tick, stop
    /// when `shutdown` resolves or the event channel closes.
    pub async fn run<S>(
        &mut self,
        mut events: mpsc::Receiver<MarketEvent>,
        shutdown: S,
    ) -> AppResult<EngineStats>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let log_metrics = self.metrics_log_interval_secs > 0;
        let mut metrics_ticker =
            tokio::time::interval(Duration::from_secs(self.metrics_log_interval_secs.max(1)));

        info!("Entering main event loop");
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(MarketEvent::Trade(trade)) => {
                        if let Err(e) = self.ingest(&trade) {
                            debug!(market = %trade.market, error = %e, "Observation rejected");
                        }
                    }
                    Some(MarketEvent::Fill(fill)) => self.on_fill(&fill, now_ms()),
                    None => {
                        info!("Market event channel closed");
                        break;
                    }
                },

                _ = ticker.tick() => {
                    self.run_interval(now_ms()).await;
                }

                _ = metrics_ticker.tick(), if log_metrics => {
                    log_metrics_snapshot();
                }

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        let stats = self.stats;
        info!(
            intervals = stats.intervals,
            trades = stats.trades,
            rejected = stats.rejected,
            fills = stats.fills,
            "Shutting down"
        );
        Ok(stats)
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn estimator(&self) -> &PriceEstimator {
        &self.estimator
    }

    pub fn twaps(&self) -> &TwapTracker {
        &self.twaps
    }

    pub fn detector(&self) -> &ArbitrageDetector {
        &self.detector
    }

    pub fn reconciler(&self) -> &OrderReconciler {
        &self.reconciler
    }
}

/// What a market does this interval given the arbitrage signal.
pub fn directive_for(signal: &ArbitrageSignal, market: &MarketId) -> Directive {
    match signal.forced_side(market) {
        Some(side) => Directive::Forced { side },
        None if signal.any_active() => Directive::Suspended,
        None => Directive::Routine,
    }
}

fn log_metrics_snapshot() {
    match Metrics::encode_text() {
        Ok(text) => info!(bytes = text.len(), "Metrics snapshot\n{}", text),
        Err(e) => error!(error = %e, "Failed to encode metrics"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairmm_core::OrderSide;
    use fairmm_detector::{ActiveArbitrage, MarketPair};

    #[test]
    fn test_directive_mapping() {
        let idle = ArbitrageSignal::idle(0);
        assert_eq!(directive_for(&idle, &MarketId::new(0)), Directive::Routine);

        let active = ArbitrageSignal {
            active: vec![ActiveArbitrage {
                pair: MarketPair::new(MarketId::new(0), MarketId::new(1)),
                cheap: MarketId::new(0),
                dear: MarketId::new(1),
                divergence: 3.0,
                since_ms: 0,
            }],
            evaluated_at_ms: 0,
        };
        assert_eq!(
            directive_for(&active, &MarketId::new(0)),
            Directive::Forced {
                side: OrderSide::Buy
            }
        );
        assert_eq!(
            directive_for(&active, &MarketId::new(1)),
            Directive::Forced {
                side: OrderSide::Sell
            }
        );
        assert_eq!(directive_for(&active, &MarketId::new(2)), Directive::Suspended);
    }
}
