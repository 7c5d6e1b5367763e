//! Per-interval snapshot of holdings and price statistics.

use std::collections::HashMap;
use std::time::Duration;

use fairmm_core::{AssetId, MarketId, Portfolio};
use fairmm_pricing::PriceState;

/// Immutable view used for one scoring pass.
///
/// Built once at the start of an interval from copies of the portfolio and
/// the estimator table, so every proposal in the interval sees the same
/// numbers even if trades arrive meanwhile.
#[derive(Debug, Clone)]
pub struct ScoreContext {
    portfolio: Portfolio,
    prices: HashMap<AssetId, PriceState>,
    last_trades: HashMap<MarketId, f64>,
    elapsed: Duration,
    taken_at_ms: u64,
}

impl ScoreContext {
    pub fn new(portfolio: Portfolio, prices: HashMap<AssetId, PriceState>, taken_at_ms: u64) -> Self {
        Self {
            portfolio,
            prices,
            last_trades: HashMap::new(),
            elapsed: Duration::ZERO,
            taken_at_ms,
        }
    }

    /// Attach the last observed trade price per market.
    pub fn with_last_trades(mut self, last_trades: HashMap<MarketId, f64>) -> Self {
        self.last_trades = last_trades;
        self
    }

    /// Time since the session started.
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn prices(&self) -> &HashMap<AssetId, PriceState> {
        &self.prices
    }

    pub fn price(&self, asset: &AssetId) -> Option<&PriceState> {
        self.prices.get(asset)
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn last_trade(&self, market: &MarketId) -> Option<f64> {
        self.last_trades.get(market).copied()
    }

    pub fn held(&self, asset: &AssetId) -> i64 {
        self.portfolio.held(asset)
    }

    pub fn taken_at_ms(&self) -> u64 {
        self.taken_at_ms
    }
}
