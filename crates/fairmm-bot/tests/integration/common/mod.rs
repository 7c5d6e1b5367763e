//! Shared fixtures: configuration builders and an engine harness.

use std::sync::Arc;

use fairmm_bot::{AppConfig, AssetConfig, Engine, PaperPortfolio, PaperVenue};
use fairmm_core::{AssetId, Market, MarketId, TradeEvent};
use fairmm_detector::MarketPair;
use fairmm_executor::PaperGateway;

pub fn mkt(id: u32) -> MarketId {
    MarketId::new(id)
}

pub fn asset(id: u32, optimal: i64, initial_holding: i64) -> AssetConfig {
    AssetConfig {
        id,
        name: format!("A{id}"),
        optimal,
        initial_holding,
    }
}

/// One asset quoted on one market.
pub fn single_market_config(optimal: i64, initial_holding: i64) -> AppConfig {
    AppConfig {
        seed: Some(7),
        assets: vec![asset(0, optimal, initial_holding)],
        markets: vec![Market::new(mkt(0), AssetId::new(0))],
        ..Default::default()
    }
}

/// One asset quoted on two paired markets.
pub fn paired_config(optimal: i64, initial_holding: i64) -> AppConfig {
    let mut config = single_market_config(optimal, initial_holding);
    config.markets.push(Market::new(mkt(1), AssetId::new(0)));
    config.detector.pairs = vec![MarketPair::new(mkt(0), mkt(1))];
    config
}

/// Engine wired to a paper gateway and portfolio.
pub struct Harness {
    pub engine: Engine,
    pub gateway: Arc<PaperGateway>,
    pub portfolio: Arc<PaperPortfolio>,
    pub venue: PaperVenue,
}

impl Harness {
    pub fn new(config: AppConfig) -> Self {
        config.validate().unwrap();
        let gateway = Arc::new(PaperGateway::new());
        let portfolio = Arc::new(PaperPortfolio::from_config(&config));
        let engine = Engine::new(&config, gateway.clone(), portfolio.clone()).unwrap();
        let venue = PaperVenue::new(gateway.clone(), portfolio.clone(), config.market_assets());
        Self {
            engine,
            gateway,
            portfolio,
            venue,
        }
    }

    /// Observe a trade without touching the paper book.
    pub fn observe(&mut self, market: MarketId, price: f64, ts: u64) {
        self.engine
            .ingest(&TradeEvent::new(market, price, ts))
            .unwrap();
    }

    /// Observe a trade and settle any resting orders it crosses.
    pub fn trade(&mut self, market: MarketId, price: f64, ts: u64) -> usize {
        let event = TradeEvent::new(market, price, ts);
        let fills = self.venue.on_trade(&event);
        self.engine.ingest(&event).unwrap();
        for fill in &fills {
            self.engine.on_fill(fill, ts);
        }
        fills.len()
    }

    /// Alternate two prices on a market, `count` trades 100 ms apart.
    pub fn oscillate(&mut self, market: MarketId, low: f64, high: f64, count: u64, start: u64) {
        for i in 0..count {
            let price = if i % 2 == 0 { low } else { high };
            self.observe(market, price, start + i * 100);
        }
    }
}
