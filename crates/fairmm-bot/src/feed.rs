//! Market data and the paper marketplace.
//!
//! A [`MarketDataFeed`] yields trades one at a time. [`spawn_paper_market`]
//! paces a feed on a tokio task, lets each trade cross the paper book and
//! forwards trades and resulting fills to the engine over an mpsc channel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use fairmm_core::{AssetId, Fill, MarketId, TradeEvent};
use fairmm_executor::PaperGateway;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::portfolio::PaperPortfolio;

/// Floor for simulated prices.
const MIN_SIM_PRICE: f64 = 0.01;

/// Pull of a market's deviation back toward the underlying, per trade.
const NOISE_REVERSION: f64 = 0.05;

/// Event delivered to the engine loop.
#[derive(Debug, Clone)]
pub enum MarketEvent {
    Trade(TradeEvent),
    /// One of our resting orders executed.
    Fill(Fill),
}

/// Source of trade events. Not restartable: once `None` is returned the
/// feed is exhausted.
pub trait MarketDataFeed: Send {
    fn next_trade(&mut self, now_ms: u64) -> Option<TradeEvent>;
}

/// Seeded random-walk trade generator.
///
/// Each asset follows a random walk; each market trades at its asset's
/// price plus a slowly mean-reverting market-specific deviation, so markets
/// quoting the same asset drift apart and back together.
pub struct RandomWalkFeed {
    rng: StdRng,
    markets: Vec<(MarketId, AssetId)>,
    underlying: HashMap<AssetId, f64>,
    deviation: HashMap<MarketId, f64>,
    step: f64,
    market_noise: f64,
    cursor: usize,
}

impl RandomWalkFeed {
    pub fn new(
        markets: Vec<(MarketId, AssetId)>,
        initial_price: f64,
        step: f64,
        market_noise: f64,
        seed: u64,
    ) -> Self {
        let underlying = markets
            .iter()
            .map(|(_, asset)| (*asset, initial_price))
            .collect();
        Self {
            rng: StdRng::seed_from_u64(seed),
            markets,
            underlying,
            deviation: HashMap::new(),
            step,
            market_noise,
            cursor: 0,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let markets = config.markets.iter().map(|m| (m.id, m.asset)).collect();
        Self::new(
            markets,
            config.paper.initial_price,
            config.paper.step,
            config.paper.market_noise,
            config.paper.seed,
        )
    }
}

impl MarketDataFeed for RandomWalkFeed {
    fn next_trade(&mut self, now_ms: u64) -> Option<TradeEvent> {
        if self.markets.is_empty() {
            return None;
        }
        let (market, asset) = self.markets[self.cursor % self.markets.len()];
        self.cursor = self.cursor.wrapping_add(1);

        let step = self.step;
        let base = self.underlying.entry(asset).or_insert(MIN_SIM_PRICE);
        if step > 0.0 {
            *base += self.rng.gen_range(-step..=step);
        }
        *base = base.max(MIN_SIM_PRICE);
        let base = *base;

        let noise = self.market_noise;
        let dev = self.deviation.entry(market).or_insert(0.0);
        *dev -= *dev * NOISE_REVERSION;
        if noise > 0.0 {
            *dev += self.rng.gen_range(-noise..=noise) * NOISE_REVERSION * 4.0;
        }

        let price = (base + *dev).max(MIN_SIM_PRICE);
        Some(TradeEvent::new(market, price, now_ms))
    }
}

/// Paper book plus the portfolio it settles fills into.
#[derive(Clone)]
pub struct PaperVenue {
    gateway: Arc<PaperGateway>,
    portfolio: Arc<PaperPortfolio>,
    market_assets: HashMap<MarketId, AssetId>,
}

impl PaperVenue {
    pub fn new(
        gateway: Arc<PaperGateway>,
        portfolio: Arc<PaperPortfolio>,
        market_assets: HashMap<MarketId, AssetId>,
    ) -> Self {
        Self {
            gateway,
            portfolio,
            market_assets,
        }
    }

    /// Cross a trade against the paper book and settle the fills.
    pub fn on_trade(&self, trade: &TradeEvent) -> Vec<Fill> {
        let fills = self
            .gateway
            .match_trade(&trade.market, trade.price, trade.timestamp_ms);
        for fill in &fills {
            match self.market_assets.get(&fill.market) {
                Some(asset) => self.portfolio.apply_fill(*asset, fill),
                None => warn!(market = %fill.market, "Fill for unknown market not settled"),
            }
        }
        fills
    }
}

/// Run the paper marketplace until the feed ends or the engine goes away.
pub fn spawn_paper_market<F>(
    mut feed: F,
    venue: PaperVenue,
    tx: mpsc::Sender<MarketEvent>,
    pace: Duration,
) -> JoinHandle<()>
where
    F: MarketDataFeed + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(pace);
        let mut trades = 0u64;
        loop {
            ticker.tick().await;
            let Some(trade) = feed.next_trade(now_ms()) else {
                info!(trades, "Paper feed exhausted");
                break;
            };
            trades += 1;

            let fills = venue.on_trade(&trade);
            if tx.send(MarketEvent::Trade(trade)).await.is_err() {
                debug!("Engine gone, stopping paper market");
                break;
            }
            for fill in fills {
                if tx.send(MarketEvent::Fill(fill)).await.is_err() {
                    return;
                }
            }
        }
    })
}

/// Wall-clock time in Unix milliseconds.
pub fn now_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairmm_core::{Order, OrderSide, Portfolio, Price, Quantity};
    use fairmm_executor::OrderGateway;
    use rust_decimal_macros::dec;

    use crate::portfolio::PortfolioView;

    fn two_markets() -> Vec<(MarketId, AssetId)> {
        vec![
            (MarketId::new(0), AssetId::new(0)),
            (MarketId::new(1), AssetId::new(0)),
        ]
    }

    #[test]
    fn test_random_walk_is_seeded() {
        let mut a = RandomWalkFeed::new(two_markets(), 100.0, 0.5, 1.0, 9);
        let mut b = RandomWalkFeed::new(two_markets(), 100.0, 0.5, 1.0, 9);
        for ts in 0..50 {
            assert_eq!(a.next_trade(ts), b.next_trade(ts));
        }
    }

    #[test]
    fn test_random_walk_round_robin_and_positive() {
        let mut feed = RandomWalkFeed::new(two_markets(), 0.05, 1.0, 1.0, 3);
        for ts in 0..200u64 {
            let trade = feed.next_trade(ts).unwrap();
            assert_eq!(trade.market, MarketId::new((ts % 2) as u32));
            assert!(trade.validate().is_ok());
        }
    }

    #[test]
    fn test_empty_feed_ends() {
        let mut feed = RandomWalkFeed::new(Vec::new(), 100.0, 0.5, 1.0, 1);
        assert!(feed.next_trade(0).is_none());
    }

    #[test]
    fn test_venue_settles_fills() {
        let gateway = Arc::new(PaperGateway::new());
        let portfolio = Arc::new(PaperPortfolio::new(Portfolio::new(dec!(1000))));
        let venue = PaperVenue::new(
            gateway.clone(),
            portfolio.clone(),
            HashMap::from([(MarketId::new(0), AssetId::new(0))]),
        );

        tokio_test::block_on(gateway.submit(Order::new(
            MarketId::new(0),
            OrderSide::Buy,
            Price::new(dec!(99)),
            Quantity::new(2),
        )))
        .unwrap();

        let fills = venue.on_trade(&TradeEvent::new(MarketId::new(0), 98.0, 1));
        assert_eq!(fills.len(), 1);
        let snap = portfolio.snapshot();
        assert_eq!(snap.held(&AssetId::new(0)), 2);
        assert_eq!(snap.cash(), dec!(802));
    }
}
