//! Per-market time-weighted average price.
//!
//! Each trade price is held "in force" until the next trade. The TWAP over
//! `[now - window, now]` weights every price by how long it was in force
//! inside that window, so a single outlier trade followed quickly by a
//! normal one barely moves it.

use std::collections::{HashMap, VecDeque};

use fairmm_core::MarketId;

#[derive(Debug, Clone, Copy)]
struct Sample {
    ts_ms: u64,
    price: f64,
}

#[derive(Debug, Default)]
struct MarketTwapState {
    samples: VecDeque<Sample>,
}

impl MarketTwapState {
    /// Drop samples that ended before the window, keeping the one in force
    /// at the window start.
    fn prune(&mut self, window_start: u64) {
        while self.samples.len() >= 2 && self.samples[1].ts_ms <= window_start {
            self.samples.pop_front();
        }
    }
}

/// Rolling TWAP per market.
#[derive(Debug)]
pub struct TwapTracker {
    markets: HashMap<MarketId, MarketTwapState>,
    window_ms: u64,
}

impl TwapTracker {
    pub fn new(window_ms: u64) -> Self {
        Self {
            markets: HashMap::new(),
            window_ms: window_ms.max(1),
        }
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Record a trade price.
    ///
    /// Out-of-order timestamps are clamped to the latest seen so the
    /// sample sequence stays monotonic. Callers validate the price.
    pub fn record(&mut self, market: MarketId, price: f64, ts_ms: u64) {
        let state = self.markets.entry(market).or_default();
        let ts_ms = state
            .samples
            .back()
            .map_or(ts_ms, |last| ts_ms.max(last.ts_ms));

        state.samples.push_back(Sample { ts_ms, price });
        state.prune(ts_ms.saturating_sub(self.window_ms));
    }

    /// TWAP over `[now - window, now]`.
    ///
    /// Returns the latest price when no time has elapsed inside the window
    /// (e.g. all samples share `now`), and `None` for unknown markets.
    pub fn twap(&self, market: &MarketId, now_ms: u64) -> Option<f64> {
        let state = self.markets.get(market)?;
        let last = state.samples.back()?;
        let window_start = now_ms.saturating_sub(self.window_ms);

        let mut weighted = 0.0;
        let mut total = 0u64;
        let mut iter = state.samples.iter().peekable();
        while let Some(sample) = iter.next() {
            if sample.ts_ms >= now_ms {
                break;
            }
            let end = iter.peek().map_or(now_ms, |next| next.ts_ms.min(now_ms));
            let start = sample.ts_ms.max(window_start);
            if end > start {
                let dur = end - start;
                weighted += sample.price * dur as f64;
                total += dur;
            }
        }

        if total == 0 {
            Some(last.price)
        } else {
            Some(weighted / total as f64)
        }
    }

    pub fn last_price(&self, market: &MarketId) -> Option<f64> {
        self.markets
            .get(market)
            .and_then(|s| s.samples.back())
            .map(|s| s.price)
    }

    pub fn sample_count(&self, market: &MarketId) -> usize {
        self.markets.get(market).map_or(0, |s| s.samples.len())
    }
}
