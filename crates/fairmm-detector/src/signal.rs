//! Arbitrage signal types.

use fairmm_core::{MarketId, OrderSide};
use serde::{Deserialize, Serialize};

use crate::config::MarketPair;

/// One pair currently in the active state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveArbitrage {
    pub pair: MarketPair,
    /// Market with the lower TWAP (buy here).
    pub cheap: MarketId,
    /// Market with the higher TWAP (sell here).
    pub dear: MarketId,
    pub divergence: f64,
    pub since_ms: u64,
}

impl ActiveArbitrage {
    pub fn side_for(&self, market: &MarketId) -> Option<OrderSide> {
        if *market == self.cheap {
            Some(OrderSide::Buy)
        } else if *market == self.dear {
            Some(OrderSide::Sell)
        } else {
            None
        }
    }
}

/// Result of one detector evaluation, read at the start of an interval.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageSignal {
    pub active: Vec<ActiveArbitrage>,
    pub evaluated_at_ms: u64,
}

impl ArbitrageSignal {
    pub fn idle(evaluated_at_ms: u64) -> Self {
        Self {
            active: Vec::new(),
            evaluated_at_ms,
        }
    }

    /// True while any pair is active; routine quoting is suspended.
    pub fn any_active(&self) -> bool {
        !self.active.is_empty()
    }

    /// Side a market must trade while its pair is active.
    pub fn forced_side(&self, market: &MarketId) -> Option<OrderSide> {
        self.active.iter().find_map(|a| a.side_for(market))
    }

    pub fn is_affected(&self, market: &MarketId) -> bool {
        self.forced_side(market).is_some()
    }
}
