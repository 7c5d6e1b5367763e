//! Quantity and cash already spoken for within one interval.
//!
//! Markets quoting the same asset share one holding and every market shares
//! one cash balance. The budget tracks, per market, the orders that will be
//! live after this interval (resting orders until the market is planned,
//! then its new candidates) so each market is sized and cash-checked net of
//! what the others have committed.

use std::collections::HashMap;

use fairmm_core::{AssetId, MarketId, Order, OrderSide};
use rust_decimal::Decimal;

/// What other markets have committed, as seen by one market.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Committed {
    /// Buy quantity on other markets quoting the same asset.
    pub buy_quantity: u64,
    /// Sell quantity on other markets quoting the same asset.
    pub sell_quantity: u64,
    /// Buy notional across every other market.
    pub buy_notional: Decimal,
}

impl Committed {
    pub fn none() -> Self {
        Self::default()
    }

    /// Signed quantity the committed orders would add to the holding.
    pub fn net_quantity(&self) -> i64 {
        let buys = i64::try_from(self.buy_quantity).unwrap_or(i64::MAX);
        let sells = i64::try_from(self.sell_quantity).unwrap_or(i64::MAX);
        buys.saturating_sub(sells)
    }

    /// Inventory left to sell after the committed sells.
    pub fn sellable(&self, held: i64) -> i64 {
        held.saturating_sub(i64::try_from(self.sell_quantity).unwrap_or(i64::MAX))
    }

    pub fn is_empty(&self) -> bool {
        self.buy_quantity == 0 && self.sell_quantity == 0
    }
}

#[derive(Debug, Clone)]
struct MarketCommitment {
    asset: AssetId,
    orders: Vec<Order>,
}

/// Per-interval ledger of committed orders by market.
#[derive(Debug, Clone, Default)]
pub struct IntervalBudget {
    markets: HashMap<MarketId, MarketCommitment>,
}

impl IntervalBudget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a market's committed orders.
    pub fn set(&mut self, market: MarketId, asset: AssetId, orders: Vec<Order>) {
        self.markets.insert(market, MarketCommitment { asset, orders });
    }

    /// Commitments of every market except `market`.
    pub fn excluding(&self, market: &MarketId, asset: &AssetId) -> Committed {
        let mut committed = Committed::none();
        for (id, entry) in &self.markets {
            if id == market {
                continue;
            }
            for order in &entry.orders {
                match order.side {
                    OrderSide::Buy => {
                        committed.buy_notional += order.quantity.notional(order.price);
                        if entry.asset == *asset {
                            committed.buy_quantity += order.quantity.units();
                        }
                    }
                    OrderSide::Sell => {
                        if entry.asset == *asset {
                            committed.sell_quantity += order.quantity.units();
                        }
                    }
                }
            }
        }
        committed
    }
}
