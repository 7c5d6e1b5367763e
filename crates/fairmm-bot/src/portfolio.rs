//! Portfolio access.
//!
//! The engine reads holdings and cash through [`PortfolioView`] and never
//! writes them; fills update whatever backs the view (the paper venue here).

use std::collections::HashMap;

use fairmm_core::{AssetId, Fill, Portfolio};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::AppConfig;

/// Read-only view of holdings and cash.
pub trait PortfolioView: Send + Sync {
    fn current_holdings(&self) -> HashMap<AssetId, i64>;

    fn cash_balance(&self) -> Decimal;

    /// Owned copy for one interval's score context.
    fn snapshot(&self) -> Portfolio {
        self.current_holdings()
            .into_iter()
            .fold(Portfolio::new(self.cash_balance()), |p, (asset, qty)| {
                p.with_holding(asset, qty)
            })
    }
}

/// In-memory portfolio updated by paper fills.
#[derive(Debug)]
pub struct PaperPortfolio {
    inner: RwLock<Portfolio>,
}

impl PaperPortfolio {
    pub fn new(portfolio: Portfolio) -> Self {
        Self {
            inner: RwLock::new(portfolio),
        }
    }

    /// Starting cash and holdings from configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        let portfolio = config
            .assets
            .iter()
            .fold(Portfolio::new(config.paper.initial_cash), |p, a| {
                p.with_holding(a.asset_id(), a.initial_holding)
            });
        Self::new(portfolio)
    }

    pub fn apply_fill(&self, asset: AssetId, fill: &Fill) {
        let mut portfolio = self.inner.write();
        portfolio.apply_fill(asset, fill.side, fill.price, fill.quantity);
        debug!(
            %asset,
            side = %fill.side,
            price = %fill.price,
            quantity = %fill.quantity,
            held = portfolio.held(&asset),
            cash = %portfolio.cash(),
            "Portfolio updated"
        );
    }
}

impl PortfolioView for PaperPortfolio {
    fn current_holdings(&self) -> HashMap<AssetId, i64> {
        self.inner
            .read()
            .holdings()
            .map(|(asset, qty)| (*asset, *qty))
            .collect()
    }

    fn cash_balance(&self) -> Decimal {
        self.inner.read().cash()
    }

    fn snapshot(&self) -> Portfolio {
        self.inner.read().clone()
    }
}
