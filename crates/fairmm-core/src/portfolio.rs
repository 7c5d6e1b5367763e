//! Portfolio holdings and cash.
//!
//! The core never mutates a portfolio on its own initiative: holdings only
//! change through [`Portfolio::apply_fill`], which the marketplace side calls
//! when an order fills. The scoring path works on cloned snapshots and on
//! [`Portfolio::with_trade`], which returns a hypothetical copy.

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AssetId, OrderSide, Price, Quantity};

/// Holdings per asset plus a cash balance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    holdings: HashMap<AssetId, i64>,
    cash: Decimal,
}

impl Portfolio {
    pub fn new(cash: Decimal) -> Self {
        Self {
            holdings: HashMap::new(),
            cash,
        }
    }

    pub fn with_holding(mut self, asset: AssetId, quantity: i64) -> Self {
        self.holdings.insert(asset, quantity);
        self
    }

    /// Held quantity (0 for unknown assets).
    pub fn held(&self, asset: &AssetId) -> i64 {
        self.holdings.get(asset).copied().unwrap_or(0)
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn cash_f64(&self) -> f64 {
        self.cash.to_f64().unwrap_or(0.0)
    }

    pub fn set_cash(&mut self, cash: Decimal) {
        self.cash = cash;
    }

    pub fn set_holding(&mut self, asset: AssetId, quantity: i64) {
        self.holdings.insert(asset, quantity);
    }

    pub fn holdings(&self) -> impl Iterator<Item = (&AssetId, &i64)> {
        self.holdings.iter()
    }

    /// Record a fill: holdings move by the signed quantity, cash by the
    /// opposite notional.
    pub fn apply_fill(
        &mut self,
        asset: AssetId,
        side: OrderSide,
        price: Price,
        quantity: Quantity,
    ) {
        let signed = side.sign() * quantity.as_i64();
        let notional = quantity.notional(price);

        *self.holdings.entry(asset).or_insert(0) += signed;
        match side {
            OrderSide::Buy => self.cash -= notional,
            OrderSide::Sell => self.cash += notional,
        }
    }

    /// A copy of this portfolio with a hypothetical trade applied.
    ///
    /// Price is `f64` because the scoring search evaluates prices that are not
    /// yet rounded to a tick.
    pub fn with_trade(
        &self,
        asset: AssetId,
        side: OrderSide,
        price: f64,
        quantity: u64,
    ) -> HypotheticalPortfolio {
        let signed = side.sign() * i64::try_from(quantity).unwrap_or(i64::MAX);
        let mut holdings = self.holdings.clone();
        if signed != 0 {
            *holdings.entry(asset).or_insert(0) += signed;
        }
        HypotheticalPortfolio {
            holdings,
            cash: self.cash_f64() - signed as f64 * price,
        }
    }

    /// Float view of this portfolio (no trade applied).
    pub fn as_hypothetical(&self) -> HypotheticalPortfolio {
        HypotheticalPortfolio {
            holdings: self.holdings.clone(),
            cash: self.cash_f64(),
        }
    }
}

/// Float-valued portfolio used by the scoring engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HypotheticalPortfolio {
    pub holdings: HashMap<AssetId, i64>,
    pub cash: f64,
}

impl HypotheticalPortfolio {
    pub fn held(&self, asset: &AssetId) -> i64 {
        self.holdings.get(asset).copied().unwrap_or(0)
    }
}
