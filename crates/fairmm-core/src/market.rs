//! Asset and market identification.
//!
//! An asset is the underlying instrument; a market is a venue quoting one
//! asset. Several markets may quote the same asset, which is what the
//! arbitrage detector watches.

use crate::Price;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Asset identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub u32);

impl AssetId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset:{}", self.0)
    }
}

/// Market identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketId(pub u32);

impl MarketId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mkt:{}", self.0)
    }
}

/// A tradable asset and the holding the strategy steers toward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    /// Human readable name (e.g. "WIDGET").
    #[serde(default)]
    pub name: String,
    /// Target holding. Below it the strategy leans to buying, above it to selling.
    #[serde(default)]
    pub optimal: i64,
}

impl Asset {
    pub fn new(id: AssetId, optimal: i64) -> Self {
        Self {
            id,
            name: String::new(),
            optimal,
        }
    }
}

/// A market quoting one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,
    pub asset: AssetId,
    /// Minimum price increment.
    #[serde(default = "default_tick_size")]
    pub tick_size: Price,
}

fn default_tick_size() -> Price {
    Price::new(dec!(0.01))
}

impl Market {
    pub fn new(id: MarketId, asset: AssetId) -> Self {
        Self {
            id,
            asset,
            tick_size: default_tick_size(),
        }
    }

    pub fn with_tick_size(mut self, tick_size: Price) -> Self {
        self.tick_size = tick_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(AssetId::new(3).to_string(), "asset:3");
        assert_eq!(MarketId::new(7).to_string(), "mkt:7");
    }

    #[test]
    fn test_market_default_tick() {
        let market = Market::new(MarketId::new(1), AssetId::new(1));
        assert_eq!(market.tick_size, Price::new(dec!(0.01)));
    }
}
