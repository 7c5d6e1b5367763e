//! Market data event types.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::MarketId;

/// One observed trade.
///
/// The price is kept as `f64` because it feeds the estimator directly;
/// [`TradeEvent::validate`] rejects non-positive and non-finite prices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub market: MarketId,
    pub price: f64,
    /// Exchange timestamp (Unix milliseconds).
    pub timestamp_ms: u64,
}

impl TradeEvent {
    pub fn new(market: MarketId, price: f64, timestamp_ms: u64) -> Self {
        Self {
            market,
            price,
            timestamp_ms,
        }
    }

    /// Check that the trade price is usable.
    pub fn validate(&self) -> Result<()> {
        validate_price(self.price)
    }
}

/// Trade prices must be finite and strictly positive.
pub fn validate_price(price: f64) -> Result<()> {
    if !price.is_finite() {
        return Err(CoreError::InvalidPrice(format!("non-finite price {price}")));
    }
    if price <= 0.0 {
        return Err(CoreError::InvalidPrice(format!("non-positive price {price}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_price() {
        assert!(validate_price(100.0).is_ok());
        assert!(validate_price(0.0).is_err());
        assert!(validate_price(-1.0).is_err());
        assert!(validate_price(f64::NAN).is_err());
        assert!(validate_price(f64::INFINITY).is_err());
    }

    #[test]
    fn test_trade_event_validate() {
        let ev = TradeEvent::new(MarketId::new(1), 0.0, 1_000);
        assert!(ev.validate().is_err());
    }
}
