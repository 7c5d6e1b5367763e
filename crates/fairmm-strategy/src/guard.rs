//! Economic sanity bound on order prices.
//!
//! Orders that violate the bound are rejected, never clamped: a clamped
//! price is one nobody decided on.

use std::fmt;

use fairmm_core::{Order, OrderSide};

use crate::config::StrategyConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GuardViolation {
    NonPositive { price: f64 },
    AboveMax { price: f64, max_price: f64 },
    BuyAboveFair { price: f64, limit: f64 },
    SellBelowFair { price: f64, limit: f64 },
}

impl GuardViolation {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NonPositive { .. } => "non_positive",
            Self::AboveMax { .. } => "above_max",
            Self::BuyAboveFair { .. } => "buy_above_fair",
            Self::SellBelowFair { .. } => "sell_below_fair",
        }
    }
}

impl fmt::Display for GuardViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositive { price } => write!(f, "price {price} is not positive"),
            Self::AboveMax { price, max_price } => {
                write!(f, "price {price} above max {max_price}")
            }
            Self::BuyAboveFair { price, limit } => {
                write!(f, "buy at {price} above fair limit {limit}")
            }
            Self::SellBelowFair { price, limit } => {
                write!(f, "sell at {price} below fair limit {limit}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PriceGuard {
    max_price: f64,
    margin: f64,
}

impl PriceGuard {
    pub fn new(max_price: f64, margin: f64) -> Self {
        Self { max_price, margin }
    }

    pub fn from_config(config: &StrategyConfig) -> Self {
        Self::new(config.max_price, config.sanity_margin)
    }

    pub fn check_price(
        &self,
        side: OrderSide,
        price: f64,
        fair_value: f64,
    ) -> Result<(), GuardViolation> {
        if !(price > 0.0) {
            return Err(GuardViolation::NonPositive { price });
        }
        if price > self.max_price {
            return Err(GuardViolation::AboveMax {
                price,
                max_price: self.max_price,
            });
        }
        match side {
            OrderSide::Buy => {
                let limit = fair_value + self.margin;
                if price > limit {
                    return Err(GuardViolation::BuyAboveFair { price, limit });
                }
            }
            OrderSide::Sell => {
                let limit = fair_value - self.margin;
                if price < limit {
                    return Err(GuardViolation::SellBelowFair { price, limit });
                }
            }
        }
        Ok(())
    }

    pub fn check(&self, order: &Order, fair_value: f64) -> Result<(), GuardViolation> {
        self.check_price(order.side, order.price.to_f64(), fair_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> PriceGuard {
        PriceGuard::new(1000.0, 0.5)
    }

    #[test]
    fn test_accepts_passive_prices() {
        assert!(guard().check_price(OrderSide::Buy, 99.0, 100.0).is_ok());
        assert!(guard().check_price(OrderSide::Sell, 101.0, 100.0).is_ok());
        // Within margin
        assert!(guard().check_price(OrderSide::Buy, 100.5, 100.0).is_ok());
        assert!(guard().check_price(OrderSide::Sell, 99.5, 100.0).is_ok());
    }

    #[test]
    fn test_rejects_crossing_fair_value() {
        assert!(matches!(
            guard().check_price(OrderSide::Buy, 100.6, 100.0),
            Err(GuardViolation::BuyAboveFair { .. })
        ));
        assert!(matches!(
            guard().check_price(OrderSide::Sell, 99.4, 100.0),
            Err(GuardViolation::SellBelowFair { .. })
        ));
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(matches!(
            guard().check_price(OrderSide::Buy, 0.0, 100.0),
            Err(GuardViolation::NonPositive { .. })
        ));
        assert!(matches!(
            guard().check_price(OrderSide::Sell, 1000.01, 999.0),
            Err(GuardViolation::AboveMax { .. })
        ));
        assert!(guard().check_price(OrderSide::Buy, f64::NAN, 100.0).is_err());
    }

    #[test]
    fn test_reason_labels() {
        let v = guard().check_price(OrderSide::Buy, -1.0, 1.0).unwrap_err();
        assert_eq!(v.reason(), "non_positive");
    }
}
