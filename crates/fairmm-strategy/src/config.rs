//! Strategy configuration.

use serde::{Deserialize, Serialize};

/// Which pricing rule OpportunitySearch applies.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Quote at the interval bound: buy at `lower`, sell at `upper`.
    NoiseTrader,
    /// Bisect for the price nearest the mean that still improves the score.
    #[default]
    StatArb,
    /// Interval bound, accepted only if it clears the profit margin.
    SingleAssetArb,
    /// Single-asset arbitrage that trades at the market's last observed
    /// price when that price is at least the profit margin away from fair.
    ReactiveArb,
}

impl StrategyKind {
    /// Whether orders are priced off the last trade instead of resting at
    /// the interval bound.
    pub fn is_reactive(&self) -> bool {
        matches!(self, Self::ReactiveArb)
    }
}

/// Strategy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    #[serde(default)]
    pub kind: StrategyKind,

    /// Weight of the variance penalty in the portfolio score.
    #[serde(default = "default_risk_weight")]
    pub risk_weight: f64,

    /// Minimum distance from fair value for single-asset arbitrage.
    #[serde(default = "default_profit_margin")]
    pub profit_margin: f64,

    /// Extra margin multiplier at session start, decaying to 0 at session end.
    /// 0 keeps the margin at `profit_margin` throughout.
    #[serde(default)]
    pub initial_aggression: f64,

    /// Session length used by the aggression decay.
    #[serde(default = "default_session_length_secs")]
    pub session_length_secs: u64,

    /// Cap on a single order's quantity.
    #[serde(default = "default_max_order_quantity")]
    pub max_order_quantity: u64,

    /// Quantity used when holding already equals the target.
    #[serde(default = "default_base_quantity")]
    pub base_quantity: u64,

    /// Allow sells that take holdings below zero.
    #[serde(default)]
    pub allow_short: bool,

    /// Hard upper bound on any order price.
    #[serde(default = "default_max_price")]
    pub max_price: f64,

    /// How far past fair value an order may sit before the guard rejects it.
    /// Buys above `fair + sanity_margin` and sells below `fair - sanity_margin`
    /// are never submitted.
    #[serde(default)]
    pub sanity_margin: f64,

    /// Upper bound, in ticks, of the random offset used when the confidence
    /// interval is degenerate.
    #[serde(default = "default_fallback_max_ticks")]
    pub fallback_max_ticks: u32,
}

fn default_risk_weight() -> f64 {
    0.001
}
fn default_profit_margin() -> f64 {
    10.0
}
fn default_session_length_secs() -> u64 {
    900 // 15 minutes
}
fn default_max_order_quantity() -> u64 {
    10
}
fn default_base_quantity() -> u64 {
    1
}
fn default_max_price() -> f64 {
    1000.0
}
fn default_fallback_max_ticks() -> u32 {
    5
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            kind: StrategyKind::default(),
            risk_weight: default_risk_weight(),
            profit_margin: default_profit_margin(),
            initial_aggression: 0.0,
            session_length_secs: default_session_length_secs(),
            max_order_quantity: default_max_order_quantity(),
            base_quantity: default_base_quantity(),
            allow_short: false,
            max_price: default_max_price(),
            sanity_margin: 0.0,
            fallback_max_ticks: default_fallback_max_ticks(),
        }
    }
}

impl StrategyConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.risk_weight >= 0.0 && self.risk_weight.is_finite()) {
            return Err(format!(
                "risk_weight ({}) must be non-negative",
                self.risk_weight
            ));
        }
        if !(self.profit_margin >= 0.0 && self.profit_margin.is_finite()) {
            return Err(format!(
                "profit_margin ({}) must be non-negative",
                self.profit_margin
            ));
        }
        if !(self.initial_aggression >= 0.0 && self.initial_aggression.is_finite()) {
            return Err(format!(
                "initial_aggression ({}) must be non-negative",
                self.initial_aggression
            ));
        }
        if self.max_order_quantity == 0 || self.base_quantity == 0 {
            return Err("max_order_quantity and base_quantity must be positive".to_string());
        }
        if self.base_quantity > self.max_order_quantity {
            return Err(format!(
                "base_quantity ({}) must not exceed max_order_quantity ({})",
                self.base_quantity, self.max_order_quantity
            ));
        }
        if !(self.max_price > 0.0 && self.max_price.is_finite()) {
            return Err(format!("max_price ({}) must be positive", self.max_price));
        }
        if !(self.sanity_margin >= 0.0 && self.sanity_margin.is_finite()) {
            return Err(format!(
                "sanity_margin ({}) must be non-negative",
                self.sanity_margin
            ));
        }
        if self.fallback_max_ticks == 0 {
            return Err("fallback_max_ticks must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = StrategyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.kind, StrategyKind::StatArb);
        assert_eq!(config.max_price, 1000.0);
    }

    #[test]
    fn test_negative_risk_weight_rejected() {
        let config = StrategyConfig {
            risk_weight: -0.1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_base_above_max_rejected() {
        let config = StrategyConfig {
            base_quantity: 20,
            max_order_quantity: 5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_kind_from_toml() {
        let toml_str = r#"
kind = "noise_trader"
risk_weight = 0.05
"#;
        let config: StrategyConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.kind, StrategyKind::NoiseTrader);
        assert!((config.risk_weight - 0.05).abs() < f64::EPSILON);
        assert_eq!(config.max_order_quantity, 10);
    }

    #[test]
    fn test_reactive_kind_from_toml() {
        let config: StrategyConfig = toml::from_str(r#"kind = "reactive_arb""#).unwrap();
        assert!(config.kind.is_reactive());
        assert!(!StrategyKind::SingleAssetArb.is_reactive());
    }
}
