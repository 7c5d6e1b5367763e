//! Estimation configuration.

use serde::{Deserialize, Serialize};

/// Configuration for price estimation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Two-sided confidence level of the price band (0 < c < 1).
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,

    /// EMA weight of the newest trade price (0 < λ < 1).
    #[serde(default = "default_ema_lambda")]
    pub ema_lambda: f64,

    /// EWMA volatility window m. Decay factor is 2 / (m + 1).
    #[serde(default = "default_ewma_window")]
    pub ewma_window: usize,

    /// Lower clamp for interval bounds. Prices cannot reach zero.
    #[serde(default = "default_min_price")]
    pub min_price: f64,

    /// TWAP lookback for the arbitrage detector, in milliseconds.
    #[serde(default = "default_twap_window_ms")]
    pub twap_window_ms: u64,
}

fn default_confidence_level() -> f64 {
    0.6
}
fn default_ema_lambda() -> f64 {
    0.2
}
fn default_ewma_window() -> usize {
    20
}
fn default_min_price() -> f64 {
    0.01
}
fn default_twap_window_ms() -> u64 {
    30_000 // 30 seconds
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            confidence_level: default_confidence_level(),
            ema_lambda: default_ema_lambda(),
            ewma_window: default_ewma_window(),
            min_price: default_min_price(),
            twap_window_ms: default_twap_window_ms(),
        }
    }
}

impl PricingConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(format!(
                "confidence_level ({}) must be in (0, 1)",
                self.confidence_level
            ));
        }
        if !(self.ema_lambda > 0.0 && self.ema_lambda < 1.0) {
            return Err(format!("ema_lambda ({}) must be in (0, 1)", self.ema_lambda));
        }
        if self.ewma_window == 0 {
            return Err("ewma_window must be a positive integer".to_string());
        }
        if !(self.min_price > 0.0 && self.min_price.is_finite()) {
            return Err(format!("min_price ({}) must be positive", self.min_price));
        }
        if self.twap_window_ms == 0 {
            return Err("twap_window_ms must be positive".to_string());
        }
        Ok(())
    }

    /// EWMA decay factor derived from the window.
    pub fn ewma_alpha(&self) -> f64 {
        2.0 / (self.ewma_window as f64 + 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PricingConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.confidence_level - 0.6).abs() < f64::EPSILON);
        assert_eq!(config.ewma_window, 20);
    }

    #[test]
    fn test_invalid_confidence_rejected() {
        let config = PricingConfig {
            confidence_level: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_lambda_rejected() {
        let config = PricingConfig {
            ema_lambda: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ewma_alpha() {
        let config = PricingConfig {
            ewma_window: 9,
            ..Default::default()
        };
        assert!((config.ewma_alpha() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_config_serde_defaults() {
        let toml_str = r#"
confidence_level = 0.8
"#;
        let config: PricingConfig = toml::from_str(toml_str).unwrap();
        assert!((config.confidence_level - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.ewma_window, 20);
    }
}
