//! Detector configuration.

use std::collections::HashSet;

use fairmm_core::MarketId;
use serde::{Deserialize, Serialize};

use crate::error::{DetectorError, DetectorResult};

/// Two markets quoting the same underlying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarketPair {
    pub primary: MarketId,
    pub secondary: MarketId,
}

impl MarketPair {
    pub fn new(primary: MarketId, secondary: MarketId) -> Self {
        Self { primary, secondary }
    }

    pub fn contains(&self, market: &MarketId) -> bool {
        self.primary == *market || self.secondary == *market
    }

    /// Metric label, e.g. `mkt:0-mkt:1`.
    pub fn label(&self) -> String {
        format!("{}-{}", self.primary, self.secondary)
    }
}

/// Configuration for arbitrage detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Divergence (price units) above which a pair activates.
    #[serde(default = "default_arbitrage_threshold")]
    pub arbitrage_threshold: f64,

    /// An active pair deactivates only below `threshold - hysteresis`.
    #[serde(default = "default_arbitrage_hysteresis")]
    pub arbitrage_hysteresis: f64,

    /// Active pairs resolve after this long (0 = never expire).
    #[serde(default = "default_max_active_ms")]
    pub max_active_ms: u64,

    #[serde(default)]
    pub pairs: Vec<MarketPair>,
}

fn default_arbitrage_threshold() -> f64 {
    2.0
}
fn default_arbitrage_hysteresis() -> f64 {
    0.5
}
fn default_max_active_ms() -> u64 {
    60_000 // 1 minute
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            arbitrage_threshold: default_arbitrage_threshold(),
            arbitrage_hysteresis: default_arbitrage_hysteresis(),
            max_active_ms: default_max_active_ms(),
            pairs: Vec::new(),
        }
    }
}

impl DetectorConfig {
    /// Validate configuration values.
    ///
    /// Returns Err if:
    /// - arbitrage_threshold < 0
    /// - arbitrage_hysteresis < 0 or > arbitrage_threshold
    pub fn validate(&self) -> Result<(), String> {
        if !(self.arbitrage_threshold >= 0.0 && self.arbitrage_threshold.is_finite()) {
            return Err(format!(
                "arbitrage_threshold ({}) must be non-negative",
                self.arbitrage_threshold
            ));
        }
        if !(self.arbitrage_hysteresis >= 0.0) {
            return Err(format!(
                "arbitrage_hysteresis ({}) must be non-negative",
                self.arbitrage_hysteresis
            ));
        }
        if self.arbitrage_hysteresis > self.arbitrage_threshold {
            return Err(format!(
                "arbitrage_hysteresis ({}) must not exceed arbitrage_threshold ({})",
                self.arbitrage_hysteresis, self.arbitrage_threshold
            ));
        }
        self.check_pairs().map_err(|e| e.to_string())
    }

    /// Each pair needs two distinct markets, and a market may belong to
    /// one pair only (its forced side would otherwise be ambiguous).
    pub fn check_pairs(&self) -> DetectorResult<()> {
        let mut seen = HashSet::new();
        for pair in &self.pairs {
            if pair.primary == pair.secondary {
                return Err(DetectorError::ConfigError(format!(
                    "pair {} uses the same market twice",
                    pair.label()
                )));
            }
            for market in [pair.primary, pair.secondary] {
                if !seen.insert(market) {
                    return Err(DetectorError::DuplicateMarket(market));
                }
            }
        }
        Ok(())
    }

    /// Divergence below which an active pair deactivates.
    pub fn deactivation_threshold(&self) -> f64 {
        self.arbitrage_threshold - self.arbitrage_hysteresis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(a: u32, b: u32) -> MarketPair {
        MarketPair::new(MarketId::new(a), MarketId::new(b))
    }

    #[test]
    fn test_default_config() {
        let config = DetectorConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.deactivation_threshold() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_hysteresis_above_threshold_rejected() {
        let config = DetectorConfig {
            arbitrage_threshold: 1.0,
            arbitrage_hysteresis: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_market_rejected() {
        let config = DetectorConfig {
            pairs: vec![pair(0, 1), pair(1, 2)],
            ..Default::default()
        };
        assert!(matches!(
            config.check_pairs(),
            Err(DetectorError::DuplicateMarket(m)) if m == MarketId::new(1)
        ));
    }

    #[test]
    fn test_self_pair_rejected() {
        let config = DetectorConfig {
            pairs: vec![pair(3, 3)],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pairs_from_toml() {
        let toml_str = r#"
arbitrage_threshold = 3.0

[[pairs]]
primary = 0
secondary = 1
"#;
        let config: DetectorConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.pairs, vec![pair(0, 1)]);
        assert!((config.arbitrage_hysteresis - 0.5).abs() < f64::EPSILON);
    }
}
