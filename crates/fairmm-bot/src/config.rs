//! Application configuration.

use std::collections::{HashMap, HashSet};

use fairmm_core::{Asset, AssetId, Market, MarketId};
use fairmm_detector::DetectorConfig;
use fairmm_executor::ReconcilerConfig;
use fairmm_pricing::PricingConfig;
use fairmm_strategy::StrategyConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// One tradable asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    /// Target holding.
    #[serde(default)]
    pub optimal: i64,
    /// Holding at startup (paper portfolio).
    #[serde(default)]
    pub initial_holding: i64,
}

impl AssetConfig {
    pub fn asset_id(&self) -> AssetId {
        AssetId::new(self.id)
    }

    pub fn to_asset(&self) -> Asset {
        Asset {
            id: self.asset_id(),
            name: self.name.clone(),
            optimal: self.optimal,
        }
    }
}

/// Simulated marketplace parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperConfig {
    /// Seed for the random-walk trade generator.
    #[serde(default = "default_feed_seed")]
    pub seed: u64,
    /// Time between simulated trades (ms).
    #[serde(default = "default_trade_interval_ms")]
    pub trade_interval_ms: u64,
    /// Starting price of every asset.
    #[serde(default = "default_initial_price")]
    pub initial_price: f64,
    /// Largest single move of an asset's underlying price.
    #[serde(default = "default_step")]
    pub step: f64,
    /// Largest per-market deviation from the underlying price.
    #[serde(default = "default_market_noise")]
    pub market_noise: f64,
    /// Cash at startup.
    #[serde(default = "default_initial_cash")]
    pub initial_cash: Decimal,
}

fn default_feed_seed() -> u64 {
    42
}
fn default_trade_interval_ms() -> u64 {
    100
}
fn default_initial_price() -> f64 {
    100.0
}
fn default_step() -> f64 {
    0.25
}
fn default_market_noise() -> f64 {
    1.5
}
fn default_initial_cash() -> Decimal {
    Decimal::new(10_000, 0)
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            seed: default_feed_seed(),
            trade_interval_ms: default_trade_interval_ms(),
            initial_price: default_initial_price(),
            step: default_step(),
            market_noise: default_market_noise(),
            initial_cash: default_initial_cash(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Trading interval length (ms).
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// How often a metrics snapshot is logged (0 = never).
    #[serde(default = "default_metrics_log_interval_secs")]
    pub metrics_log_interval_secs: u64,

    /// Seed for side tie-breaks. Unset draws from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default)]
    pub assets: Vec<AssetConfig>,

    #[serde(default)]
    pub markets: Vec<Market>,

    #[serde(default)]
    pub pricing: PricingConfig,

    #[serde(default)]
    pub strategy: StrategyConfig,

    #[serde(default)]
    pub detector: DetectorConfig,

    #[serde(default)]
    pub reconciler: ReconcilerConfig,

    #[serde(default)]
    pub paper: PaperConfig,
}

fn default_interval_ms() -> u64 {
    1_000
}
fn default_metrics_log_interval_secs() -> u64 {
    60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            metrics_log_interval_secs: default_metrics_log_interval_secs(),
            seed: None,
            assets: Vec::new(),
            markets: Vec::new(),
            pricing: PricingConfig::default(),
            strategy: StrategyConfig::default(),
            detector: DetectorConfig::default(),
            reconciler: ReconcilerConfig::default(),
            paper: PaperConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config {path}: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Validate every section plus the asset / market / pair wiring.
    pub fn validate(&self) -> AppResult<()> {
        if self.interval_ms == 0 {
            return Err(AppError::Config("interval_ms must be positive".to_string()));
        }
        self.pricing.validate().map_err(AppError::Config)?;
        self.strategy.validate().map_err(AppError::Config)?;
        self.detector.validate().map_err(AppError::Config)?;
        self.reconciler.validate().map_err(AppError::Config)?;

        if self.assets.is_empty() {
            return Err(AppError::Config("at least one asset is required".to_string()));
        }
        let mut asset_ids = HashSet::new();
        for asset in &self.assets {
            if !asset_ids.insert(asset.asset_id()) {
                return Err(AppError::Config(format!(
                    "duplicate asset {}",
                    asset.asset_id()
                )));
            }
        }

        let mut market_assets = HashMap::new();
        for market in &self.markets {
            if !asset_ids.contains(&market.asset) {
                return Err(AppError::Config(format!(
                    "market {} quotes unknown asset {}",
                    market.id, market.asset
                )));
            }
            if !market.tick_size.is_positive() {
                return Err(AppError::Config(format!(
                    "market {} tick_size must be positive",
                    market.id
                )));
            }
            if market_assets.insert(market.id, market.asset).is_some() {
                return Err(AppError::Config(format!("duplicate market {}", market.id)));
            }
        }

        for pair in &self.detector.pairs {
            let primary = market_assets.get(&pair.primary);
            let secondary = market_assets.get(&pair.secondary);
            match (primary, secondary) {
                (Some(a), Some(b)) if a == b => {}
                (Some(_), Some(_)) => {
                    return Err(AppError::Config(format!(
                        "pair {} spans two different assets",
                        pair.label()
                    )))
                }
                _ => {
                    return Err(AppError::Config(format!(
                        "pair {} references an unknown market",
                        pair.label()
                    )))
                }
            }
        }
        Ok(())
    }

    pub fn market_ids(&self) -> Vec<MarketId> {
        self.markets.iter().map(|m| m.id).collect()
    }

    /// Asset quoted by each market.
    pub fn market_assets(&self) -> HashMap<MarketId, AssetId> {
        self.markets.iter().map(|m| (m.id, m.asset)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairmm_core::Price;
    use fairmm_detector::MarketPair;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = r#"
interval_ms = 500
seed = 7

[[assets]]
id = 0
name = "WIDGET"
optimal = 10

[[markets]]
id = 0
asset = 0

[[markets]]
id = 1
asset = 0
tick_size = "0.05"

[pricing]
confidence_level = 0.8

[strategy]
kind = "noise_trader"

[detector]
arbitrage_threshold = 2.0

[[detector.pairs]]
primary = 0
secondary = 1
"#;

    fn sample() -> AppConfig {
        AppConfig::from_toml(SAMPLE).unwrap()
    }

    #[test]
    fn test_parse_sample() {
        let config = sample();
        assert_eq!(config.interval_ms, 500);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.assets[0].optimal, 10);
        assert_eq!(config.markets[0].tick_size, Price::new(dec!(0.01)));
        assert_eq!(config.markets[1].tick_size, Price::new(dec!(0.05)));
        assert!((config.pricing.confidence_level - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.pricing.ewma_window, 20);
        assert_eq!(config.paper.initial_cash, dec!(10000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_requires_assets() {
        let config = AppConfig::default();
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_market_with_unknown_asset_rejected() {
        let mut config = sample();
        config.markets.push(Market::new(MarketId::new(5), AssetId::new(9)));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pair_across_assets_rejected() {
        let mut config = sample();
        config.assets.push(AssetConfig {
            id: 1,
            name: String::new(),
            optimal: 0,
            initial_holding: 0,
        });
        config
            .markets
            .push(Market::new(MarketId::new(2), AssetId::new(1)));
        config.detector.pairs = vec![MarketPair::new(MarketId::new(0), MarketId::new(2))];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("different assets"));
    }

    #[test]
    fn test_invalid_section_rejected() {
        let mut config = sample();
        config.pricing.confidence_level = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_market_assets() {
        let map = sample().market_assets();
        assert_eq!(map.get(&MarketId::new(1)), Some(&AssetId::new(0)));
    }
}
