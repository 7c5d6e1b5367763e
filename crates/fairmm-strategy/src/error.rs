//! Strategy error types.

use fairmm_core::{AssetId, CoreError, MarketId};
use fairmm_pricing::EstimateError;
use thiserror::Error;

/// Errors that skip one market's plan for the current interval.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("No price state for {0}")]
    MissingPriceState(AssetId),

    #[error("Market {market} quotes {asset}, which is not configured")]
    UnknownAsset { market: MarketId, asset: AssetId },

    #[error("Estimate error: {0}")]
    Estimate(#[from] EstimateError),

    #[error("Price conversion error: {0}")]
    Price(#[from] CoreError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type StrategyResult<T> = Result<T, StrategyError>;
