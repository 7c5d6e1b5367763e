//! Detector error types.

use fairmm_core::MarketId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Market {0} appears in more than one pair")]
    DuplicateMarket(MarketId),
}

pub type DetectorResult<T> = Result<T, DetectorError>;
