//! Estimation error types.

use fairmm_core::{AssetId, CoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EstimateError {
    /// Observation rejected; estimator state left untouched.
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] CoreError),

    /// Interval collapsed to zero width (too few samples or zero volatility).
    #[error("Degenerate estimate for {asset}: {reason}")]
    DegenerateEstimate { asset: AssetId, reason: String },

    #[error("No price state for {0}")]
    UnknownAsset(AssetId),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type EstimateResult<T> = Result<T, EstimateError>;
