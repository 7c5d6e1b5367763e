//! Application error types.

use fairmm_core::MarketId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown market: {0}")]
    UnknownMarket(MarketId),

    #[error("Core error: {0}")]
    Core(#[from] fairmm_core::CoreError),

    #[error("Estimate error: {0}")]
    Estimate(#[from] fairmm_pricing::EstimateError),

    #[error("Strategy error: {0}")]
    Strategy(#[from] fairmm_strategy::StrategyError),

    #[error("Detector error: {0}")]
    Detector(#[from] fairmm_detector::DetectorError),

    #[error("Reconcile error: {0}")]
    Reconcile(#[from] fairmm_executor::ReconcileError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] fairmm_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
