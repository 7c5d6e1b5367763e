//! Price estimation for fairmm.
//!
//! Turns a noisy trade stream into per-asset statistics:
//! - `PriceEstimator`: EMA fair value plus EWMA-rooted volatility
//! - `ConfidenceIntervalEngine`: Student-t band around the fair value
//! - `TwapTracker`: per-market time-weighted average price
//!
//! # Architecture
//!
//! ```text
//! TradeEvent → PriceEstimator.observe()  → PriceState (per asset)
//!                                           └─ ConfidenceIntervalEngine.interval()
//!            → TwapTracker.record()      → twap (per market, for arbitrage detection)
//! ```

pub mod config;
pub mod error;
pub mod estimator;
pub mod interval;
pub mod student_t;
pub mod twap;

pub use config::PricingConfig;
pub use error::{EstimateError, EstimateResult};
pub use estimator::{PriceEstimator, PriceState, VOLATILITY_FLOOR};
pub use interval::{ConfidenceIntervalEngine, PriceInterval};
pub use twap::TwapTracker;
