//! EMA fair value and EWMA volatility per asset.
//!
//! On each trade price `p` for an asset:
//!
//! ```text
//! u        = p - mean_prev
//! mean     = λ·p + (1 - λ)·mean_prev
//! variance = α·u² + (1 - α)·variance_prev      α = 2 / (m + 1)
//! vol      = max(√variance, VOLATILITY_FLOOR)
//! ```
//!
//! The volatility is a fixed-decay EWMA (not a rolling window of the last
//! `m` residuals): `m` only sets the decay factor, so memory is constant.
//! The first observation seeds `mean = p` with zero volatility.

use std::collections::HashMap;

use fairmm_core::types::validate_price;
use fairmm_core::AssetId;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::PricingConfig;
use crate::error::EstimateResult;

/// Smallest volatility reported once an asset has two or more samples.
///
/// Keeps every downstream `x / volatility` finite when the trade stream is
/// perfectly flat.
pub const VOLATILITY_FLOOR: f64 = 1e-8;

/// Smoothed price statistics for one asset.
///
/// Only [`PriceEstimator`] advances a state; everyone else reads copies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceState {
    mean: f64,
    variance: f64,
    volatility: f64,
    sample_count: u64,
    last_price: f64,
}

impl PriceState {
    fn seed(price: f64) -> Self {
        Self {
            mean: price,
            variance: 0.0,
            volatility: 0.0,
            sample_count: 1,
            last_price: price,
        }
    }

    /// Build a state from known statistics (snapshots, replays, tests).
    pub fn from_parts(mean: f64, volatility: f64, sample_count: u64) -> Self {
        let volatility = volatility.max(0.0);
        Self {
            mean,
            variance: volatility * volatility,
            volatility,
            sample_count,
            last_price: mean,
        }
    }

    fn update(&mut self, price: f64, lambda: f64, alpha: f64) {
        let residual = price - self.mean;
        self.mean = lambda * price + (1.0 - lambda) * self.mean;
        self.variance = alpha * residual * residual + (1.0 - alpha) * self.variance;
        self.volatility = self.variance.sqrt().max(VOLATILITY_FLOOR);
        self.sample_count += 1;
        self.last_price = price;
    }

    /// EMA fair value estimate.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// EWMA-rooted volatility (never negative).
    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// Degrees of freedom for the Student-t band: `max(n - 1, 1)`.
    pub fn degrees_of_freedom(&self) -> f64 {
        self.sample_count.saturating_sub(1).max(1) as f64
    }

    pub fn last_price(&self) -> f64 {
        self.last_price
    }
}

/// Per-asset price state table.
#[derive(Debug)]
pub struct PriceEstimator {
    states: HashMap<AssetId, PriceState>,
    lambda: f64,
    alpha: f64,
}

impl PriceEstimator {
    pub fn new(config: &PricingConfig) -> Self {
        Self {
            states: HashMap::new(),
            lambda: config.ema_lambda,
            alpha: config.ewma_alpha(),
        }
    }

    /// Record one trade price for an asset.
    ///
    /// Non-positive or non-finite prices are rejected and leave the state
    /// untouched.
    pub fn observe(&mut self, asset: AssetId, price: f64) -> EstimateResult<PriceState> {
        validate_price(price)?;

        let state = match self.states.get_mut(&asset) {
            Some(state) => {
                state.update(price, self.lambda, self.alpha);
                *state
            }
            None => {
                debug!(%asset, price, "First observation, seeding price state");
                let state = PriceState::seed(price);
                self.states.insert(asset, state);
                state
            }
        };

        trace!(
            %asset,
            price,
            mean = state.mean,
            volatility = state.volatility,
            samples = state.sample_count,
            "Price state updated"
        );
        Ok(state)
    }

    pub fn get(&self, asset: &AssetId) -> Option<&PriceState> {
        self.states.get(asset)
    }

    /// Copy of every state, for an interval's score context.
    pub fn snapshot(&self) -> HashMap<AssetId, PriceState> {
        self.states.clone()
    }

    pub fn sample_count(&self, asset: &AssetId) -> u64 {
        self.states.get(asset).map(|s| s.sample_count).unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AssetId, &PriceState)> {
        self.states.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EstimateError;

    fn asset() -> AssetId {
        AssetId::new(0)
    }

    fn asset2() -> AssetId {
        AssetId::new(1)
    }

    fn estimator() -> PriceEstimator {
        PriceEstimator::new(&PricingConfig {
            ema_lambda: 0.5,
            ewma_window: 3, // alpha = 0.5
            ..Default::default()
        })
    }

    #[test]
    fn test_first_observation_seeds_mean() {
        let mut est = estimator();
        let state = est.observe(asset(), 100.0).unwrap();

        assert_eq!(state.mean(), 100.0);
        assert_eq!(state.volatility(), 0.0);
        assert_eq!(state.sample_count(), 1);
    }

    #[test]
    fn test_ema_and_ewma_update() {
        let mut est = estimator();
        est.observe(asset(), 100.0).unwrap();
        let state = est.observe(asset(), 110.0).unwrap();

        // mean = 0.5*110 + 0.5*100 = 105
        assert!((state.mean() - 105.0).abs() < 1e-12);
        // variance = 0.5 * 10² = 50, vol = √50
        assert!((state.volatility() - 50.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(state.sample_count(), 2);
    }

    #[test]
    fn test_residual_uses_previous_mean() {
        let mut est = estimator();
        est.observe(asset(), 100.0).unwrap();
        est.observe(asset(), 110.0).unwrap(); // mean 105, var 50
        let state = est.observe(asset(), 105.0).unwrap();

        // residual = 105 - 105 = 0 → var = 0.5 * 50 = 25
        assert!((state.volatility() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_flat_stream_volatility_floored() {
        let mut est = estimator();
        for _ in 0..10 {
            est.observe(asset(), 42.0).unwrap();
        }
        let state = est.get(&asset()).unwrap();
        assert!(state.volatility() >= VOLATILITY_FLOOR);
        assert!(state.volatility() > 0.0);
    }

    #[test]
    fn test_invalid_price_leaves_state_untouched() {
        let mut est = estimator();
        est.observe(asset(), 100.0).unwrap();
        let before = *est.get(&asset()).unwrap();

        for bad in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let err = est.observe(asset(), bad).unwrap_err();
            assert!(matches!(err, EstimateError::InvalidInput(_)));
        }
        assert_eq!(*est.get(&asset()).unwrap(), before);
    }

    #[test]
    fn test_invalid_first_price_creates_no_state() {
        let mut est = estimator();
        assert!(est.observe(asset(), -1.0).is_err());
        assert!(est.get(&asset()).is_none());
        assert_eq!(est.sample_count(&asset()), 0);
    }

    #[test]
    fn test_mean_within_observed_range_and_vol_non_negative() {
        let mut est = PriceEstimator::new(&PricingConfig::default());
        let prices = [
            101.0, 99.5, 100.2, 104.0, 97.3, 98.8, 102.5, 100.0, 95.0, 103.3, 99.9, 100.7,
        ];
        let (min, max) = prices
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), &p| (lo.min(p), hi.max(p)));

        for &p in &prices {
            let state = est.observe(asset(), p).unwrap();
            assert!(state.volatility() >= 0.0);
            assert!(state.mean() >= min - 1e-9 && state.mean() <= max + 1e-9);
        }
    }

    #[test]
    fn test_multi_asset_independence() {
        let mut est = estimator();
        est.observe(asset(), 100.0).unwrap();
        est.observe(asset2(), 5.0).unwrap();
        est.observe(asset2(), 6.0).unwrap();

        assert_eq!(est.sample_count(&asset()), 1);
        assert_eq!(est.sample_count(&asset2()), 2);
        assert_eq!(est.get(&asset()).unwrap().mean(), 100.0);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut est = estimator();
        est.observe(asset(), 100.0).unwrap();
        let snap = est.snapshot();
        est.observe(asset(), 200.0).unwrap();

        assert_eq!(snap[&asset()].mean(), 100.0);
        assert_eq!(snap[&asset()].sample_count(), 1);
    }

    #[test]
    fn test_degrees_of_freedom() {
        assert_eq!(PriceState::from_parts(1.0, 0.1, 0).degrees_of_freedom(), 1.0);
        assert_eq!(PriceState::from_parts(1.0, 0.1, 1).degrees_of_freedom(), 1.0);
        assert_eq!(PriceState::from_parts(1.0, 0.1, 12).degrees_of_freedom(), 11.0);
    }
}
