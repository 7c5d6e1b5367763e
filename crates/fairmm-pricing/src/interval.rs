//! Student-t confidence band around the fair value.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::PricingConfig;
use crate::error::{EstimateError, EstimateResult};
use crate::estimator::PriceState;
use crate::student_t::two_sided_critical;

/// Two-sided price band.
///
/// Always satisfies `0 < lower <= mean <= upper`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceInterval {
    pub lower: f64,
    pub mean: f64,
    pub upper: f64,
}

impl PriceInterval {
    fn point(mean: f64) -> Self {
        Self {
            lower: mean,
            mean,
            upper: mean,
        }
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Zero-width band: the caller cannot price off it and must fall back
    /// to its random side policy.
    pub fn is_degenerate(&self) -> bool {
        self.width() <= f64::EPSILON * self.mean.abs().max(1.0)
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.lower && price <= self.upper
    }
}

#[derive(Debug, Clone)]
pub struct ConfidenceIntervalEngine {
    confidence_level: f64,
    min_price: f64,
}

impl ConfidenceIntervalEngine {
    pub fn new(config: &PricingConfig) -> Self {
        Self {
            confidence_level: config.confidence_level,
            min_price: config.min_price,
        }
    }

    pub fn confidence_level(&self) -> f64 {
        self.confidence_level
    }

    /// Band at the configured confidence level.
    pub fn interval_default(&self, state: &PriceState) -> EstimateResult<PriceInterval> {
        self.interval(state, self.confidence_level)
    }

    /// Band `mean ± t·volatility` with `t` the two-sided Student-t critical
    /// value at `df = max(n - 1, 1)`.
    ///
    /// With one sample or fewer the band collapses to `(mean, mean)`. The
    /// lower bound is clamped to `min_price` (or to the mean, if the mean
    /// itself is below `min_price`).
    pub fn interval(
        &self,
        state: &PriceState,
        confidence_level: f64,
    ) -> EstimateResult<PriceInterval> {
        let mean = state.mean();
        if state.sample_count() <= 1 {
            return Ok(PriceInterval::point(mean));
        }

        let t = two_sided_critical(confidence_level, state.degrees_of_freedom()).ok_or_else(
            || {
                EstimateError::ConfigError(format!(
                    "confidence_level ({confidence_level}) must be in (0, 1)"
                ))
            },
        )?;

        let half_width = t * state.volatility();
        let floor = self.min_price.min(mean);
        let interval = PriceInterval {
            lower: (mean - half_width).max(floor),
            mean,
            upper: mean + half_width,
        };

        trace!(
            mean,
            t,
            lower = interval.lower,
            upper = interval.upper,
            "Confidence interval"
        );
        Ok(interval)
    }
}
