//! Reconciler configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Configuration for order reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Price changes at or below this are treated as unchanged (no churn).
    #[serde(default = "default_price_epsilon")]
    pub price_epsilon: Decimal,

    /// Replace a resting order after it has been kept this many
    /// reconciliations, even at an unchanged price. 0 disables.
    #[serde(default = "default_order_refresh_intervals")]
    pub order_refresh_intervals: u32,

    /// `order_refresh_intervals` used when the strategy trades reactively.
    #[serde(default = "default_reactive_refresh_intervals")]
    pub reactive_refresh_intervals: u32,
}

fn default_price_epsilon() -> Decimal {
    Decimal::new(1, 6) // 0.000001
}

fn default_order_refresh_intervals() -> u32 {
    32
}

fn default_reactive_refresh_intervals() -> u32 {
    4
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            price_epsilon: default_price_epsilon(),
            order_refresh_intervals: default_order_refresh_intervals(),
            reactive_refresh_intervals: default_reactive_refresh_intervals(),
        }
    }
}

impl ReconcilerConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.price_epsilon.is_sign_negative() {
            return Err(format!(
                "price_epsilon ({}) must be non-negative",
                self.price_epsilon
            ));
        }
        Ok(())
    }

    /// Config with the refresh cadence for reactive trading swapped in.
    pub fn for_reactive(mut self) -> Self {
        self.order_refresh_intervals = self.reactive_refresh_intervals;
        self
    }
}
