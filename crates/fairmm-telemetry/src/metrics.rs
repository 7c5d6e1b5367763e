//! Prometheus metrics for fairmm.
//!
//! Covers:
//! - Trade ingestion and estimator state
//! - Candidate generation and price guard rejections
//! - Order submission, cancellation and gateway failures
//! - Arbitrage state per market pair
//! - Interval timing
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration failure
//! means duplicate metric names, which should crash at startup rather than
//! fail silently. These panics only occur during static initialization.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram, CounterVec, Encoder, GaugeVec,
    Histogram, TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Trades accepted by the estimator.
pub static TRADES_OBSERVED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fairmm_trades_observed_total",
        "Total trade observations accepted",
        &["market"]
    )
    .unwrap()
});

/// Trades dropped before reaching the estimator.
/// Labels: reason (invalid_price/unknown_market)
pub static OBSERVATIONS_REJECTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fairmm_observations_rejected_total",
        "Total trade observations rejected",
        &["reason"]
    )
    .unwrap()
});

/// EMA fair value per asset.
pub static PRICE_MEAN: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!("fairmm_price_mean", "EMA fair value estimate", &["asset"]).unwrap()
});

/// EWMA volatility per asset.
pub static PRICE_VOLATILITY: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "fairmm_price_volatility",
        "EWMA volatility estimate",
        &["asset"]
    )
    .unwrap()
});

pub static CANDIDATES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fairmm_candidates_total",
        "Candidate orders produced by opportunity search",
        &["market", "side"]
    )
    .unwrap()
});

pub static GUARD_REJECTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fairmm_guard_rejected_total",
        "Orders blocked by the price sanity guard before submission",
        &["reason"]
    )
    .unwrap()
});

pub static ORDERS_SUBMITTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fairmm_orders_submitted_total",
        "Orders submitted to the gateway",
        &["priority"]
    )
    .unwrap()
});

/// Labels: reason (replace/withdraw/refresh)
pub static ORDERS_CANCELLED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fairmm_orders_cancelled_total",
        "Cancels issued to the gateway",
        &["reason"]
    )
    .unwrap()
});

/// Labels: kind (stale/rejected/transport)
pub static GATEWAY_ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fairmm_gateway_errors_total",
        "Gateway call failures",
        &["kind"]
    )
    .unwrap()
});

pub static RESTING_REFRESH_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fairmm_resting_refresh_total",
        "Resting order views re-fetched after a stale order",
        &["market"]
    )
    .unwrap()
});

pub static MARKET_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fairmm_market_failures_total",
        "Intervals in which a market's plan was skipped",
        &["market", "stage"]
    )
    .unwrap()
});

pub static FILLS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fairmm_fills_total",
        "Fills reported by the marketplace",
        &["market", "side"]
    )
    .unwrap()
});

/// Arbitrage state per pair (0 = idle, 1 = active, 2 = resolved).
pub static ARBITRAGE_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "fairmm_arbitrage_state",
        "Arbitrage state machine per pair (0=idle, 1=active, 2=resolved)",
        &["pair"]
    )
    .unwrap()
});

pub static ARBITRAGE_DIVERGENCE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "fairmm_arbitrage_divergence",
        "Absolute TWAP divergence per pair",
        &["pair"]
    )
    .unwrap()
});

/// Labels: pair, to (active/resolved/idle), reason
pub static ARBITRAGE_TRANSITIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fairmm_arbitrage_transitions_total",
        "Arbitrage state transitions",
        &["pair", "to", "reason"]
    )
    .unwrap()
});

pub static INTERVAL_DURATION_MS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "fairmm_interval_duration_ms",
        "Wall time of one decision interval in milliseconds",
        vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 500.0]
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    pub fn trade_observed(market: &str) {
        TRADES_OBSERVED_TOTAL.with_label_values(&[market]).inc();
    }

    pub fn observation_rejected(reason: &str) {
        OBSERVATIONS_REJECTED_TOTAL
            .with_label_values(&[reason])
            .inc();
    }

    /// Publish the latest estimator state for an asset.
    pub fn price_state(asset: &str, mean: f64, volatility: f64) {
        PRICE_MEAN.with_label_values(&[asset]).set(mean);
        PRICE_VOLATILITY.with_label_values(&[asset]).set(volatility);
    }

    pub fn candidate(market: &str, side: &str) {
        CANDIDATES_TOTAL.with_label_values(&[market, side]).inc();
    }

    pub fn guard_rejected(reason: &str) {
        GUARD_REJECTED_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn order_submitted(priority: &str) {
        ORDERS_SUBMITTED_TOTAL.with_label_values(&[priority]).inc();
    }

    pub fn order_cancelled(reason: &str) {
        ORDERS_CANCELLED_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn gateway_error(kind: &str) {
        GATEWAY_ERRORS_TOTAL.with_label_values(&[kind]).inc();
    }

    pub fn resting_refresh(market: &str) {
        RESTING_REFRESH_TOTAL.with_label_values(&[market]).inc();
    }

    pub fn market_failure(market: &str, stage: &str) {
        MARKET_FAILURES_TOTAL
            .with_label_values(&[market, stage])
            .inc();
    }

    pub fn fill(market: &str, side: &str) {
        FILLS_TOTAL.with_label_values(&[market, side]).inc();
    }

    pub fn arbitrage_state(pair: &str, state_code: u8, divergence: f64) {
        ARBITRAGE_STATE
            .with_label_values(&[pair])
            .set(f64::from(state_code));
        ARBITRAGE_DIVERGENCE
            .with_label_values(&[pair])
            .set(divergence);
    }

    pub fn arbitrage_transition(pair: &str, to: &str, reason: &str) {
        ARBITRAGE_TRANSITIONS_TOTAL
            .with_label_values(&[pair, to, reason])
            .inc();
    }

    pub fn interval_duration(duration_ms: f64) {
        INTERVAL_DURATION_MS.observe(duration_ms);
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn encode_text() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&prometheus::gather(), &mut buffer)
            .map_err(|e| TelemetryError::MetricsEncode(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsEncode(e.to_string()))
    }
}
