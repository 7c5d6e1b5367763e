//! Per-pair arbitrage state machine.
//!
//! ```text
//!          div > threshold
//!   Idle ───────────────────▶ Active
//!    ▲ ▲                        │  │
//!    │ │ div < threshold        │  │ active longer than max_active_ms,
//!    │ │       - hysteresis     │  │ or fill on either market
//!    │ └────────────────────────┘  ▼
//!    │        div <= threshold   Resolved
//!    └──────────────────────────────┘
//! ```
//!
//! Transitions are level-triggered: every evaluation compares the current
//! divergence against the thresholds, so a divergence hovering around the
//! activation level cannot toggle the pair each interval. A pair whose
//! divergence reverts below the deactivation level is idle again at once
//! and may fire on the next evaluation. An expired or filled pair is held in
//! `Resolved` until the divergence is back at or below the activation
//! threshold, which stops it re-firing on the same dislocation.

use fairmm_core::MarketId;
use fairmm_pricing::TwapTracker;
use fairmm_telemetry::Metrics;
use tracing::{debug, info};

use crate::config::{DetectorConfig, MarketPair};
use crate::error::DetectorResult;
use crate::signal::{ActiveArbitrage, ArbitrageSignal};

/// Why an active pair stopped being active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveReason {
    /// Divergence fell below the deactivation threshold; the pair goes
    /// straight back to idle.
    Reverted,
    /// Active for longer than `max_active_ms`.
    Expired,
    /// A fill was reported on one of the pair's markets.
    Filled,
}

impl ResolveReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reverted => "reverted",
            Self::Expired => "expired",
            Self::Filled => "filled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArbitrageState {
    Idle,
    Active {
        since_ms: u64,
        cheap: MarketId,
        dear: MarketId,
        divergence: f64,
    },
    Resolved {
        at_ms: u64,
        reason: ResolveReason,
    },
}

impl ArbitrageState {
    /// Gauge value: 0 idle, 1 active, 2 resolved.
    pub fn code(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Active { .. } => 1,
            Self::Resolved { .. } => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Active { .. } => "active",
            Self::Resolved { .. } => "resolved",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }
}

#[derive(Debug)]
struct PairState {
    pair: MarketPair,
    label: String,
    state: ArbitrageState,
    last_divergence: f64,
}

impl PairState {
    fn transition(&mut self, next: ArbitrageState, reason: &str) {
        info!(
            pair = %self.label,
            from = self.state.name(),
            to = next.name(),
            reason,
            divergence = self.last_divergence,
            "Arbitrage state change"
        );
        Metrics::arbitrage_transition(&self.label, next.name(), reason);
        self.state = next;
    }
}

/// Arbitrage detector over all configured pairs.
#[derive(Debug)]
pub struct ArbitrageDetector {
    config: DetectorConfig,
    pairs: Vec<PairState>,
}

impl ArbitrageDetector {
    pub fn new(config: DetectorConfig) -> DetectorResult<Self> {
        config.check_pairs()?;
        let pairs = config
            .pairs
            .iter()
            .map(|pair| PairState {
                pair: *pair,
                label: pair.label(),
                state: ArbitrageState::Idle,
                last_divergence: 0.0,
            })
            .collect();
        Ok(Self { config, pairs })
    }

    /// Evaluate every pair on the TWAPs as of `now_ms`.
    pub fn evaluate(&mut self, twaps: &TwapTracker, now_ms: u64) -> ArbitrageSignal {
        self.evaluate_with(|market| twaps.twap(market, now_ms), now_ms)
    }

    /// Evaluate every pair with the given per-market reference price.
    ///
    /// A pair with a missing price keeps its state for this round.
    pub fn evaluate_with<F>(&mut self, reference_price: F, now_ms: u64) -> ArbitrageSignal
    where
        F: Fn(&MarketId) -> Option<f64>,
    {
        let activate_above = self.config.arbitrage_threshold;
        let deactivate_below = self.config.deactivation_threshold();
        let max_active_ms = self.config.max_active_ms;

        for ps in &mut self.pairs {
            let (Some(primary_px), Some(secondary_px)) = (
                reference_price(&ps.pair.primary),
                reference_price(&ps.pair.secondary),
            ) else {
                debug!(pair = %ps.label, "Missing reference price, state unchanged");
                continue;
            };

            let divergence = (primary_px - secondary_px).abs();
            let (cheap, dear) = if primary_px <= secondary_px {
                (ps.pair.primary, ps.pair.secondary)
            } else {
                (ps.pair.secondary, ps.pair.primary)
            };
            ps.last_divergence = divergence;

            match ps.state {
                ArbitrageState::Idle => {
                    if divergence > activate_above {
                        ps.transition(
                            ArbitrageState::Active {
                                since_ms: now_ms,
                                cheap,
                                dear,
                                divergence,
                            },
                            "threshold",
                        );
                    }
                }
                ArbitrageState::Active { since_ms, .. } => {
                    if divergence < deactivate_below {
                        ps.transition(ArbitrageState::Idle, ResolveReason::Reverted.as_str());
                    } else if max_active_ms > 0 && now_ms.saturating_sub(since_ms) >= max_active_ms {
                        ps.transition(
                            ArbitrageState::Resolved {
                                at_ms: now_ms,
                                reason: ResolveReason::Expired,
                            },
                            ResolveReason::Expired.as_str(),
                        );
                    } else {
                        ps.state = ArbitrageState::Active {
                            since_ms,
                            cheap,
                            dear,
                            divergence,
                        };
                    }
                }
                ArbitrageState::Resolved { .. } => {
                    if divergence <= activate_above {
                        ps.transition(ArbitrageState::Idle, "rearmed");
                    }
                }
            }

            Metrics::arbitrage_state(&ps.label, ps.state.code(), divergence);
        }

        self.signal(now_ms)
    }

    /// Resolve an active pair when one of its markets reports a fill.
    pub fn on_fill(&mut self, market: &MarketId, now_ms: u64) {
        for ps in &mut self.pairs {
            if ps.pair.contains(market) && ps.state.is_active() {
                ps.transition(
                    ArbitrageState::Resolved {
                        at_ms: now_ms,
                        reason: ResolveReason::Filled,
                    },
                    ResolveReason::Filled.as_str(),
                );
                Metrics::arbitrage_state(&ps.label, ps.state.code(), ps.last_divergence);
            }
        }
    }

    /// Current signal without re-evaluating.
    pub fn signal(&self, now_ms: u64) -> ArbitrageSignal {
        let active = self
            .pairs
            .iter()
            .filter_map(|ps| match ps.state {
                ArbitrageState::Active {
                    since_ms,
                    cheap,
                    dear,
                    divergence,
                } => Some(ActiveArbitrage {
                    pair: ps.pair,
                    cheap,
                    dear,
                    divergence,
                    since_ms,
                }),
                _ => None,
            })
            .collect();
        ArbitrageSignal {
            active,
            evaluated_at_ms: now_ms,
        }
    }

    pub fn state(&self, pair: &MarketPair) -> Option<ArbitrageState> {
        self.pairs
            .iter()
            .find(|ps| ps.pair == *pair)
            .map(|ps| ps.state)
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }
}
