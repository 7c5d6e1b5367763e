//! Scoring and opportunity search for fairmm.
//!
//! Turns one interval's snapshot of prices and holdings into candidate
//! orders:
//! - `ScoringEngine`: portfolio score (expected payoff minus risk penalty)
//!   behind a pluggable `ScoreFn`
//! - `OpportunitySearch`: per-market side selection and pricing
//! - `PriceGuard`: economic sanity bound every order must pass
//! - `AggressionSchedule`: decaying profit margin for single-asset arbitrage
//! - `IntervalBudget`: quantity and cash committed by other markets
//!
//! # Architecture
//!
//! ```text
//! ScoreContext (snapshot) → OpportunitySearch.plan(market, directive, committed)
//!                            ├─ side: held + committed vs optimal (RNG on ties)
//!                            ├─ price: interval bound / bisection / last trade
//!                            ├─ ScoringEngine.delta_score() > 0
//!                            ├─ capital check
//!                            └─ PriceGuard
//!                                 ↓
//!                            MarketPlan → OrderReconciler
//! ```

pub mod aggression;
pub mod budget;
pub mod config;
pub mod context;
pub mod error;
pub mod guard;
pub mod opportunity;
pub mod scoring;
pub mod side;

pub use aggression::AggressionSchedule;
pub use budget::{Committed, IntervalBudget};
pub use config::{StrategyConfig, StrategyKind};
pub use context::ScoreContext;
pub use error::{StrategyError, StrategyResult};
pub use guard::{GuardViolation, PriceGuard};
pub use opportunity::{Candidate, Directive, MarketPlan, OpportunitySearch};
pub use scoring::{HypotheticalTrade, ScoreFn, ScoringEngine, VarianceScorer};
pub use side::preferred_side;
