//! Cross-market arbitrage detection for fairmm.
//!
//! Watches pairs of markets quoting the same underlying and flags when
//! their TWAPs diverge past a threshold.
//!
//! # Architecture
//!
//! ```text
//! TwapTracker ─┐
//!              ├─ ArbitrageDetector.evaluate(now) → ArbitrageSignal
//! fills ───────┘      per pair: Idle ⇄ Active → Resolved → Idle
//!                                        ↓
//!                     engine: Forced (urgent) for the pair's markets,
//!                             Suspended for every other market
//! ```

pub mod config;
pub mod detector;
pub mod error;
pub mod signal;

pub use config::{DetectorConfig, MarketPair};
pub use detector::{ArbitrageDetector, ArbitrageState, ResolveReason};
pub use error::{DetectorError, DetectorResult};
pub use signal::{ActiveArbitrage, ArbitrageSignal};
