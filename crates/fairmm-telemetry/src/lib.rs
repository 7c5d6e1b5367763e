//! Prometheus metrics and structured logging for fairmm.
//!
//! - Structured logging with tracing (JSON in production, pretty otherwise)
//! - Prometheus metrics for estimation, quoting, reconciliation and
//!   arbitrage state, rendered as text for periodic snapshots

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
