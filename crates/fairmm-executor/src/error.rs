//! Gateway and reconciliation error types.

use fairmm_core::{ClientOrderId, MarketId};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The order no longer exists on the marketplace (filled or cancelled
    /// elsewhere). The local view of resting orders is out of date.
    #[error("Stale order: {0}")]
    StaleOrder(ClientOrderId),

    #[error("Order rejected: {0}")]
    Rejected(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl GatewayError {
    /// Metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StaleOrder(_) => "stale",
            Self::Rejected(_) => "rejected",
            Self::Transport(_) => "transport",
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleOrder(_))
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Re-fetching resting orders failed; the market is skipped this
    /// interval and the refresh retried next interval.
    #[error("Refreshing resting orders for {market} failed: {source}")]
    Refresh {
        market: MarketId,
        #[source]
        source: GatewayError,
    },
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;
