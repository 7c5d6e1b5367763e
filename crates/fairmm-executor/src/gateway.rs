//! Marketplace order gateway trait.
//!
//! Abstracts the transport that places and cancels orders, so the
//! reconciler can run against a live connection, the paper marketplace, or
//! a test double.

use std::pin::Pin;
use std::sync::Arc;

use fairmm_core::{ClientOrderId, MarketId, Order, RestingOrder};

use crate::error::GatewayResult;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Order submission and cancellation.
///
/// Calls are awaited one at a time by the reconciler, in submission
/// priority order.
pub trait OrderGateway: Send + Sync {
    /// Place an order; resolves to the id it rests under.
    fn submit(&self, order: Order) -> BoxFuture<'_, GatewayResult<ClientOrderId>>;

    /// Cancel a resting order.
    ///
    /// `Ok(false)` or `Err(GatewayError::StaleOrder)` both mean the order was
    /// no longer resting.
    fn cancel(&self, id: ClientOrderId) -> BoxFuture<'_, GatewayResult<bool>>;

    /// Orders currently resting in a market.
    fn list_resting(&self, market: MarketId) -> BoxFuture<'_, GatewayResult<Vec<RestingOrder>>>;
}

/// Arc wrapper for OrderGateway trait objects.
pub type DynOrderGateway = Arc<dyn OrderGateway>;
