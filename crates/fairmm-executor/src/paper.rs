//! In-memory paper marketplace.
//!
//! Keeps a resting book per market, fills resting orders that a simulated
//! trade crosses, and records every gateway call. Failures can be queued
//! per call type to exercise the reconciler's recovery paths.

use std::collections::{HashMap, VecDeque};

use fairmm_core::{ClientOrderId, Fill, MarketId, Order, OrderSide, RestingOrder};
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{BoxFuture, OrderGateway};

/// A recorded gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Submit(Order),
    Cancel(ClientOrderId),
    ListResting(MarketId),
}

#[derive(Debug, Default)]
struct FailureQueue {
    submit: VecDeque<GatewayError>,
    cancel: VecDeque<GatewayError>,
    list: VecDeque<GatewayError>,
}

#[derive(Debug, Default)]
pub struct PaperGateway {
    book: Mutex<HashMap<MarketId, Vec<RestingOrder>>>,
    calls: Mutex<Vec<GatewayCall>>,
    failures: Mutex<FailureQueue>,
}

impl PaperGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `submit` with `err`.
    pub fn fail_next_submit(&self, err: GatewayError) {
        self.failures.lock().submit.push_back(err);
    }

    /// Fail the next `cancel` with `err`.
    pub fn fail_next_cancel(&self, err: GatewayError) {
        self.failures.lock().cancel.push_back(err);
    }

    /// Fail the next `list_resting` with `err`.
    pub fn fail_next_list(&self, err: GatewayError) {
        self.failures.lock().list.push_back(err);
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn list_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, GatewayCall::ListResting(_)))
            .count()
    }

    /// Snapshot of every resting order in a market.
    pub fn resting(&self, market: &MarketId) -> Vec<RestingOrder> {
        self.book.lock().get(market).cloned().unwrap_or_default()
    }

    /// Remove a resting order behind the reconciler's back (e.g. an
    /// external fill). Returns the removed order.
    pub fn remove_resting(&self, id: &ClientOrderId) -> Option<RestingOrder> {
        let mut book = self.book.lock();
        for orders in book.values_mut() {
            if let Some(pos) = orders.iter().position(|r| r.id == *id) {
                return Some(orders.remove(pos));
            }
        }
        None
    }

    /// Apply a simulated trade: fill every resting order it crosses.
    ///
    /// Buys at or above the trade price and sells at or below it fill in
    /// full at their limit price.
    pub fn match_trade(&self, market: &MarketId, trade_price: f64, timestamp_ms: u64) -> Vec<Fill> {
        let mut book = self.book.lock();
        let Some(orders) = book.get_mut(market) else {
            return Vec::new();
        };

        let mut fills = Vec::new();
        orders.retain(|r| {
            let price = r.order.price.to_f64();
            let crossed = match r.side() {
                OrderSide::Buy => price >= trade_price,
                OrderSide::Sell => price <= trade_price,
            };
            if crossed {
                fills.push(Fill::of(r, timestamp_ms));
            }
            !crossed
        });

        for fill in &fills {
            debug!(
                market = %fill.market,
                side = %fill.side,
                price = %fill.price,
                quantity = %fill.quantity,
                "Paper fill"
            );
        }
        fills
    }

    fn record(&self, call: GatewayCall) {
        self.calls.lock().push(call);
    }
}

impl OrderGateway for PaperGateway {
    fn submit(&self, order: Order) -> BoxFuture<'_, GatewayResult<ClientOrderId>> {
        Box::pin(async move {
            self.record(GatewayCall::Submit(order.clone()));
            if let Some(err) = self.failures.lock().submit.pop_front() {
                return Err(err);
            }
            if order.quantity.is_zero() {
                return Err(GatewayError::Rejected("zero quantity".to_string()));
            }
            if !order.price.is_positive() {
                return Err(GatewayError::Rejected(format!(
                    "non-positive price {}",
                    order.price
                )));
            }

            let id = ClientOrderId::new();
            self.book
                .lock()
                .entry(order.market)
                .or_default()
                .push(RestingOrder::new(id.clone(), order));
            Ok(id)
        })
    }

    fn cancel(&self, id: ClientOrderId) -> BoxFuture<'_, GatewayResult<bool>> {
        Box::pin(async move {
            self.record(GatewayCall::Cancel(id.clone()));
            if let Some(err) = self.failures.lock().cancel.pop_front() {
                return Err(err);
            }
            match self.remove_resting(&id) {
                Some(_) => Ok(true),
                None => Err(GatewayError::StaleOrder(id)),
            }
        })
    }

    fn list_resting(&self, market: MarketId) -> BoxFuture<'_, GatewayResult<Vec<RestingOrder>>> {
        Box::pin(async move {
            self.record(GatewayCall::ListResting(market));
            if let Some(err) = self.failures.lock().list.pop_front() {
                return Err(err);
            }
            Ok(self.resting(&market))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairmm_core::{Price, Quantity};
    use rust_decimal_macros::dec;

    fn order(side: OrderSide, price: Price) -> Order {
        Order::new(MarketId::new(0), side, price, Quantity::new(2))
    }

    #[tokio::test]
    async fn test_submit_and_cancel() {
        let gw = PaperGateway::new();
        let id = gw
            .submit(order(OrderSide::Buy, Price::new(dec!(99))))
            .await
            .unwrap();
        assert_eq!(gw.resting(&MarketId::new(0)).len(), 1);

        assert!(gw.cancel(id.clone()).await.unwrap());
        assert!(gw.resting(&MarketId::new(0)).is_empty());

        // Second cancel: order is gone
        let err = gw.cancel(id).await.unwrap_err();
        assert!(err.is_stale());
    }

    #[tokio::test]
    async fn test_rejects_invalid_order() {
        let gw = PaperGateway::new();
        let err = gw
            .submit(order(OrderSide::Sell, Price::ZERO))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed_once() {
        let gw = PaperGateway::new();
        gw.fail_next_list(GatewayError::Transport("down".to_string()));

        assert!(gw.list_resting(MarketId::new(0)).await.is_err());
        assert!(gw.list_resting(MarketId::new(0)).await.is_ok());
        assert_eq!(gw.list_count(), 2);
    }

    #[test]
    fn test_match_trade_fills_crossed_orders() {
        let gw = PaperGateway::new();
        tokio_test::block_on(async {
            gw.submit(order(OrderSide::Buy, Price::new(dec!(99))))
                .await
                .unwrap();
            gw.submit(order(OrderSide::Sell, Price::new(dec!(101))))
                .await
                .unwrap();
        });

        assert!(gw.match_trade(&MarketId::new(0), 100.0, 1).is_empty());

        let fills = gw.match_trade(&MarketId::new(0), 98.5, 2);
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].side, OrderSide::Buy);
        assert_eq!(fills[0].price, Price::new(dec!(99)));
        assert_eq!(gw.resting(&MarketId::new(0)).len(), 1);
    }
}
