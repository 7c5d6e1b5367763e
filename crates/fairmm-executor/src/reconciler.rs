//! Order reconciliation.
//!
//! Keeps at most one resting order per side per market and moves it toward
//! the desired order with the fewest gateway calls:
//!
//! | desired | resting | action                                   |
//! |---------|---------|------------------------------------------|
//! | none    | none    | nothing                                  |
//! | none    | some    | cancel                                   |
//! | some    | none    | submit                                   |
//! | some    | some    | nothing if the price is within epsilon,  |
//! |         |         | otherwise cancel then submit             |
//!
//! A resting order kept for `order_refresh_intervals` passes is replaced even
//! at an unchanged price.
//!
//! Any gateway failure marks the market's view as stale and ends its pass
//! for this interval. The next `reconcile` for that market re-fetches the
//! resting orders before diffing. Nothing is retried within an interval.

use std::collections::HashMap;

use fairmm_core::{ClientOrderId, Fill, MarketId, Order, OrderSide, RestingOrder};
use fairmm_strategy::{Candidate, MarketPlan, PriceGuard};
use fairmm_telemetry::Metrics;
use tracing::{debug, info, warn};

use crate::config::ReconcilerConfig;
use crate::error::{GatewayError, ReconcileError, ReconcileResult};
use crate::gateway::DynOrderGateway;

#[derive(Debug, Clone)]
struct TrackedOrder {
    resting: RestingOrder,
    /// Reconciliation passes survived unchanged.
    age: u32,
}

impl TrackedOrder {
    fn new(resting: RestingOrder) -> Self {
        Self { resting, age: 0 }
    }
}

#[derive(Debug, Default)]
struct MarketBook {
    buy: Option<TrackedOrder>,
    sell: Option<TrackedOrder>,
    needs_refresh: bool,
}

impl MarketBook {
    fn slot(&mut self, side: OrderSide) -> &mut Option<TrackedOrder> {
        match side {
            OrderSide::Buy => &mut self.buy,
            OrderSide::Sell => &mut self.sell,
        }
    }
}

/// What one `reconcile` call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub submitted: usize,
    pub cancelled: usize,
    pub unchanged: usize,
    pub refreshed: bool,
    pub guard_rejected: usize,
    pub failures: Vec<GatewayError>,
}

impl ReconcileReport {
    /// Number of gateway calls issued (excluding the refresh).
    pub fn gateway_calls(&self) -> usize {
        self.submitted + self.cancelled + self.failures.len()
    }
}

enum Step {
    Keep,
    Cancel,
    Submit,
    Replace,
}

pub struct OrderReconciler {
    gateway: DynOrderGateway,
    config: ReconcilerConfig,
    guard: PriceGuard,
    books: HashMap<MarketId, MarketBook>,
}

impl OrderReconciler {
    pub fn new(gateway: DynOrderGateway, config: ReconcilerConfig, guard: PriceGuard) -> Self {
        Self {
            gateway,
            config,
            guard,
            books: HashMap::new(),
        }
    }

    /// Reconcile every plan, urgent markets first.
    ///
    /// Suspended plans are skipped: their resting orders stay as they are.
    /// One market's failure does not stop the others.
    pub async fn reconcile_all(
        &mut self,
        mut plans: Vec<MarketPlan>,
    ) -> Vec<(MarketId, ReconcileResult<ReconcileReport>)> {
        plans.sort_by_key(|p| p.priority().rank());

        let mut results = Vec::with_capacity(plans.len());
        for plan in plans {
            if plan.is_suspended() {
                debug!(market = %plan.market, "Suspended, leaving resting orders");
                continue;
            }
            let result = self.reconcile(plan.market, &plan.candidates).await;
            results.push((plan.market, result));
        }
        results
    }

    /// Bring the market's resting orders in line with `desired`.
    pub async fn reconcile(
        &mut self,
        market: MarketId,
        desired: &[Candidate],
    ) -> ReconcileResult<ReconcileReport> {
        let mut report = ReconcileReport::default();

        if self.books.entry(market).or_default().needs_refresh {
            self.refresh(market).await?;
            report.refreshed = true;
        }

        let (buy, sell) = self.select_desired(market, desired, &mut report);

        for (side, want) in [(OrderSide::Buy, buy), (OrderSide::Sell, sell)] {
            if let Err(e) = self.reconcile_side(market, side, want, &mut report).await {
                Metrics::gateway_error(e.kind());
                warn!(
                    market = %market,
                    %side,
                    error = %e,
                    "Gateway call failed, resting view marked stale"
                );
                self.mark_stale(market);
                report.failures.push(e);
                break;
            }
        }

        debug!(
            market = %market,
            submitted = report.submitted,
            cancelled = report.cancelled,
            unchanged = report.unchanged,
            "Reconciled"
        );
        Ok(report)
    }

    /// Pick at most one desired order per side and re-check each against the
    /// price guard.
    fn select_desired(
        &self,
        market: MarketId,
        desired: &[Candidate],
        report: &mut ReconcileReport,
    ) -> (Option<Order>, Option<Order>) {
        let mut buy = None;
        let mut sell = None;

        for candidate in desired {
            let order = &candidate.order;
            if order.market != market {
                warn!(market = %market, order_market = %order.market, "Candidate for another market ignored");
                continue;
            }
            if let Err(violation) = self.guard.check(order, candidate.fair_value) {
                Metrics::guard_rejected(violation.reason());
                warn!(market = %market, side = %order.side, %violation, "Order blocked by price guard");
                report.guard_rejected += 1;
                continue;
            }
            let slot = match order.side {
                OrderSide::Buy => &mut buy,
                OrderSide::Sell => &mut sell,
            };
            if slot.is_some() {
                warn!(market = %market, side = %order.side, "More than one desired order per side, keeping the first");
                continue;
            }
            *slot = Some(order.clone());
        }
        (buy, sell)
    }

    async fn reconcile_side(
        &mut self,
        market: MarketId,
        side: OrderSide,
        want: Option<Order>,
        report: &mut ReconcileReport,
    ) -> Result<(), GatewayError> {
        let refresh_after = self.config.order_refresh_intervals;
        let epsilon = self.config.price_epsilon;

        let book = self.books.entry(market).or_default();
        let slot = book.slot(side);

        let step = match (&want, slot.as_mut()) {
            (None, None) => return Ok(()),
            (None, Some(_)) => Step::Cancel,
            (Some(_), None) => Step::Submit,
            (Some(order), Some(tracked)) => {
                let price_moved = order.price.abs_diff(tracked.resting.order.price) > epsilon;
                if price_moved {
                    Step::Replace
                } else {
                    tracked.age += 1;
                    if refresh_after > 0 && tracked.age >= refresh_after {
                        Step::Replace
                    } else {
                        Step::Keep
                    }
                }
            }
        };

        match step {
            Step::Keep => {
                report.unchanged += 1;
                Ok(())
            }
            Step::Cancel => self.cancel_side(market, side, "withdraw", report).await,
            Step::Submit => match want {
                Some(order) => self.submit_side(market, order, report).await,
                None => Ok(()),
            },
            Step::Replace => {
                let reason = match &want {
                    Some(order) if self.is_same_price(market, side, order) => "refresh",
                    _ => "replace",
                };
                // Cancel first: a side never has two live orders
                self.cancel_side(market, side, reason, report).await?;
                match want {
                    Some(order) => self.submit_side(market, order, report).await,
                    None => Ok(()),
                }
            }
        }
    }

    fn is_same_price(&self, market: MarketId, side: OrderSide, order: &Order) -> bool {
        let tracked = self.books.get(&market).and_then(|b| match side {
            OrderSide::Buy => b.buy.as_ref(),
            OrderSide::Sell => b.sell.as_ref(),
        });
        tracked.is_some_and(|t| {
            order.price.abs_diff(t.resting.order.price) <= self.config.price_epsilon
        })
    }

    async fn cancel_side(
        &mut self,
        market: MarketId,
        side: OrderSide,
        reason: &str,
        report: &mut ReconcileReport,
    ) -> Result<(), GatewayError> {
        let Some(tracked) = self.books.entry(market).or_default().slot(side).take() else {
            return Ok(());
        };
        let id = tracked.resting.id.clone();

        match self.gateway.cancel(id.clone()).await {
            Ok(true) => {
                Metrics::order_cancelled(reason);
                debug!(market = %market, %side, %id, reason, "Cancelled");
                report.cancelled += 1;
                Ok(())
            }
            Ok(false) => Err(GatewayError::StaleOrder(id)),
            Err(e) => Err(e),
        }
    }

    async fn submit_side(
        &mut self,
        market: MarketId,
        order: Order,
        report: &mut ReconcileReport,
    ) -> Result<(), GatewayError> {
        let side = order.side;
        let priority = order.priority;
        let id = self.gateway.submit(order.clone()).await?;

        Metrics::order_submitted(&priority.to_string());
        debug!(
            market = %market,
            %side,
            price = %order.price,
            quantity = %order.quantity,
            %priority,
            %id,
            "Submitted"
        );
        *self.books.entry(market).or_default().slot(side) =
            Some(TrackedOrder::new(RestingOrder::new(id, order)));
        report.submitted += 1;
        Ok(())
    }

    /// Rebuild a market's view from the gateway.
    async fn refresh(&mut self, market: MarketId) -> ReconcileResult<()> {
        let resting = self
            .gateway
            .list_resting(market)
            .await
            .map_err(|source| ReconcileError::Refresh { market, source })?;

        Metrics::resting_refresh(&market.to_string());
        let mut book = MarketBook::default();
        let mut extras = Vec::new();
        for r in resting {
            let slot = book.slot(r.side());
            if slot.is_none() {
                *slot = Some(TrackedOrder::new(r));
            } else {
                extras.push(r.id);
            }
        }
        info!(
            market = %market,
            buy = book.buy.is_some(),
            sell = book.sell.is_some(),
            extras = extras.len(),
            "Resting orders refreshed"
        );
        self.books.insert(market, book);

        // More than one order on a side: cancel the extras, re-check next time
        for id in extras {
            match self.gateway.cancel(id.clone()).await {
                Ok(true) => Metrics::order_cancelled("duplicate"),
                Ok(false) | Err(_) => {
                    warn!(market = %market, %id, "Could not cancel duplicate resting order");
                    self.mark_stale(market);
                }
            }
        }
        Ok(())
    }

    /// Force a resting-order refresh before the market's next reconcile.
    pub fn mark_stale(&mut self, market: MarketId) {
        self.books.entry(market).or_default().needs_refresh = true;
    }

    pub fn needs_refresh(&self, market: &MarketId) -> bool {
        self.books.get(market).is_some_and(|b| b.needs_refresh)
    }

    /// Drop a filled order from the local view.
    pub fn on_fill(&mut self, fill: &Fill) {
        let Some(book) = self.books.get_mut(&fill.market) else {
            return;
        };
        let slot = book.slot(fill.side);
        if slot.as_ref().is_some_and(|t| t.resting.id == fill.id) {
            *slot = None;
        }
    }

    /// Orders this reconciler believes are resting in a market.
    pub fn resting(&self, market: &MarketId) -> Vec<RestingOrder> {
        self.books
            .get(market)
            .map(|b| {
                [b.buy.as_ref(), b.sell.as_ref()]
                    .into_iter()
                    .flatten()
                    .map(|t| t.resting.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn resting_id(&self, market: &MarketId, side: OrderSide) -> Option<ClientOrderId> {
        self.books.get(market).and_then(|b| {
            let slot = match side {
                OrderSide::Buy => b.buy.as_ref(),
                OrderSide::Sell => b.sell.as_ref(),
            };
            slot.map(|t| t.resting.id.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use fairmm_core::{Price, Priority, Quantity};
    use fairmm_strategy::Directive;
    use rust_decimal_macros::dec;

    use crate::paper::{GatewayCall, PaperGateway};

    fn mkt(id: u32) -> MarketId {
        MarketId::new(id)
    }

    fn candidate(market: MarketId, side: OrderSide, price: Price) -> Candidate {
        Candidate {
            order: Order::new(market, side, price, Quantity::new(1)),
            fair_value: 100.0,
            delta_score: 1.0,
        }
    }

    fn buy(price: Price) -> Candidate {
        candidate(mkt(0), OrderSide::Buy, price)
    }

    fn setup(config: ReconcilerConfig) -> (Arc<PaperGateway>, OrderReconciler) {
        let gw = Arc::new(PaperGateway::new());
        let rec = OrderReconciler::new(gw.clone(), config, PriceGuard::new(1000.0, 0.0));
        (gw, rec)
    }

    #[tokio::test]
    async fn test_identical_desired_orders_issue_no_calls() {
        let (gw, mut rec) = setup(ReconcilerConfig::default());
        let desired = vec![
            buy(Price::new(dec!(99))),
            candidate(mkt(0), OrderSide::Sell, Price::new(dec!(101))),
        ];

        let first = rec.reconcile(mkt(0), &desired).await.unwrap();
        assert_eq!(first.submitted, 2);

        gw.clear_calls();
        let second = rec.reconcile(mkt(0), &desired).await.unwrap();
        assert!(gw.calls().is_empty());
        assert_eq!(second.unchanged, 2);
        assert_eq!(second.gateway_calls(), 0);
    }

    #[tokio::test]
    async fn test_price_change_cancels_then_submits() {
        let (gw, mut rec) = setup(ReconcilerConfig::default());
        rec.reconcile(mkt(0), &[buy(Price::new(dec!(99)))])
            .await
            .unwrap();
        let old_id = rec.resting_id(&mkt(0), OrderSide::Buy).unwrap();
        gw.clear_calls();

        let report = rec
            .reconcile(mkt(0), &[buy(Price::new(dec!(98.5)))])
            .await
            .unwrap();

        let calls = gw.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], GatewayCall::Cancel(old_id));
        assert!(matches!(&calls[1], GatewayCall::Submit(o) if o.price == Price::new(dec!(98.5))));
        assert_eq!((report.cancelled, report.submitted), (1, 1));
        assert_eq!(gw.resting(&mkt(0)).len(), 1);
    }

    #[tokio::test]
    async fn test_price_within_epsilon_is_unchanged() {
        let (gw, mut rec) = setup(ReconcilerConfig {
            price_epsilon: dec!(0.01),
            ..Default::default()
        });
        rec.reconcile(mkt(0), &[buy(Price::new(dec!(99)))])
            .await
            .unwrap();
        gw.clear_calls();

        rec.reconcile(mkt(0), &[buy(Price::new(dec!(99.01)))])
            .await
            .unwrap();
        assert!(gw.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_side_is_cancelled() {
        let (gw, mut rec) = setup(ReconcilerConfig::default());
        rec.reconcile(mkt(0), &[buy(Price::new(dec!(99)))])
            .await
            .unwrap();

        let report = rec.reconcile(mkt(0), &[]).await.unwrap();
        assert_eq!(report.cancelled, 1);
        assert!(gw.resting(&mkt(0)).is_empty());
        assert!(rec.resting(&mkt(0)).is_empty());
    }

    #[tokio::test]
    async fn test_stale_cancel_refreshes_before_next_reconcile() {
        let (gw, mut rec) = setup(ReconcilerConfig::default());
        rec.reconcile(mkt(0), &[buy(Price::new(dec!(99)))])
            .await
            .unwrap();

        // Order filled externally; the cancel for the replace finds nothing
        let id = rec.resting_id(&mkt(0), OrderSide::Buy).unwrap();
        gw.remove_resting(&id);

        let report = rec
            .reconcile(mkt(0), &[buy(Price::new(dec!(98)))])
            .await
            .unwrap();
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].is_stale());
        assert_eq!(report.submitted, 0, "no blind retry within the interval");
        assert!(rec.needs_refresh(&mkt(0)));
        assert_eq!(gw.list_count(), 0);

        let report = rec
            .reconcile(mkt(0), &[buy(Price::new(dec!(98)))])
            .await
            .unwrap();
        assert!(report.refreshed);
        assert_eq!(gw.list_count(), 1);
        let calls = gw.calls();
        assert_eq!(calls[calls.len() - 2], GatewayCall::ListResting(mkt(0)));
        assert_eq!(report.submitted, 1);
        assert!(!rec.needs_refresh(&mkt(0)));
    }

    #[tokio::test]
    async fn test_injected_stale_error_does_not_panic() {
        let (gw, mut rec) = setup(ReconcilerConfig::default());
        rec.reconcile(mkt(0), &[buy(Price::new(dec!(99)))])
            .await
            .unwrap();
        gw.fail_next_cancel(GatewayError::StaleOrder(ClientOrderId::from_string(
            "gone".to_string(),
        )));

        let report = rec.reconcile(mkt(0), &[]).await.unwrap();
        assert!(report.failures[0].is_stale());
        assert!(rec.needs_refresh(&mkt(0)));

        // Refresh finds the order still resting and cancels it
        let report = rec.reconcile(mkt(0), &[]).await.unwrap();
        assert!(report.refreshed);
        assert_eq!(report.cancelled, 1);
        assert!(gw.resting(&mkt(0)).is_empty());
    }

    #[tokio::test]
    async fn test_failed_refresh_skips_market() {
        let (gw, mut rec) = setup(ReconcilerConfig::default());
        rec.mark_stale(mkt(0));
        gw.fail_next_list(GatewayError::Transport("timeout".to_string()));

        let err = rec
            .reconcile(mkt(0), &[buy(Price::new(dec!(99)))])
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Refresh { .. }));
        assert!(rec.needs_refresh(&mkt(0)));
        assert!(gw.resting(&mkt(0)).is_empty());
    }

    #[tokio::test]
    async fn test_guard_blocks_order_crossing_fair_value() {
        let (gw, mut rec) = setup(ReconcilerConfig::default());
        // fair_value 100, buy at 100.5
        let report = rec
            .reconcile(mkt(0), &[buy(Price::new(dec!(100.5)))])
            .await
            .unwrap();
        assert_eq!(report.guard_rejected, 1);
        assert!(gw.calls().is_empty());
    }

    #[tokio::test]
    async fn test_stagnant_order_is_refreshed() {
        let (gw, mut rec) = setup(ReconcilerConfig {
            order_refresh_intervals: 2,
            ..Default::default()
        });
        let desired = [buy(Price::new(dec!(99)))];

        rec.reconcile(mkt(0), &desired).await.unwrap();
        let r2 = rec.reconcile(mkt(0), &desired).await.unwrap();
        assert_eq!(r2.unchanged, 1);

        gw.clear_calls();
        let r3 = rec.reconcile(mkt(0), &desired).await.unwrap();
        assert_eq!((r3.cancelled, r3.submitted), (1, 1));
        assert_eq!(gw.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_urgent_plans_reconciled_first() {
        let (gw, mut rec) = setup(ReconcilerConfig::default());
        let routine = MarketPlan {
            market: mkt(0),
            directive: Directive::Routine,
            candidates: vec![buy(Price::new(dec!(99)))],
        };
        let mut urgent_candidate = candidate(mkt(1), OrderSide::Sell, Price::new(dec!(101)));
        urgent_candidate.order.priority = Priority::Urgent;
        let urgent = MarketPlan {
            market: mkt(1),
            directive: Directive::Forced {
                side: OrderSide::Sell,
            },
            candidates: vec![urgent_candidate],
        };
        let suspended = MarketPlan {
            market: mkt(2),
            directive: Directive::Suspended,
            candidates: Vec::new(),
        };

        let results = rec.reconcile_all(vec![routine, suspended, urgent]).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, mkt(1));

        let calls = gw.calls();
        assert!(matches!(&calls[0], GatewayCall::Submit(o) if o.priority == Priority::Urgent));
        assert!(matches!(&calls[1], GatewayCall::Submit(o) if o.market == mkt(0)));
    }

    #[tokio::test]
    async fn test_fill_clears_tracked_order() {
        let (gw, mut rec) = setup(ReconcilerConfig::default());
        rec.reconcile(mkt(0), &[buy(Price::new(dec!(99)))])
            .await
            .unwrap();

        let fills = gw.match_trade(&mkt(0), 98.0, 5);
        assert_eq!(fills.len(), 1);
        rec.on_fill(&fills[0]);
        assert!(rec.resting(&mkt(0)).is_empty());

        gw.clear_calls();
        let report = rec
            .reconcile(mkt(0), &[buy(Price::new(dec!(99)))])
            .await
            .unwrap();
        assert_eq!(report.submitted, 1);
        assert_eq!(gw.calls().len(), 1);
    }
}
