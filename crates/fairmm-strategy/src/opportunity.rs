//! Per-market candidate order generation.
//!
//! For each market and interval, `OpportunitySearch::plan` picks a side,
//! prices it off the confidence interval, and keeps the candidate only if
//! it improves the portfolio score, is affordable, and passes the price
//! guard. At most one candidate per market per interval.

use std::time::Duration;

use fairmm_core::{Asset, Market, MarketId, Order, OrderSide, Price, Priority, Quantity};
use fairmm_pricing::{ConfidenceIntervalEngine, PriceInterval};
use rand::Rng;
use tracing::debug;

use crate::aggression::AggressionSchedule;
use crate::budget::Committed;
use crate::config::{StrategyConfig, StrategyKind};
use crate::context::ScoreContext;
use crate::error::{StrategyError, StrategyResult};
use crate::guard::PriceGuard;
use crate::scoring::{HypotheticalTrade, ScoringEngine};
use crate::side::preferred_side;

const SEARCH_ITERATIONS: usize = 48;

/// What the arbitrage layer asks of a market this interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Directive {
    /// Normal market making.
    #[default]
    Routine,
    /// An arbitrage elsewhere is in progress: no new routine candidates.
    Suspended,
    /// Part of an active arbitrage: trade this side at urgent priority.
    Forced { side: OrderSide },
}

/// A proposed order with the numbers that justified it.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub order: Order,
    /// Fair value the order was priced against (for the pre-submit guard).
    pub fair_value: f64,
    pub delta_score: f64,
}

/// Desired orders for one market for one interval.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketPlan {
    pub market: MarketId,
    pub directive: Directive,
    pub candidates: Vec<Candidate>,
}

impl MarketPlan {
    fn empty(market: MarketId, directive: Directive) -> Self {
        Self {
            market,
            directive,
            candidates: Vec::new(),
        }
    }

    pub fn is_urgent(&self) -> bool {
        matches!(self.directive, Directive::Forced { .. })
    }

    pub fn is_suspended(&self) -> bool {
        self.directive == Directive::Suspended
    }

    pub fn priority(&self) -> Priority {
        if self.is_urgent() {
            Priority::Urgent
        } else {
            Priority::Routine
        }
    }
}

#[derive(Debug)]
pub struct OpportunitySearch {
    config: StrategyConfig,
    intervals: ConfidenceIntervalEngine,
    scoring: ScoringEngine,
    guard: PriceGuard,
    aggression: AggressionSchedule,
}

impl OpportunitySearch {
    pub fn new(config: StrategyConfig, intervals: ConfidenceIntervalEngine) -> Self {
        let scoring = ScoringEngine::new(config.risk_weight);
        let guard = PriceGuard::from_config(&config);
        let aggression = AggressionSchedule::new(
            config.profit_margin,
            config.initial_aggression,
            Duration::from_secs(config.session_length_secs),
        );
        Self {
            config,
            intervals,
            scoring,
            guard,
            aggression,
        }
    }

    /// Replace the default scorer.
    pub fn with_scoring(mut self, scoring: ScoringEngine) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn scoring(&self) -> &ScoringEngine {
        &self.scoring
    }

    pub fn guard(&self) -> &PriceGuard {
        &self.guard
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Build this interval's plan for one market.
    ///
    /// `committed` holds what other markets have already committed this
    /// interval: sizing and the capital check are net of it. Errors only for
    /// missing inputs (no price state, mismatched asset); an unattractive or
    /// unaffordable trade yields an empty plan.
    pub fn plan<R: Rng + ?Sized>(
        &self,
        ctx: &ScoreContext,
        market: &Market,
        asset: &Asset,
        directive: Directive,
        committed: &Committed,
        rng: &mut R,
    ) -> StrategyResult<MarketPlan> {
        if market.asset != asset.id {
            return Err(StrategyError::UnknownAsset {
                market: market.id,
                asset: market.asset,
            });
        }
        if directive == Directive::Suspended {
            return Ok(MarketPlan::empty(market.id, directive));
        }

        let state = ctx
            .price(&asset.id)
            .ok_or(StrategyError::MissingPriceState(asset.id))?;
        let interval = self.intervals.interval_default(state)?;

        let held = ctx.held(&asset.id);
        let position = held.saturating_add(committed.net_quantity());
        let side = match directive {
            Directive::Forced { side } => side,
            _ if held != asset.optimal && position == asset.optimal => {
                debug!(market = %market.id, held, position, "Target gap covered by other markets");
                return Ok(MarketPlan::empty(market.id, directive));
            }
            _ => preferred_side(position, asset.optimal, rng),
        };

        let sellable = committed.sellable(held);
        let Some(quantity) = self.quantity(position, sellable, asset.optimal, side) else {
            debug!(market = %market.id, %side, held, sellable, "No inventory to sell");
            return Ok(MarketPlan::empty(market.id, directive));
        };
        let trade = HypotheticalTrade::new(asset.id, side, interval.mean, quantity);

        let kind = match directive {
            Directive::Forced { .. } => StrategyKind::StatArb,
            _ => self.config.kind,
        };
        let last_trade = ctx.last_trade(&market.id);
        let price = match kind {
            StrategyKind::ReactiveArb => match last_trade {
                Some(last) => Some(round_passive(Price::from_f64(last)?, side, market.tick_size)),
                None => None,
            },
            _ if interval.is_degenerate() => {
                // Zero-width band: random passive offset from the mean
                let ticks = rng.gen_range(1..=self.config.fallback_max_ticks) as f64;
                let offset = ticks * market.tick_size.to_f64();
                let raw = match side {
                    OrderSide::Buy => interval.mean - offset,
                    OrderSide::Sell => interval.mean + offset,
                };
                Some(round_passive(Price::from_f64(raw)?, side, market.tick_size))
            }
            StrategyKind::NoiseTrader | StrategyKind::SingleAssetArb => Some(round_passive(
                Price::from_f64(interval_bound(&interval, side))?,
                side,
                market.tick_size,
            )),
            StrategyKind::StatArb => self.search_price(ctx, trade, &interval, market.tick_size)?,
        };
        let Some(price) = price else {
            debug!(market = %market.id, %side, ?kind, "No acceptable price");
            return Ok(MarketPlan::empty(market.id, directive));
        };

        if matches!(kind, StrategyKind::SingleAssetArb | StrategyKind::ReactiveArb) {
            // Reactive trades are gated on the observed price, not the rounded one
            let reference = match kind {
                StrategyKind::ReactiveArb => last_trade.unwrap_or_else(|| price.to_f64()),
                _ => price.to_f64(),
            };
            let margin = self.aggression.margin(ctx.elapsed());
            let edge = match side {
                OrderSide::Buy => interval.mean - reference,
                OrderSide::Sell => reference - interval.mean,
            };
            if edge < margin {
                debug!(market = %market.id, %side, edge, margin, "Edge below profit margin");
                return Ok(MarketPlan::empty(market.id, directive));
            }
        }

        let delta = self
            .scoring
            .delta_score(ctx, &trade.at_price(price.to_f64()));
        if delta <= 0.0 {
            debug!(market = %market.id, %side, %price, delta, "Trade does not improve score");
            return Ok(MarketPlan::empty(market.id, directive));
        }

        let quantity = Quantity::new(quantity);
        if !self.has_capital(ctx, committed, sellable, side, price, quantity) {
            debug!(
                market = %market.id,
                %side,
                %price,
                %quantity,
                committed_cash = %committed.buy_notional,
                "Insufficient capital"
            );
            return Ok(MarketPlan::empty(market.id, directive));
        }

        if let Err(violation) = self.guard.check_price(side, price.to_f64(), interval.mean) {
            debug!(market = %market.id, %side, %violation, "Price guard rejected candidate");
            return Ok(MarketPlan::empty(market.id, directive));
        }

        let mut plan = MarketPlan::empty(market.id, directive);
        let order = Order::new(market.id, side, price, quantity).with_priority(plan.priority());
        debug!(
            market = %market.id,
            %side,
            %price,
            %quantity,
            fair = interval.mean,
            delta,
            "Candidate order"
        );
        plan.candidates.push(Candidate {
            order,
            fair_value: interval.mean,
            delta_score: delta,
        });
        Ok(plan)
    }

    /// Size toward target from `position` (holding plus other markets'
    /// commitments), capped; base size when on target or trading away from
    /// it. Sells are limited to `sellable` unless shorting is allowed;
    /// `None` when nothing can be sold.
    fn quantity(&self, position: i64, sellable: i64, optimal: i64, side: OrderSide) -> Option<u64> {
        let gap = optimal.saturating_sub(position);
        let toward_target = (gap > 0 && side == OrderSide::Buy) || (gap < 0 && side == OrderSide::Sell);
        let mut quantity = if toward_target {
            gap.unsigned_abs().min(self.config.max_order_quantity)
        } else {
            self.config.base_quantity
        };

        if side == OrderSide::Sell && !self.config.allow_short {
            quantity = quantity.min(sellable.max(0).unsigned_abs());
        }
        (quantity > 0).then_some(quantity)
    }

    /// Tick price nearest the mean, within the interval, at which the trade
    /// still improves the score. Bisects on the raw price assuming
    /// `delta_score` is monotone in price (decreasing for buys, increasing
    /// for sells), then rounds passively and re-verifies, stepping one tick
    /// further out if rounding landed on the boundary.
    fn search_price(
        &self,
        ctx: &ScoreContext,
        trade: HypotheticalTrade,
        interval: &PriceInterval,
        tick_size: Price,
    ) -> StrategyResult<Option<Price>> {
        let improves = |price: f64| self.scoring.delta_score(ctx, &trade.at_price(price)) > 0.0;

        let mut feasible = interval_bound(interval, trade.side);
        let mut infeasible = interval.mean;
        if !improves(feasible) {
            return Ok(None);
        }
        if improves(infeasible) {
            feasible = infeasible;
        } else {
            for _ in 0..SEARCH_ITERATIONS {
                let mid = 0.5 * (feasible + infeasible);
                if improves(mid) {
                    feasible = mid;
                } else {
                    infeasible = mid;
                }
            }
        }

        let rounded = round_passive(Price::from_f64(feasible)?, trade.side, tick_size);
        if improves(rounded.to_f64()) {
            return Ok(Some(rounded));
        }
        let stepped = match trade.side {
            OrderSide::Buy => rounded - tick_size,
            OrderSide::Sell => rounded + tick_size,
        };
        Ok(improves(stepped.to_f64()).then_some(stepped))
    }

    fn has_capital(
        &self,
        ctx: &ScoreContext,
        committed: &Committed,
        sellable: i64,
        side: OrderSide,
        price: Price,
        quantity: Quantity,
    ) -> bool {
        match side {
            OrderSide::Buy => {
                ctx.portfolio().cash() - committed.buy_notional >= quantity.notional(price)
            }
            OrderSide::Sell => self.config.allow_short || sellable >= quantity.as_i64(),
        }
    }
}

fn interval_bound(interval: &PriceInterval, side: OrderSide) -> f64 {
    match side {
        OrderSide::Buy => interval.lower,
        OrderSide::Sell => interval.upper,
    }
}

/// Rounding never makes a quote more aggressive.
fn round_passive(price: Price, side: OrderSide, tick_size: Price) -> Price {
    match side {
        OrderSide::Buy => price.floor_to_tick(tick_size),
        OrderSide::Sell => price.ceil_to_tick(tick_size),
    }
}
