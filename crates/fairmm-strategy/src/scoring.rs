//! Portfolio scoring.
//!
//! The default scorer marks every holding to its estimated fair value and
//! subtracts a variance penalty that treats assets as independent:
//!
//! ```text
//! score = cash + Σ_a ( q_a·mean_a − risk_weight·q_a²·vol_a² )
//! ```
//!
//! Cross-asset covariance is ignored. Anything that needs it plugs in its
//! own [`ScoreFn`].

use std::collections::HashMap;

use fairmm_core::{AssetId, HypotheticalPortfolio, OrderSide};
use fairmm_pricing::PriceState;

use crate::context::ScoreContext;

/// A portfolio scoring function.
pub trait ScoreFn: Send + Sync {
    fn score(
        &self,
        portfolio: &HypotheticalPortfolio,
        prices: &HashMap<AssetId, PriceState>,
        risk_weight: f64,
    ) -> f64;

    fn name(&self) -> &'static str;
}

/// Mark-to-estimate payoff minus independent-asset variance.
///
/// Holdings with no price state contribute nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct VarianceScorer;

impl ScoreFn for VarianceScorer {
    fn score(
        &self,
        portfolio: &HypotheticalPortfolio,
        prices: &HashMap<AssetId, PriceState>,
        risk_weight: f64,
    ) -> f64 {
        let positions: f64 = portfolio
            .holdings
            .iter()
            .filter_map(|(asset, &held)| {
                let state = prices.get(asset)?;
                let q = held as f64;
                let vol = state.volatility();
                Some(q * state.mean() - risk_weight * q * q * vol * vol)
            })
            .sum();
        portfolio.cash + positions
    }

    fn name(&self) -> &'static str {
        "variance"
    }
}

/// A trade under evaluation. Price is unrounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HypotheticalTrade {
    pub asset: AssetId,
    pub side: OrderSide,
    pub price: f64,
    pub quantity: u64,
}

impl HypotheticalTrade {
    pub fn new(asset: AssetId, side: OrderSide, price: f64, quantity: u64) -> Self {
        Self {
            asset,
            side,
            price,
            quantity,
        }
    }

    pub fn at_price(self, price: f64) -> Self {
        Self { price, ..self }
    }
}

pub struct ScoringEngine {
    scorer: Box<dyn ScoreFn>,
    risk_weight: f64,
}

impl std::fmt::Debug for ScoringEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringEngine")
            .field("scorer", &self.scorer.name())
            .field("risk_weight", &self.risk_weight)
            .finish()
    }
}

impl ScoringEngine {
    /// Engine with the default [`VarianceScorer`].
    pub fn new(risk_weight: f64) -> Self {
        Self::with_scorer(Box::new(VarianceScorer), risk_weight)
    }

    pub fn with_scorer(scorer: Box<dyn ScoreFn>, risk_weight: f64) -> Self {
        Self {
            scorer,
            risk_weight,
        }
    }

    pub fn risk_weight(&self) -> f64 {
        self.risk_weight
    }

    pub fn scorer_name(&self) -> &'static str {
        self.scorer.name()
    }

    /// Score of the snapshot portfolio as is.
    pub fn score(&self, ctx: &ScoreContext) -> f64 {
        self.scorer.score(
            &ctx.portfolio().as_hypothetical(),
            ctx.prices(),
            self.risk_weight,
        )
    }

    /// `score(after trade) - score(before)`. Exactly zero for an empty trade.
    pub fn delta_score(&self, ctx: &ScoreContext, trade: &HypotheticalTrade) -> f64 {
        if trade.quantity == 0 {
            return 0.0;
        }
        let after = ctx
            .portfolio()
            .with_trade(trade.asset, trade.side, trade.price, trade.quantity);
        self.scorer.score(&after, ctx.prices(), self.risk_weight) - self.score(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairmm_core::Portfolio;
    use rust_decimal_macros::dec;

    fn asset() -> AssetId {
        AssetId::new(0)
    }

    fn ctx(held: i64, mean: f64, vol: f64) -> ScoreContext {
        let portfolio = Portfolio::new(dec!(10000)).with_holding(asset(), held);
        let prices = HashMap::from([(asset(), PriceState::from_parts(mean, vol, 30))]);
        ScoreContext::new(portfolio, prices, 0)
    }

    #[test]
    fn test_score_formula() {
        let engine = ScoringEngine::new(0.01);
        // 10000 + 5*100 - 0.01*25*4
        let score = engine.score(&ctx(5, 100.0, 2.0));
        assert!((score - 10_499.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_quantity_delta_is_zero() {
        let engine = ScoringEngine::new(0.5);
        let trade = HypotheticalTrade::new(asset(), OrderSide::Buy, 95.0, 0);
        assert_eq!(engine.delta_score(&ctx(3, 100.0, 5.0), &trade), 0.0);
    }

    #[test]
    fn test_buy_below_mean_improves_score_when_flat() {
        let engine = ScoringEngine::new(0.01);
        let ctx = ctx(0, 100.0, 5.0);

        // delta = 10*(100-95) - 0.01*100*25 = 50 - 25
        let trade = HypotheticalTrade::new(asset(), OrderSide::Buy, 95.0, 10);
        assert!((engine.delta_score(&ctx, &trade) - 25.0).abs() < 1e-9);

        let at_mean = trade.at_price(100.0);
        assert!(engine.delta_score(&ctx, &at_mean) < 0.0);
    }

    #[test]
    fn test_reducing_risk_can_pay_above_mean() {
        let engine = ScoringEngine::new(0.1);
        let ctx = ctx(10, 100.0, 5.0);

        // Selling 5 of 10 removes 0.1*25*(100-25) = 187.5 of penalty
        let trade = HypotheticalTrade::new(asset(), OrderSide::Sell, 99.0, 5);
        assert!(engine.delta_score(&ctx, &trade) > 0.0);
    }

    #[test]
    fn test_pluggable_scorer() {
        struct CashOnly;
        impl ScoreFn for CashOnly {
            fn score(
                &self,
                portfolio: &HypotheticalPortfolio,
                _prices: &HashMap<AssetId, PriceState>,
                _risk_weight: f64,
            ) -> f64 {
                portfolio.cash
            }
            fn name(&self) -> &'static str {
                "cash_only"
            }
        }

        let engine = ScoringEngine::with_scorer(Box::new(CashOnly), 0.0);
        let trade = HypotheticalTrade::new(asset(), OrderSide::Sell, 50.0, 2);
        assert_eq!(engine.scorer_name(), "cash_only");
        assert!((engine.delta_score(&ctx(0, 100.0, 1.0), &trade) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_unpriced_holding_contributes_nothing() {
        let engine = ScoringEngine::new(0.01);
        let portfolio = Portfolio::new(dec!(100)).with_holding(AssetId::new(9), 50);
        let ctx = ScoreContext::new(portfolio, HashMap::new(), 0);
        assert!((engine.score(&ctx) - 100.0).abs() < 1e-9);
    }
}
