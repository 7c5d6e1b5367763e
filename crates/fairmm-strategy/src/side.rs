//! Side selection from holding versus target.

use std::cmp::Ordering;

use fairmm_core::OrderSide;
use rand::Rng;

/// Buy below target, sell above it, coin flip when exactly on target.
///
/// The RNG is injected so tests can seed it and assert the tie-break.
pub fn preferred_side<R: Rng + ?Sized>(held: i64, optimal: i64, rng: &mut R) -> OrderSide {
    match held.cmp(&optimal) {
        Ordering::Less => OrderSide::Buy,
        Ordering::Greater => OrderSide::Sell,
        Ordering::Equal => {
            if rng.gen_bool(0.5) {
                OrderSide::Buy
            } else {
                OrderSide::Sell
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_bias_ignores_rng() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            assert_eq!(preferred_side(0, 10, &mut rng), OrderSide::Buy);
            assert_eq!(preferred_side(12, 10, &mut rng), OrderSide::Sell);
        }
    }

    #[test]
    fn test_tie_break_is_reproducible() {
        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..16)
                .map(|_| preferred_side(5, 5, &mut rng))
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(7), draw(7));
    }

    #[test]
    fn test_tie_break_hits_both_sides() {
        let mut rng = StdRng::seed_from_u64(42);
        let sides: Vec<_> = (0..64).map(|_| preferred_side(0, 0, &mut rng)).collect();
        assert!(sides.contains(&OrderSide::Buy));
        assert!(sides.contains(&OrderSide::Sell));
    }
}
