//! Profit margin that relaxes over a session.
//!
//! `margin(x) = profit_margin · (1 + a · (1 − sin(π/2 · x)))`, where
//! `x = min(elapsed / session_length, 1)` and `a` is the initial
//! aggression. The decay is steep early and flattens toward the end of the
//! session, where the margin settles at `profit_margin`.

use std::f64::consts::FRAC_PI_2;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct AggressionSchedule {
    profit_margin: f64,
    initial_aggression: f64,
    session_length: Duration,
}

impl AggressionSchedule {
    pub fn new(profit_margin: f64, initial_aggression: f64, session_length: Duration) -> Self {
        Self {
            profit_margin,
            initial_aggression,
            session_length,
        }
    }

    /// Fraction of the session elapsed, in `[0, 1]`.
    pub fn progress(&self, elapsed: Duration) -> f64 {
        if self.session_length.is_zero() {
            return 1.0;
        }
        (elapsed.as_secs_f64() / self.session_length.as_secs_f64()).clamp(0.0, 1.0)
    }

    pub fn margin(&self, elapsed: Duration) -> f64 {
        let y = 1.0 - (self.progress(elapsed) * FRAC_PI_2).sin();
        self.profit_margin * (1.0 + self.initial_aggression * y)
    }
}
