//! Integration tests for fairmm-bot.
//!
//! These tests drive the engine through whole intervals against the paper
//! marketplace:
//! - quoting from estimated prices
//! - arbitrage response and suspension
//! - stale-order recovery

pub mod common;
