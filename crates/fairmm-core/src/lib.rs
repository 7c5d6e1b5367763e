//! Core domain types for the fairmm quoting engine.
//!
//! This crate provides the vocabulary shared by every other crate:
//! - `AssetId`, `MarketId`: identifiers for assets and the markets quoting them
//! - `Price`, `Quantity`: precision-safe order price and integer order size
//! - `Order`, `RestingOrder`, `Priority`, `Fill`: proposed, live and executed orders
//! - `Portfolio`: holdings plus cash, mutated only by fill events
//! - `TradeEvent`: one observed trade from the market data feed

pub mod decimal;
pub mod error;
pub mod market;
pub mod order;
pub mod portfolio;
pub mod types;

pub use decimal::{Price, Quantity};
pub use error::{CoreError, Result};
pub use market::{Asset, AssetId, Market, MarketId};
pub use order::{ClientOrderId, Fill, Order, OrderSide, Priority, RestingOrder};
pub use portfolio::{HypotheticalPortfolio, Portfolio};
pub use types::TradeEvent;
