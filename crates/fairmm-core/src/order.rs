//! Order-related types and identifiers.
//!
//! Provides order side, submission priority, client order IDs, proposed
//! orders and the resting orders reported by the marketplace.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{MarketId, Price, Quantity};

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Returns 1 for buy, -1 for sell (for position calculations).
    pub fn sign(&self) -> i64 {
        match self {
            Self::Buy => 1,
            Self::Sell => -1,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Submission precedence class.
///
/// Ordered so that `Urgent` sorts before `Routine` when sorting descending;
/// use [`Priority::rank`] for ascending sorts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Routine,
    Urgent,
}

impl Priority {
    /// Sort key: urgent first.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Urgent => 0,
            Self::Routine => 1,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Routine => write!(f, "routine"),
            Self::Urgent => write!(f, "urgent"),
        }
    }
}

/// Order ID assigned when an order is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientOrderId(String);

impl ClientOrderId {
    /// Create a new unique client order ID.
    ///
    /// Format: `fmm_{timestamp_ms}_{uuid_short}`
    pub fn new() -> Self {
        let ts = chrono::Utc::now().timestamp_millis();
        let uuid_short = &Uuid::new_v4().to_string()[..8];
        Self(format!("fmm_{ts}_{uuid_short}"))
    }

    /// Create from an existing string (for gateway responses).
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClientOrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ClientOrderId {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

/// An order the core wants resting in a market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub market: MarketId,
    pub side: OrderSide,
    pub price: Price,
    pub quantity: Quantity,
    #[serde(default)]
    pub priority: Priority,
}

impl Order {
    pub fn new(market: MarketId, side: OrderSide, price: Price, quantity: Quantity) -> Self {
        Self {
            market,
            side,
            price,
            quantity,
            priority: Priority::Routine,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn is_urgent(&self) -> bool {
        self.priority == Priority::Urgent
    }
}

/// An order live on the marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestingOrder {
    pub id: ClientOrderId,
    pub order: Order,
}

impl RestingOrder {
    pub fn new(id: ClientOrderId, order: Order) -> Self {
        Self { id, order }
    }

    pub fn side(&self) -> OrderSide {
        self.order.side
    }
}

/// A resting order (partly or fully) executed by the marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    pub id: ClientOrderId,
    pub market: MarketId,
    pub side: OrderSide,
    pub price: Price,
    pub quantity: Quantity,
    /// Exchange timestamp (Unix milliseconds).
    pub timestamp_ms: u64,
}

impl Fill {
    /// Fill of a resting order's full quantity at its limit price.
    pub fn of(resting: &RestingOrder, timestamp_ms: u64) -> Self {
        Self {
            id: resting.id.clone(),
            market: resting.order.market,
            side: resting.order.side,
            price: resting.order.price,
            quantity: resting.order.quantity,
            timestamp_ms,
        }
    }
}
