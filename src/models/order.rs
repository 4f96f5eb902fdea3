//! Order-related data models.

use serde::{Deserialize, Serialize};

/// Persisted projection of one exchange order.
///
/// Built fresh for every call; the store never caches orders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub client_order_id: String,
    pub order_id: i64,
    /// "BUY" or "SELL" as reported by the exchange
    pub side: String,
    pub status: String,
    pub symbol: String,
    pub price: f64,
    pub executed_quantity: f64,
    pub cumulative_quote_quantity: f64,
    /// Exchange transact time in milliseconds since the epoch
    pub transact_time: i64,
}

impl Order {
    /// Create an order carrying only its exchange identifier.
    pub fn with_id(order_id: i64) -> Self {
        Self {
            order_id,
            ..Self::default()
        }
    }
}

/// Order identity attached to failure log entries.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrderRef {
    pub order_id: i64,
    pub price: f64,
}

impl OrderRef {
    pub fn new(order_id: i64, price: f64) -> Self {
        Self { order_id, price }
    }

    pub fn id(order_id: i64) -> Self {
        Self {
            order_id,
            price: 0.0,
        }
    }
}

impl From<&Order> for OrderRef {
    fn from(order: &Order) -> Self {
        Self::new(order.order_id, order.price)
    }
}

/// Side of the two most recent transactions of a thread, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LastTwoSides {
    pub side1: String,
    pub side2: String,
}
