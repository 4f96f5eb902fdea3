//! Data models for the trade store.
//!
//! This module re-exports all model types passed to and returned from store operations.

pub mod global;
pub mod order;
pub mod session;

// Re-export commonly used types
pub use global::{Global, ProfitSummary, ThreadProfit};
pub use order::{LastTwoSides, Order, OrderRef};
pub use session::{ExchangeConfig, Market, Session, ThreadIdentity};
