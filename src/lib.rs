//! Trade Store Library
//!
//! This library persists trading-bot sessions, orders and profit through the
//! stored procedures of a MySQL schema, and decides which recorded threads can be
//! adopted by a new process.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod report;
pub mod store;

pub use config::Config;
pub use error::{StoreError, StoreResult};
pub use store::TradeStore;
