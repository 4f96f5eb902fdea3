//! Session-related data models.
//!
//! A [`Session`] identifies one running trading loop. The store enforces that only one
//! live session row exists per `thread_id`; this crate does not.

use super::global::Global;
use serde::{Deserialize, Serialize};

/// Identity and state of one running trading loop instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique handle of the loop, also the stem of its `<thread_id>.lock` file.
    pub thread_id: String,
    /// Sub-identifier for one generation of the session.
    pub thread_id_session: String,
    /// Traded pair, e.g. "BTCUSDT"
    pub symbol: String,
    /// Quote currency of the pair, e.g. "USDT"
    pub symbol_fiat: String,
    pub symbol_fiat_funds: f64,
    pub diff_total: f64,
    pub status: bool,
    /// Order targeted by a forced sale, read by `get_order_by_order_id`.
    pub force_sell_order_id: i64,
    pub global: Global,
}

impl Session {
    pub fn new(thread_id: impl Into<String>, thread_id_session: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            thread_id_session: thread_id_session.into(),
            ..Self::default()
        }
    }

    /// Take over an abandoned thread found by the liveness probe.
    pub fn adopt(&mut self, identity: ThreadIdentity) {
        self.thread_id = identity.thread_id;
        self.thread_id_session = identity.thread_id_session;
    }
}

/// Static deployment parameters read by the session procedures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub exchange_name: String,
}

impl ExchangeConfig {
    pub fn new(exchange_name: impl Into<String>) -> Self {
        Self {
            exchange_name: exchange_name.into(),
        }
    }
}

/// Current market snapshot used as a threshold by the price queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub symbol: String,
    pub price: f64,
}

impl Market {
    pub fn new(symbol: impl Into<String>, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
        }
    }
}

/// A (thread_id, thread_id_session) pair recorded in the store.
///
/// Both fields are empty when no thread is available for adoption.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadIdentity {
    pub thread_id: String,
    pub thread_id_session: String,
}

impl ThreadIdentity {
    pub fn new(thread_id: impl Into<String>, thread_id_session: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            thread_id_session: thread_id_session.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.thread_id.is_empty() && self.thread_id_session.is_empty()
    }
}
