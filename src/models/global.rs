//! Profit aggregates.

use serde::{Deserialize, Serialize};

/// Process-wide cumulative profit, stored as a singleton row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Global {
    pub profit: f64,
    pub profit_net: f64,
    pub profit_pct: f64,
    /// Unix seconds of the last write
    pub transact_time: i64,
}

/// Totals computed by `GetProfit`. `percentage` is already scaled to 0..100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ProfitSummary {
    pub profit: f64,
    pub profit_net: f64,
    pub percentage: f64,
}

/// Totals computed by `GetProfitByThreadID`. `percentage` is already scaled to 0..100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ThreadProfit {
    pub fiat: f64,
    pub percentage: f64,
}
