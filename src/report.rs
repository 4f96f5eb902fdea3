//! Failure reporting.
//!
//! Every failure produces one [`LogEntry`] carrying whatever context the caller had at
//! hand (exchange config, market snapshot, session, order) and is emitted through
//! `tracing` before the error is returned.
//!
//! The level follows the error kind:
//! - procedure invocation failures are routine and logged at debug
//! - rows that do not decode point at a schema mismatch and are logged at warn
//! - configuration, connection and lock file failures are logged at error

use crate::error::StoreError;
use crate::models::{ExchangeConfig, Market, OrderRef, Session};
use serde::Serialize;
use tracing::{debug, error, warn};

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Warn,
    Error,
}

impl LogLevel {
    /// Level at which a failure of this kind is reported.
    pub fn for_error(err: &StoreError) -> Self {
        match err {
            StoreError::Query { .. } => LogLevel::Debug,
            StoreError::Decode { .. } => LogLevel::Warn,
            StoreError::Configuration { .. }
            | StoreError::Connection { .. }
            | StoreError::LockFile { .. } => LogLevel::Error,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// Context available at the failing call site. Every part is optional.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogContext<'a> {
    pub config: Option<&'a ExchangeConfig>,
    pub market: Option<&'a Market>,
    pub session: Option<&'a Session>,
    pub order: Option<OrderRef>,
}

impl<'a> LogContext<'a> {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn session(session: &'a Session) -> Self {
        Self {
            session: Some(session),
            ..Self::default()
        }
    }

    pub fn with_config(mut self, config: &'a ExchangeConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_market(mut self, market: &'a Market) -> Self {
        self.market = Some(market);
        self
    }

    pub fn with_order(mut self, order: OrderRef) -> Self {
        self.order = Some(order);
        self
    }
}

/// Structured record of one failure.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub operation: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id_session: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_price: Option<f64>,
}

impl LogEntry {
    /// Entry for a failed operation, message formatted as `"<operation> - <error>"`.
    pub fn failure(ctx: LogContext<'_>, operation: &str, err: &StoreError) -> Self {
        let symbol = ctx
            .market
            .map(|m| m.symbol.clone())
            .or_else(|| ctx.session.map(|s| s.symbol.clone()))
            .filter(|s| !s.is_empty());

        Self {
            level: LogLevel::for_error(err),
            operation: operation.to_string(),
            message: format!("{} - {}", operation, err),
            suggestion: err.suggestion().map(str::to_string),
            exchange: ctx.config.map(|c| c.exchange_name.clone()),
            symbol,
            market_price: ctx.market.map(|m| m.price),
            thread_id: ctx.session.map(|s| s.thread_id.clone()),
            thread_id_session: ctx.session.map(|s| s.thread_id_session.clone()),
            order_id: ctx.order.map(|o| o.order_id),
            order_price: ctx.order.map(|o| o.price),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Emit through the tracing subscriber at the entry's level.
    pub fn emit(&self) {
        macro_rules! emit_at {
            ($level:ident) => {
                $level!(
                    operation = %self.operation,
                    suggestion = self.suggestion.as_deref(),
                    exchange = self.exchange.as_deref(),
                    symbol = self.symbol.as_deref(),
                    market_price = self.market_price,
                    thread_id = self.thread_id.as_deref(),
                    thread_id_session = self.thread_id_session.as_deref(),
                    order_id = self.order_id,
                    order_price = self.order_price,
                    "{}",
                    self.message
                )
            };
        }

        match self.level {
            LogLevel::Debug => emit_at!(debug),
            LogLevel::Warn => emit_at!(warn),
            LogLevel::Error => emit_at!(error),
        }
    }
}
