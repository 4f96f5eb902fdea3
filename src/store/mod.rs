//! Trade store operations.
//!
//! [`TradeStore`] is the handle every trading loop shares. It owns the procedure
//! invoker (pool and schema) and the liveness probe used when adopting threads.
//! Operations are grouped by the tables their procedures touch:
//!
//! - [`orders`] - order rows and order-derived lookups
//! - [`sessions`] - session rows, thread status and adoption
//! - [`global`] - global profit rows and profit aggregates
//! - [`transactions`] - per-thread open transactions
//!
//! Every failed call is reported once through [`LogEntry`] and then returned unchanged.

pub mod global;
pub mod orders;
pub mod sessions;
pub mod transactions;

use crate::config::DEFAULT_PROCEDURE_SCHEMA;
use crate::db::invoker::{Partial, ProcedureInvoker};
use crate::db::liveness::{LivenessProbe, LockFileProbe};
use crate::error::StoreResult;
use crate::report::{LogContext, LogEntry};
use sqlx::MySqlPool;
use std::sync::Arc;

/// Shared handle to the trade store.
#[derive(Debug, Clone)]
pub struct TradeStore {
    invoker: ProcedureInvoker,
    probe: Arc<dyn LivenessProbe>,
}

impl TradeStore {
    /// Store on `schema`, probing lock files in the working directory.
    pub fn new(pool: MySqlPool, schema: impl Into<String>) -> Self {
        Self {
            invoker: ProcedureInvoker::new(pool, schema),
            probe: Arc::new(LockFileProbe::new(".")),
        }
    }

    /// Store on the default `cryptopump` schema.
    pub fn with_default_schema(pool: MySqlPool) -> Self {
        Self::new(pool, DEFAULT_PROCEDURE_SCHEMA)
    }

    /// Replace the liveness probe.
    pub fn with_probe(mut self, probe: Arc<dyn LivenessProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Same pool and probe, calls routed to another schema.
    ///
    /// Integration tests use this to run against a scratch copy of the procedures.
    pub fn isolated(&self, schema: impl Into<String>) -> Self {
        Self {
            invoker: ProcedureInvoker::new(self.invoker.pool().clone(), schema),
            probe: self.probe.clone(),
        }
    }

    pub fn invoker(&self) -> &ProcedureInvoker {
        &self.invoker
    }

    pub fn pool(&self) -> &MySqlPool {
        self.invoker.pool()
    }

    pub fn schema(&self) -> &str {
        self.invoker.schema()
    }

    pub fn probe(&self) -> &dyn LivenessProbe {
        self.probe.as_ref()
    }

    /// Log a failed result once, then hand it back untouched.
    fn report<T>(
        &self,
        ctx: LogContext<'_>,
        operation: &str,
        result: StoreResult<T>,
    ) -> StoreResult<T> {
        if let Err(err) = &result {
            LogEntry::failure(ctx, operation, err).emit();
        }
        result
    }

    /// Log the error carried by a partial result, if any.
    fn report_partial<T>(
        &self,
        ctx: LogContext<'_>,
        operation: &str,
        result: StoreResult<Partial<T>>,
    ) -> StoreResult<Partial<T>> {
        match &result {
            Ok(Partial {
                error: Some(err), ..
            }) => LogEntry::failure(ctx, operation, err).emit(),
            Err(err) => LogEntry::failure(ctx, operation, err).emit(),
            Ok(_) => {}
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use sqlx::mysql::MySqlPoolOptions;

    #[derive(Debug)]
    struct NobodyHome;

    impl LivenessProbe for NobodyHome {
        fn is_claimed(&self, _thread_id: &str) -> bool {
            false
        }
    }

    fn lazy_pool() -> MySqlPool {
        // Never connects; only used to build handles.
        let settings = Config {
            db_tcp_host: Some("127.0.0.1".to_string()),
            db_port: Some("3306".to_string()),
            db_user: Some("bot".to_string()),
            db_pass: Some("secret".to_string()),
            db_name: Some("trading".to_string()),
            ..Config::default_config()
        }
        .database_settings()
        .unwrap();
        MySqlPoolOptions::new().connect_lazy_with(settings.connect_options())
    }

    #[tokio::test]
    async fn test_isolated_store_keeps_pool_and_probe() {
        let store = TradeStore::with_default_schema(lazy_pool()).with_probe(Arc::new(NobodyHome));
        assert_eq!(store.schema(), "cryptopump");

        let isolated = store.isolated("cryptopump_test");
        assert_eq!(isolated.schema(), "cryptopump_test");
        assert_eq!(store.schema(), "cryptopump");
        assert!(!isolated.probe().is_claimed("anything"));
    }

    #[tokio::test]
    async fn test_report_returns_error_unchanged() {
        let store = TradeStore::new(lazy_pool(), "cryptopump");
        let err = crate::error::StoreError::query(
            "GetThreadCount",
            sqlx::Error::Protocol("lost".to_string()),
        );
        let result: StoreResult<i64> = store.report(LogContext::none(), "GetThreadCount", Err(err));
        match result {
            Err(crate::error::StoreError::Query { procedure, message, .. }) => {
                assert_eq!(procedure, "GetThreadCount");
                assert!(message.ends_with("lost"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
