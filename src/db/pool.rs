//! Connection pool management.
//!
//! One `MySqlPool` is built per process and shared by every trading loop through the
//! injected [`TradeStore`](crate::store::TradeStore) handle. Its sizing is fixed: the
//! open-connection ceiling is the only admission control, and callers past it wait for a
//! connection to be released instead of failing.

use crate::config::{Config, DatabaseSettings};
use crate::error::{StoreError, StoreResult};
use sqlx::MySqlPool;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use std::time::Duration;
use tracing::{debug, info};

/// Maximum number of idle connections kept in the pool.
pub const MAX_IDLE_CONNECTIONS: u32 = 5;

/// Maximum number of open connections to the database.
pub const MAX_OPEN_CONNECTIONS: u32 = 7;

/// Maximum time a connection can remain open before it is recycled.
pub const MAX_CONNECTION_LIFETIME: Duration = Duration::from_secs(1800);

/// How long an acquire waits at capacity.
///
/// A bounded stand-in for blocking until a connection frees up. Past this wait sqlx
/// gives up with `PoolTimedOut`, which the invoker reports as a query error.
pub const ACQUIRE_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

/// Idle connections above the floor are closed after this long.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(600);

/// Sizing policy applied to every pool this crate builds.
///
/// At `max_open` callers wait for a free connection rather than failing fast. The wait
/// is capped at [`ACQUIRE_WAIT`], not unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolPolicy {
    pub max_idle: u32,
    pub max_open: u32,
    pub max_lifetime: Duration,
}

impl Default for PoolPolicy {
    fn default() -> Self {
        Self {
            max_idle: MAX_IDLE_CONNECTIONS,
            max_open: MAX_OPEN_CONNECTIONS,
            max_lifetime: MAX_CONNECTION_LIFETIME,
        }
    }
}

impl PoolPolicy {
    /// Pool options carrying this policy.
    ///
    /// sqlx has no idle-count cap; idle connections are reaped after [`IDLE_TIMEOUT`]
    /// and never kept warm, so the idle set stays below `max_idle` under normal load.
    pub fn pool_options(&self) -> MySqlPoolOptions {
        MySqlPoolOptions::new()
            .min_connections(0)
            .max_connections(self.max_open)
            .max_lifetime(Some(self.max_lifetime))
            .idle_timeout(Some(IDLE_TIMEOUT))
            .acquire_timeout(ACQUIRE_WAIT)
            .test_before_acquire(true)
    }
}

/// Builds the process-wide pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionPoolManager {
    policy: PoolPolicy,
}

impl ConnectionPoolManager {
    /// Create a manager with the fixed pool policy.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn policy(&self) -> PoolPolicy {
        self.policy
    }

    /// Validate configuration and open the pool.
    ///
    /// A configuration error is returned before any connection is attempted.
    pub async fn init(&self, config: &Config) -> StoreResult<MySqlPool> {
        let settings = config.database_settings()?;
        self.connect(&settings).await
    }

    /// Open the pool for already validated settings.
    pub async fn connect(&self, settings: &DatabaseSettings) -> StoreResult<MySqlPool> {
        info!(
            dsn = %settings.redacted_dsn(),
            max_open = self.policy.max_open,
            max_idle = self.policy.max_idle,
            max_lifetime_secs = self.policy.max_lifetime.as_secs(),
            "Opening connection pool"
        );

        let pool = self
            .connect_with(settings.connect_options())
            .await
            .map_err(|e| {
                StoreError::connection(
                    format!("Failed to open pool: {}", e),
                    connection_suggestion(&e),
                )
            })?;

        debug!("Connection pool ready");
        Ok(pool)
    }

    /// Open a pool with explicit connect options (used for isolated test databases).
    pub async fn connect_with(
        &self,
        options: MySqlConnectOptions,
    ) -> Result<MySqlPool, sqlx::Error> {
        self.policy.pool_options().connect_with(options).await
    }
}

/// Generate a helpful suggestion for connection errors.
fn connection_suggestion(error: &sqlx::Error) -> String {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        return "Check that the MySQL server is running and DB_TCP_HOST/DB_PORT are correct"
            .to_string();
    }

    if error_str.contains("no such file") {
        return "Check DB_SOCKET_DIR and INSTANCE_CONNECTION_NAME; is the Cloud SQL proxy running?"
            .to_string();
    }

    if error_str.contains("access denied") || error_str.contains("password") {
        return "Verify DB_USER and DB_PASS".to_string();
    }

    if error_str.contains("unknown database") {
        return "Check that DB_NAME exists".to_string();
    }

    "Verify the DB_* environment variables".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_defaults() {
        let policy = PoolPolicy::default();
        assert_eq!(policy.max_idle, 5);
        assert_eq!(policy.max_open, 7);
        assert_eq!(policy.max_lifetime, Duration::from_secs(1800));
    }

    #[test]
    fn test_pool_options_apply_policy() {
        let options = PoolPolicy::default().pool_options();
        assert_eq!(options.get_max_connections(), MAX_OPEN_CONNECTIONS);
        assert_eq!(options.get_min_connections(), 0);
        assert_eq!(options.get_max_lifetime(), Some(MAX_CONNECTION_LIFETIME));
        assert_eq!(options.get_acquire_timeout(), ACQUIRE_WAIT);
    }

    #[test]
    fn test_exhausted_acquire_wait_surfaces_as_query_error() {
        assert!(ACQUIRE_WAIT >= Duration::from_secs(60 * 60));

        let err = StoreError::query("GetThreadCount", sqlx::Error::PoolTimedOut);
        assert!(err.is_query());
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_init_rejects_missing_configuration_before_connecting() {
        // No variables at all: must fail on configuration, never reach the driver.
        let manager = ConnectionPoolManager::new();
        let result = manager.init(&Config::default()).await;
        assert!(matches!(result, Err(StoreError::Configuration { .. })));
    }

    #[test]
    fn test_connection_suggestion() {
        let err = sqlx::Error::Protocol("Access denied for user 'bot'".to_string());
        assert_eq!(connection_suggestion(&err), "Verify DB_USER and DB_PASS");

        let err = sqlx::Error::PoolTimedOut;
        assert_eq!(
            connection_suggestion(&err),
            "Verify the DB_* environment variables"
        );
    }
}
