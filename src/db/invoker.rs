//! Stored procedure invocation.
//!
//! Every store operation follows the same pattern:
//! - bind positional arguments to a named procedure
//! - execute it on the shared pool
//! - consume the rows with one of three strategies
//! - release the row cursor on every exit path
//!
//! # Row consumption
//!
//! | Strategy | Function | Used for |
//! |---|---|---|
//! | none | [`ProcedureInvoker::execute`] | writes |
//! | scalar tuple | [`last_row`] | lookups, counts, aggregates |
//! | many rows | [`collect_rows`] | order listings |
//!
//! [`first_flagged`] and [`liveness::first_unclaimed`](crate::db::liveness::first_unclaimed)
//! are early-exit variants of the scalar strategy.
//!
//! The strategies are generic over the row stream so they can be driven by any
//! `Stream<Item = Result<R, sqlx::Error>>`; [`ProcedureInvoker`] feeds them MySQL rows.

use crate::db::params::ProcedureCall;
use crate::error::{StoreError, StoreResult};
use futures_util::stream::BoxStream;
use futures_util::{Stream, StreamExt};
use sqlx::mysql::MySqlRow;
use sqlx::{Executor, MySqlPool};
use tracing::{debug, trace};

/// Scoped row cursor.
///
/// Holds the row stream of one procedure call. The stream is dropped exactly once,
/// either by [`close`](Self::close) or when the cursor goes out of scope.
pub struct RowCursor<S> {
    procedure: &'static str,
    stream: Option<S>,
}

impl<S> RowCursor<S> {
    pub fn new(procedure: &'static str, stream: S) -> Self {
        Self {
            procedure,
            stream: Some(stream),
        }
    }

    pub fn procedure(&self) -> &'static str {
        self.procedure
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Release the underlying stream. Later calls are no-ops.
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            trace!(procedure = self.procedure, "Row cursor released");
        }
    }
}

impl<S, R> RowCursor<S>
where
    S: Stream<Item = Result<R, sqlx::Error>> + Unpin,
{
    /// Next row, or `None` once the stream is exhausted or the cursor closed.
    pub async fn next_row(&mut self) -> Option<Result<R, sqlx::Error>> {
        match self.stream.as_mut() {
            Some(stream) => stream.next().await,
            None => None,
        }
    }
}

impl<S> Drop for RowCursor<S> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<S> std::fmt::Debug for RowCursor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowCursor")
            .field("procedure", &self.procedure)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Rows decoded from a many-row procedure.
///
/// Rows that decoded cleanly are kept even when a later one failed. `error` holds the
/// driver error that ended the scan, or else the decode error of the last row read.
#[derive(Debug)]
pub struct Partial<T> {
    pub value: T,
    pub error: Option<StoreError>,
}

impl<T> Partial<T> {
    pub fn complete(value: T) -> Self {
        Self { value, error: None }
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Drop the partial rows if the scan ended with an error.
    pub fn into_result(self) -> StoreResult<T> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.value),
        }
    }
}

// =============================================================================
// Consumption Strategies
// =============================================================================

/// Scalar strategy: decode every row, keep the last.
///
/// No row at all yields `Ok(None)`; a "not found" is not an error. When the last row
/// fails to decode, its error is returned. A driver error is returned even after rows
/// were read.
pub async fn last_row<S, R, T, F>(mut cursor: RowCursor<S>, mut decode: F) -> StoreResult<Option<T>>
where
    S: Stream<Item = Result<R, sqlx::Error>> + Unpin,
    F: FnMut(&R) -> Result<T, sqlx::Error>,
{
    let procedure = cursor.procedure();
    let mut value = None;
    let mut last_error = None;

    while let Some(row) = cursor.next_row().await {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                cursor.close();
                return Err(StoreError::query(procedure, e));
            }
        };
        match decode(&row) {
            Ok(v) => {
                value = Some(v);
                last_error = None;
            }
            Err(e) => last_error = Some(StoreError::decode(procedure, e)),
        }
    }
    cursor.close();

    match last_error {
        Some(err) => Err(err),
        None => Ok(value),
    }
}

/// Many-row strategy: decode every row in arrival order.
///
/// A driver error before the first row is returned as `Err`. Once rows have arrived, a
/// driver error ends the scan and is carried in the [`Partial`] next to the rows
/// decoded so far.
pub async fn collect_rows<S, R, T, F>(
    mut cursor: RowCursor<S>,
    mut decode: F,
) -> StoreResult<Partial<Vec<T>>>
where
    S: Stream<Item = Result<R, sqlx::Error>> + Unpin,
    F: FnMut(&R) -> Result<T, sqlx::Error>,
{
    let procedure = cursor.procedure();
    let mut rows = Vec::new();
    let mut received = 0usize;
    let mut last_error = None;

    while let Some(row) = cursor.next_row().await {
        let row = match row {
            Ok(row) => row,
            Err(e) if received == 0 => {
                cursor.close();
                return Err(StoreError::query(procedure, e));
            }
            Err(e) => {
                last_error = Some(StoreError::query(procedure, e));
                break;
            }
        };
        received += 1;
        match decode(&row) {
            Ok(v) => {
                rows.push(v);
                last_error = None;
            }
            Err(e) => last_error = Some(StoreError::decode(procedure, e)),
        }
    }
    cursor.close();

    if let Some(err) = &last_error {
        debug!(
            procedure,
            decoded = rows.len(),
            error = %err,
            "Returning partial rows"
        );
    }

    Ok(Partial {
        value: rows,
        error: last_error,
    })
}

/// Early-exit strategy for `(key, flag)` rows: the first flagged row wins.
///
/// Remaining rows are not read. Without a flagged row the result is `None`, or the
/// decode error of the last row if that row failed.
pub async fn first_flagged<S, R, F>(mut cursor: RowCursor<S>, mut decode: F) -> StoreResult<Option<String>>
where
    S: Stream<Item = Result<R, sqlx::Error>> + Unpin,
    F: FnMut(&R) -> Result<(String, bool), sqlx::Error>,
{
    let procedure = cursor.procedure();
    let mut last_error = None;

    while let Some(row) = cursor.next_row().await {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                cursor.close();
                return Err(StoreError::query(procedure, e));
            }
        };
        match decode(&row) {
            Ok((key, true)) => {
                cursor.close();
                return Ok(Some(key));
            }
            Ok((_, false)) => last_error = None,
            Err(e) => last_error = Some(StoreError::decode(procedure, e)),
        }
    }
    cursor.close();

    match last_error {
        Some(err) => Err(err),
        None => Ok(None),
    }
}

// =============================================================================
// MySQL Invoker
// =============================================================================

/// Issues procedure calls on the shared pool.
///
/// The schema qualifying each call is the isolation seam: tests point an invoker at a
/// dedicated schema (or a dedicated pool) instead of wrapping calls in a transaction.
#[derive(Debug, Clone)]
pub struct ProcedureInvoker {
    pool: MySqlPool,
    schema: String,
}

impl ProcedureInvoker {
    pub fn new(pool: MySqlPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Statement text for a call on this invoker's schema.
    pub fn statement(&self, call: &ProcedureCall) -> String {
        call.statement(&self.schema)
    }

    /// Run a procedure whose result rows, if any, are discarded.
    pub async fn execute(&self, call: &ProcedureCall) -> StoreResult<()> {
        let sql = self.statement(call);
        debug!(sql = %sql, params = call.args().len(), "Executing procedure");

        // When there are no arguments, execute raw SQL to avoid prepared statement issues
        let result = if call.args().is_empty() {
            (&self.pool).execute(sql.as_str()).await
        } else {
            call.bind(sqlx::query(&sql)).execute(&self.pool).await
        };

        result
            .map(|_| ())
            .map_err(|e| StoreError::query(call.name(), e))
    }

    /// Scalar strategy on MySQL rows.
    pub async fn fetch_last<T, F>(&self, call: &ProcedureCall, decode: F) -> StoreResult<Option<T>>
    where
        F: FnMut(&MySqlRow) -> Result<T, sqlx::Error>,
    {
        let sql = self.statement(call);
        last_row(self.open(call, &sql), decode).await
    }

    /// Many-row strategy on MySQL rows.
    pub async fn fetch_all<T, F>(
        &self,
        call: &ProcedureCall,
        decode: F,
    ) -> StoreResult<Partial<Vec<T>>>
    where
        F: FnMut(&MySqlRow) -> Result<T, sqlx::Error>,
    {
        let sql = self.statement(call);
        collect_rows(self.open(call, &sql), decode).await
    }

    /// First flagged row on MySQL rows.
    pub async fn fetch_first_flagged<F>(
        &self,
        call: &ProcedureCall,
        decode: F,
    ) -> StoreResult<Option<String>>
    where
        F: FnMut(&MySqlRow) -> Result<(String, bool), sqlx::Error>,
    {
        let sql = self.statement(call);
        first_flagged(self.open(call, &sql), decode).await
    }

    /// Open a row cursor for `call`. `sql` must be `self.statement(call)`.
    pub fn open<'a>(
        &'a self,
        call: &'a ProcedureCall,
        sql: &'a str,
    ) -> RowCursor<BoxStream<'a, Result<MySqlRow, sqlx::Error>>> {
        debug!(sql = %sql, params = call.args().len(), "Fetching procedure rows");

        let stream = if call.args().is_empty() {
            (&self.pool).fetch(sql)
        } else {
            call.bind(sqlx::query(sql)).fetch(&self.pool)
        };
        RowCursor::new(call.name(), stream)
    }
}
