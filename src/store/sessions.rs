//! Session procedures and thread adoption.

use super::TradeStore;
use crate::db::params::ProcedureCall;
use crate::db::{liveness, mapper};
use crate::error::StoreResult;
use crate::models::{ExchangeConfig, Session, ThreadIdentity};
use crate::report::LogContext;

impl TradeStore {
    /// Insert the session row of a starting thread.
    pub async fn save_session(&self, config: &ExchangeConfig, session: &Session) -> StoreResult<()> {
        let call = session_call("SaveSession", config, session);
        let ctx = LogContext::session(session).with_config(config);
        self.report(ctx, call.name(), self.invoker.execute(&call).await)
    }

    /// Overwrite the session row with the thread's current funds and status.
    pub async fn update_session(
        &self,
        config: &ExchangeConfig,
        session: &Session,
    ) -> StoreResult<()> {
        let call = session_call("UpdateSession", config, session);
        let ctx = LogContext::session(session).with_config(config);
        self.report(ctx, call.name(), self.invoker.execute(&call).await)
    }

    pub async fn delete_session(&self, session: &Session) -> StoreResult<()> {
        let call = ProcedureCall::new("DeleteSession").arg(&session.thread_id);
        self.report(
            LogContext::session(session),
            call.name(),
            self.invoker.execute(&call).await,
        )
    }

    /// Thread id of the first session flagged by the store, if any.
    ///
    /// Rows after the first flagged one are not read.
    pub async fn get_session_status(&self, session: &Session) -> StoreResult<Option<String>> {
        let call = ProcedureCall::new("GetSessionStatus");

        let result = self
            .invoker
            .fetch_first_flagged(&call, mapper::session_status)
            .await;
        self.report(LogContext::session(session), call.name(), result)
    }

    /// First recorded thread whose owning process is gone.
    ///
    /// Returns an empty [`ThreadIdentity`] when every recorded thread is still claimed.
    pub async fn get_thread_transaction_distinct(
        &self,
        session: &Session,
    ) -> StoreResult<ThreadIdentity> {
        let call = ProcedureCall::new("GetThreadTransactionDistinct");
        let sql = self.invoker.statement(&call);

        let cursor = self.invoker.open(&call, &sql);
        let result =
            liveness::first_unclaimed(cursor, mapper::thread_identity, self.probe.as_ref()).await;
        self.report(LogContext::session(session), call.name(), result)
    }

    /// Number of threads recorded as running.
    pub async fn get_thread_count(&self, session: &Session) -> StoreResult<i64> {
        let call = ProcedureCall::new("GetThreadCount");

        let result = self.invoker.fetch_last(&call, |row| mapper::integer(row, 0)).await;
        self.report(LogContext::session(session), call.name(), result)
            .map(Option::unwrap_or_default)
    }
}

fn session_call(name: &'static str, config: &ExchangeConfig, session: &Session) -> ProcedureCall {
    ProcedureCall::new(name)
        .arg(&session.thread_id)
        .arg(&session.thread_id_session)
        .arg(&config.exchange_name)
        .arg(&session.symbol_fiat)
        .arg(session.symbol_fiat_funds)
        .arg(session.diff_total)
        .arg(session.status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::params::ProcArg;

    #[test]
    fn test_session_call_argument_order() {
        let mut session = Session::new("bot-1", "s-1");
        session.symbol_fiat = "USDT".to_string();
        session.symbol_fiat_funds = 1500.0;
        session.diff_total = -12.5;
        session.status = true;

        let call = session_call("UpdateSession", &ExchangeConfig::new("binance"), &session);
        assert_eq!(
            call.args(),
            &[
                ProcArg::Text("bot-1".to_string()),
                ProcArg::Text("s-1".to_string()),
                ProcArg::Text("binance".to_string()),
                ProcArg::Text("USDT".to_string()),
                ProcArg::Float(1500.0),
                ProcArg::Float(-12.5),
                ProcArg::Bool(true),
            ]
        );
        assert_eq!(
            call.statement("cryptopump"),
            "CALL cryptopump.UpdateSession(?,?,?,?,?,?,?)"
        );
    }
}
