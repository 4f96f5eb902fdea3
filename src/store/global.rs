//! Global profit procedures.

use super::TradeStore;
use crate::db::mapper;
use crate::db::params::ProcedureCall;
use crate::error::StoreResult;
use crate::models::{Global, ProfitSummary, Session, ThreadProfit};
use crate::report::LogContext;
use chrono::Utc;

impl TradeStore {
    /// Insert the session's global profit, stamped with the current time.
    pub async fn save_global(&self, session: &Session) -> StoreResult<()> {
        let call = global_call("SaveGlobal", &session.global, Utc::now().timestamp());
        self.report(
            LogContext::session(session),
            call.name(),
            self.invoker.execute(&call).await,
        )
    }

    /// Overwrite the global profit row, stamped with the current time.
    pub async fn update_global(&self, session: &Session) -> StoreResult<()> {
        let call = global_call("UpdateGlobal", &session.global, Utc::now().timestamp());
        self.report(
            LogContext::session(session),
            call.name(),
            self.invoker.execute(&call).await,
        )
    }

    /// The stored global profit row.
    pub async fn get_global(&self, session: &Session) -> StoreResult<Global> {
        let call = ProcedureCall::new("GetGlobal");

        let result = self.invoker.fetch_last(&call, mapper::global).await;
        self.report(LogContext::session(session), call.name(), result)
            .map(Option::unwrap_or_default)
    }

    /// Profit aggregated over every thread, percentage already scaled to 0..100.
    pub async fn get_profit(&self, session: &Session) -> StoreResult<ProfitSummary> {
        let call = ProcedureCall::new("GetProfit");

        let result = self.invoker.fetch_last(&call, mapper::profit_summary).await;
        self.report(LogContext::session(session), call.name(), result)
            .map(Option::unwrap_or_default)
    }

    /// Profit of the session's thread. A thread without closed trades yields zeros.
    pub async fn get_profit_by_thread_id(&self, session: &Session) -> StoreResult<ThreadProfit> {
        let call = ProcedureCall::new("GetProfitByThreadID").arg(&session.thread_id);

        let result = self.invoker.fetch_last(&call, mapper::thread_profit).await;
        self.report(LogContext::session(session), call.name(), result)
            .map(Option::unwrap_or_default)
    }
}

fn global_call(name: &'static str, global: &Global, now: i64) -> ProcedureCall {
    ProcedureCall::new(name)
        .arg(global.profit)
        .arg(global.profit_net)
        .arg(global.profit_pct)
        .arg(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::params::ProcArg;

    #[test]
    fn test_global_call_carries_timestamp_last() {
        let global = Global {
            profit: 12.5,
            profit_net: 11.0,
            profit_pct: 1.25,
            transact_time: 0,
        };
        let call = global_call("SaveGlobal", &global, 1_700_000_000);
        assert_eq!(
            call.args(),
            &[
                ProcArg::Float(12.5),
                ProcArg::Float(11.0),
                ProcArg::Float(1.25),
                ProcArg::Int(1_700_000_000),
            ]
        );
    }
}
