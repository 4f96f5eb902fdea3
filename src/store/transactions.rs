//! Thread transaction procedures.
//!
//! A thread transaction is a buy the thread still holds. Rows are written when a buy
//! fills and deleted when the matching sell closes it.

use super::TradeStore;
use crate::db::invoker::Partial;
use crate::db::mapper::{self, AMOUNT_PLACES};
use crate::db::params::ProcedureCall;
use crate::error::StoreResult;
use crate::models::{Market, Order, OrderRef, Session};
use crate::report::LogContext;

impl TradeStore {
    pub async fn save_thread_transaction(
        &self,
        session: &Session,
        order_id: i64,
        cumulative_quote_quantity: f64,
        price: f64,
        executed_quantity: f64,
    ) -> StoreResult<()> {
        let call = ProcedureCall::new("SaveThreadTransaction")
            .arg(&session.thread_id)
            .arg(&session.thread_id_session)
            .arg(order_id)
            .arg(cumulative_quote_quantity)
            .arg(price)
            .arg(executed_quantity);

        let ctx = LogContext::session(session).with_order(OrderRef::new(order_id, price));
        self.report(ctx, call.name(), self.invoker.execute(&call).await)
    }

    pub async fn delete_thread_transaction_by_order_id(
        &self,
        session: &Session,
        order_id: i64,
    ) -> StoreResult<()> {
        let call = ProcedureCall::new("DeleteThreadTransactionByOrderID").arg(order_id);

        let ctx = LogContext::session(session).with_order(OrderRef::id(order_id));
        self.report(ctx, call.name(), self.invoker.execute(&call).await)
    }

    /// Number of open transactions of the thread.
    pub async fn get_thread_transaction_count(&self, session: &Session) -> StoreResult<i64> {
        let call = ProcedureCall::new("GetThreadTransactionCount").arg(&session.thread_id);

        let result = self.invoker.fetch_last(&call, |row| mapper::integer(row, 0)).await;
        self.report(LogContext::session(session), call.name(), result)
            .map(Option::unwrap_or_default)
    }

    /// Open transaction of the thread selected by the store against the market price.
    pub async fn get_thread_transaction_by_price(
        &self,
        market: &Market,
        session: &Session,
    ) -> StoreResult<Order> {
        self.order_against_market("GetThreadTransactionByPrice", market, session)
            .await
    }

    /// Highest priced open transaction of the thread above the market price.
    pub async fn get_thread_transaction_by_price_higher(
        &self,
        market: &Market,
        session: &Session,
    ) -> StoreResult<Order> {
        self.order_against_market("GetThreadTransactionByPriceHigher", market, session)
            .await
    }

    async fn order_against_market(
        &self,
        name: &'static str,
        market: &Market,
        session: &Session,
    ) -> StoreResult<Order> {
        let call = ProcedureCall::new(name)
            .arg(&session.thread_id)
            .arg(market.price);

        let result = self.invoker.fetch_last(&call, mapper::order_snapshot).await;
        let ctx = LogContext::session(session).with_market(market);
        self.report(ctx, call.name(), result)
            .map(Option::unwrap_or_default)
    }

    /// Most recent open buy of the thread.
    pub async fn get_thread_last_transaction(&self, session: &Session) -> StoreResult<Order> {
        let call = ProcedureCall::new("GetThreadLastTransaction").arg(&session.thread_id);

        let result = self.invoker.fetch_last(&call, mapper::order_snapshot).await;
        self.report(LogContext::session(session), call.name(), result)
            .map(Option::unwrap_or_default)
    }

    /// Open transactions of the thread bought above `price`.
    pub async fn get_thread_transaction_upmarket_price_count(
        &self,
        session: &Session,
        price: f64,
    ) -> StoreResult<i64> {
        // Procedure name carries a typo in the deployed schema.
        let call = ProcedureCall::new("GetThreadTransactiontUpmarketPriceCount")
            .arg(&session.thread_id)
            .arg(price);

        let result = self.invoker.fetch_last(&call, |row| mapper::integer(row, 0)).await;
        self.report(LogContext::session(session), call.name(), result)
            .map(Option::unwrap_or_default)
    }

    /// Every open transaction of the thread, in store order.
    ///
    /// Quote quantities are rounded to cents and prices to three decimals. Rows decoded
    /// before a failing row are kept in the returned [`Partial`].
    pub async fn get_thread_transaction_by_thread_id(
        &self,
        session: &Session,
    ) -> StoreResult<Partial<Vec<Order>>> {
        let call = ProcedureCall::new("GetThreadTransactionByThreadID").arg(&session.thread_id);

        let result = self.invoker.fetch_all(&call, mapper::order_listing).await;
        self.report_partial(LogContext::session(session), call.name(), result)
    }

    /// Dollar amount committed across every open transaction, rounded to cents.
    pub async fn get_thread_transaction_amount(&self, session: &Session) -> StoreResult<f64> {
        let call = ProcedureCall::new("GetThreadTransactionAmount");

        let result = self
            .invoker
            .fetch_last(&call, |row| {
                Ok(mapper::round_places(mapper::number(row, 0)?, AMOUNT_PLACES))
            })
            .await;
        self.report(LogContext::session(session), call.name(), result)
            .map(Option::unwrap_or_default)
    }
}
