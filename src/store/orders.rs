//! Order procedures.

use super::TradeStore;
use crate::db::mapper;
use crate::db::params::ProcedureCall;
use crate::error::StoreResult;
use crate::models::{LastTwoSides, Order, OrderRef, Session};
use crate::report::LogContext;

/// Look-back window, in minutes, of `GetOrderTransactionCount`.
pub const ORDER_COUNT_WINDOW_MINUTES: i64 = -60;

impl TradeStore {
    /// Record an order placed by the session's thread.
    ///
    /// `source_order_id` links a sell to the buy it closes (0 for buys); `price` is the
    /// price the caller settled on, which may differ from `order.price`.
    pub async fn save_order(
        &self,
        session: &Session,
        order: &Order,
        source_order_id: i64,
        price: f64,
    ) -> StoreResult<()> {
        let call = ProcedureCall::new("SaveOrder")
            .arg(&order.client_order_id)
            .arg(order.cumulative_quote_quantity)
            .arg(order.executed_quantity)
            .arg(order.order_id)
            .arg(source_order_id)
            .arg(price)
            .arg(&order.side)
            .arg(&order.status)
            .arg(&order.symbol)
            .arg(order.transact_time)
            .arg(&session.thread_id)
            .arg(&session.thread_id_session);

        let ctx = LogContext::session(session).with_order(OrderRef::new(order.order_id, price));
        self.report(ctx, call.name(), self.invoker.execute(&call).await)
    }

    /// Update fill state of a stored order.
    pub async fn update_order(
        &self,
        session: &Session,
        order_id: i64,
        cumulative_quote_quantity: f64,
        executed_quantity: f64,
        price: f64,
        status: &str,
    ) -> StoreResult<()> {
        let call = ProcedureCall::new("UpdateOrder")
            .arg(order_id)
            .arg(cumulative_quote_quantity)
            .arg(executed_quantity)
            .arg(price)
            .arg(status);

        let ctx = LogContext::session(session).with_order(OrderRef::new(order_id, price));
        self.report(ctx, call.name(), self.invoker.execute(&call).await)
    }

    /// Order targeted by the session's forced sale.
    pub async fn get_order_by_order_id(&self, session: &Session) -> StoreResult<Order> {
        let call = ProcedureCall::new("GetOrderByOrderID")
            .arg(session.force_sell_order_id)
            .arg(&session.thread_id);

        let result = self.invoker.fetch_last(&call, mapper::order_by_id).await;
        let ctx = LogContext::session(session).with_order(OrderRef::id(session.force_sell_order_id));
        self.report(ctx, call.name(), result).map(Option::unwrap_or_default)
    }

    /// Symbol of the thread's most recent order.
    pub async fn get_order_symbol(&self, session: &Session) -> StoreResult<String> {
        let call = ProcedureCall::new("GetOrderSymbol").arg(&session.thread_id);

        let result = self.invoker.fetch_last(&call, |row| mapper::text(row, 0)).await;
        self.report(LogContext::session(session), call.name(), result)
            .map(Option::unwrap_or_default)
    }

    /// Order of the thread still waiting for a fill, as `(order_id, symbol)`.
    pub async fn get_order_transaction_pending(&self, session: &Session) -> StoreResult<Order> {
        let call = ProcedureCall::new("GetOrderTransactionPending").arg(&session.thread_id);

        let result = self.invoker.fetch_last(&call, mapper::order_pending).await;
        self.report(LogContext::session(session), call.name(), result)
            .map(Option::unwrap_or_default)
    }

    /// Orders on `side` placed by the thread in the last hour.
    ///
    /// The store computes the count as a decimal, so it is returned as `f64`.
    pub async fn get_order_transaction_count(
        &self,
        session: &Session,
        side: &str,
    ) -> StoreResult<f64> {
        let call = ProcedureCall::new("GetOrderTransactionCount")
            .arg(&session.thread_id)
            .arg(side)
            .arg(ORDER_COUNT_WINDOW_MINUTES);

        let result = self.invoker.fetch_last(&call, |row| mapper::number(row, 0)).await;
        self.report(LogContext::session(session), call.name(), result)
            .map(Option::unwrap_or_default)
    }

    /// Price of the thread's last order on `side`.
    pub async fn get_last_order_transaction_price(
        &self,
        session: &Session,
        side: &str,
    ) -> StoreResult<f64> {
        let call = ProcedureCall::new("GetLastOrderTransactionPrice")
            .arg(&session.thread_id)
            .arg(side);

        let result = self.invoker.fetch_last(&call, |row| mapper::number(row, 0)).await;
        self.report(LogContext::session(session), call.name(), result)
            .map(Option::unwrap_or_default)
    }

    /// Side of the thread's last order.
    pub async fn get_last_order_transaction_side(&self, session: &Session) -> StoreResult<String> {
        let call = ProcedureCall::new("GetLastOrderTransactionSide").arg(&session.thread_id);

        let result = self.invoker.fetch_last(&call, |row| mapper::text(row, 0)).await;
        self.report(LogContext::session(session), call.name(), result)
            .map(Option::unwrap_or_default)
    }

    /// Sides of the thread's two most recent orders.
    pub async fn get_order_transaction_side_last_two(
        &self,
        session: &Session,
    ) -> StoreResult<LastTwoSides> {
        let call = ProcedureCall::new("GetOrderTransactionSideLastTwo").arg(&session.thread_id);

        let result = self.invoker.fetch_last(&call, mapper::last_two_sides).await;
        self.report(LogContext::session(session), call.name(), result)
            .map(Option::unwrap_or_default)
    }
}
