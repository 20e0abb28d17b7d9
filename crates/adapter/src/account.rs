//! Account-level transport events: balances, positions, instruments,
//! session bootstrap and connection status.

use std::sync::Arc;

use connector_core::AdapterEvent;
use execution_core::{
    ExecutionInfo, HistoricalExecution, InstrumentSpec, MarginUpdate, OpenOrder, OrderRecord,
    OrderStatus, PositionUpdate, WalletUpdate,
};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::state::AdapterState;

/// Operator message when the request budget runs low.
pub fn rate_limit_message(remaining_percent: u32) -> String {
    format!(
        "Only {remaining_percent}% of your rate limit is left. \
         Please slow down for a while to stay within your rate limit"
    )
}

pub struct AccountHandler {
    state: Arc<AdapterState>,
}

impl AccountHandler {
    pub(crate) fn new(state: Arc<AdapterState>) -> Self {
        Self { state }
    }

    pub fn on_wallet(&self, update: &WalletUpdate) {
        let balances = self.state.balances.apply_wallet(update);
        debug!(currency = %update.currency, currencies = balances.len(), "wallet update");
        self.state.emit(AdapterEvent::Balance(balances));
    }

    pub fn on_margin(&self, update: &MarginUpdate) {
        let balances = self.state.balances.apply_margin(update);
        debug!(currency = %update.currency, currencies = balances.len(), "margin update");
        self.state.emit(AdapterEvent::Balance(balances));
    }

    pub fn on_position(&self, update: &PositionUpdate) {
        match self.state.instruments.merge_position(update) {
            Some(status) => self.state.emit(AdapterEvent::Status(status)),
            None => warn!(symbol = %update.symbol, "position update for unknown instrument"),
        }
    }

    pub fn on_instrument(&self, spec: InstrumentSpec) {
        self.state.instruments.upsert(spec);
    }

    pub fn on_rate_limit(&self, remaining_percent: u32) {
        warn!(remaining_percent, "rate limit running low");
        let message = rate_limit_message(remaining_percent);
        self.state.emit(AdapterEvent::order_failure(message));
    }

    pub fn on_connection_lost(&self) {
        warn!("connection to exchange lost");
        self.state.metrics.mark_connection_lost();
        self.state.emit(AdapterEvent::ConnectionLost {
            reason: "Connection lost".to_string(),
        });
    }

    pub fn on_connection_restored(&self) {
        info!("connection to exchange restored");
        self.state.metrics.mark_connection_restored();
        self.state.emit(AdapterEvent::ConnectionRestored);
    }

    /// Register orders that were already working before the session started.
    pub fn on_open_orders(&self, orders: Vec<OpenOrder>) {
        let now = self.state.now_ms();
        let mut loaded = 0usize;
        for order in orders {
            if self.state.orders.contains(&order.order_id) {
                debug!(order_id = %order.order_id, "open order already known");
                continue;
            }
            let mut record = OrderRecord::new(
                order.order_id.clone(),
                order.symbol,
                order.side,
                order.order_qty,
                order.price,
                order.stop_price,
                order.duration,
                now,
            );
            record.apply_fill(order.cum_qty, order.leaves_qty, None);
            record.set_status(OrderStatus::Working);

            if let Some(link) = &order.link {
                self.state
                    .links
                    .register_membership(&link.link_id, &order.order_id, link.contingency);
            }
            match self.state.announce_and_register(record) {
                Ok(()) => loaded += 1,
                Err(e) => warn!(order_id = %order.order_id, error = %e, "cannot load open order"),
            }
        }
        info!(count = loaded, "loaded open orders");
    }

    /// Replay finished orders so the front-end can show today's history.
    ///
    /// Replayed orders are published but never registered.
    pub fn on_history(&self, executions: Vec<HistoricalExecution>) {
        let count = executions.len();
        for execution in executions {
            if self.state.orders.contains(&execution.order_id) {
                continue;
            }
            let status = execution.final_status();
            let filled = (execution.order_qty - execution.leaves_qty).max(Decimal::ZERO);
            let mut record = OrderRecord::new(
                execution.order_id.clone(),
                execution.symbol.clone(),
                execution.side,
                execution.order_qty,
                execution.price,
                execution.stop_price,
                self.state.config.default_duration,
                execution.transact_time_ms,
            )
            .with_client_tag(execution.client_tag.clone())
            .with_modified_at(execution.transact_time_ms);
            record.apply_fill(filled, execution.leaves_qty, None);
            record.set_status(status);

            let snapshot = record.publish(execution.transact_time_ms);
            self.state.emit(AdapterEvent::OrderUpdated(snapshot));
            if status == OrderStatus::Filled {
                self.state.emit(AdapterEvent::OrderExecuted(ExecutionInfo {
                    order_id: execution.order_id,
                    quantity: execution.last_qty,
                    price: execution.last_price,
                    exec_id: execution.exec_id,
                    timestamp_ms: execution.transact_time_ms,
                }));
            }
        }
        debug!(count, "replayed execution history");
    }
}
