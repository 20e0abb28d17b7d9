//! Background delivery of transport events.

use std::sync::Arc;

use connector_core::{AdapterEvent, ConnectorError, TransportEvent, TransportReceiver};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::account::AccountHandler;
use crate::processor::ExecutionReportProcessor;
use crate::state::AdapterState;

/// Routes each transport event to the component that owns it.
pub struct TransportRouter {
    state: Arc<AdapterState>,
    processor: ExecutionReportProcessor,
    account: AccountHandler,
}

impl TransportRouter {
    pub(crate) fn new(state: Arc<AdapterState>) -> Self {
        Self {
            processor: ExecutionReportProcessor::new(state.clone()),
            account: AccountHandler::new(state.clone()),
            state,
        }
    }

    pub fn handle(&self, event: TransportEvent) {
        match event {
            TransportEvent::Execution(report) => self.processor.process(report),
            TransportEvent::Position(update) => self.account.on_position(&update),
            TransportEvent::Wallet(update) => self.account.on_wallet(&update),
            TransportEvent::Margin(update) => self.account.on_margin(&update),
            TransportEvent::Market(event) => self.state.emit(AdapterEvent::Market(event)),
            TransportEvent::Instrument(spec) => self.account.on_instrument(spec),
            TransportEvent::OpenOrders(orders) => self.account.on_open_orders(orders),
            TransportEvent::ExecutionHistory(executions) => self.account.on_history(executions),
            TransportEvent::RateLimitWarning { remaining_percent } => {
                self.account.on_rate_limit(remaining_percent)
            }
            TransportEvent::ConnectionLost => self.account.on_connection_lost(),
            TransportEvent::ConnectionRestored => self.account.on_connection_restored(),
        }
    }
}

/// Consume transport events until shutdown or until the transport goes away.
pub async fn run_report_pump(
    router: Arc<TransportRouter>,
    mut receiver: TransportReceiver,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<(), ConnectorError> {
    info!("report pump started");

    loop {
        tokio::select! {
            biased;

            changed = shutdown_rx.changed() => {
                // A dropped sender means the adapter is gone.
                if changed.is_err() || *shutdown_rx.borrow() {
                    info!("report pump shutting down");
                    return Ok(());
                }
            }

            event = receiver.recv() => match event {
                Some(event) => router.handle(event),
                None => {
                    warn!("transport channel closed");
                    return Err(ConnectorError::ChannelClosed);
                }
            },
        }
    }
}
