//! Events flowing into the adapter from the transport, and out of it to the
//! front-end.

use execution_core::{
    BalanceSnapshot, ExecutionInfo, ExecutionReport, HistoricalExecution, InstrumentSpec,
    MarginUpdate, OpenOrder, OrderSnapshot, PositionUpdate, StatusInfo, WalletUpdate,
};
use model::MarketEvent;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

/// Decoded message delivered by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Execution(ExecutionReport),
    Position(PositionUpdate),
    Wallet(WalletUpdate),
    Margin(MarginUpdate),
    Market(MarketEvent),
    /// Instrument parameters became known (tick size, multiplier).
    Instrument(InstrumentSpec),
    /// Orders already working when the session (re)started.
    OpenOrders(Vec<OpenOrder>),
    ExecutionHistory(Vec<HistoricalExecution>),
    /// Remaining share of the request budget, in percent.
    RateLimitWarning { remaining_percent: u32 },
    ConnectionLost,
    ConnectionRestored,
}

/// Category attached to operator text messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextCategory {
    OrderFailure,
    Info,
    Unclassified,
}

/// Event published to the front-end.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterEvent {
    OrderUpdated(OrderSnapshot),
    OrderExecuted(ExecutionInfo),
    Status(StatusInfo),
    /// Every known currency, not only the one that changed.
    Balance(Vec<BalanceSnapshot>),
    SystemText {
        message: String,
        category: TextCategory,
    },
    ConnectionLost {
        reason: String,
    },
    ConnectionRestored,
    Market(MarketEvent),
}

impl AdapterEvent {
    pub fn text(message: impl Into<String>, category: TextCategory) -> Self {
        Self::SystemText {
            message: message.into(),
            category,
        }
    }

    pub fn order_failure(message: impl Into<String>) -> Self {
        Self::text(message, TextCategory::OrderFailure)
    }
}

/// Receiver of front-end events.
///
/// Publishing never blocks the caller and never drops an event while the
/// receiver is alive.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: AdapterEvent);
}

impl EventSink for mpsc::UnboundedSender<AdapterEvent> {
    fn publish(&self, event: AdapterEvent) {
        if self.send(event).is_err() {
            debug!("event receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_sink() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.publish(AdapterEvent::ConnectionRestored);
        assert_eq!(rx.try_recv().unwrap(), AdapterEvent::ConnectionRestored);

        drop(rx);
        // Publishing after the receiver is gone is not an error.
        tx.publish(AdapterEvent::ConnectionRestored);
    }

    #[test]
    fn test_sink_keeps_every_event_without_a_reader() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        for n in 0..10_000 {
            tx.publish(AdapterEvent::order_failure(format!("failure {n}")));
        }

        let mut received = 0;
        while let Ok(event) = rx.try_recv() {
            assert_eq!(event, AdapterEvent::order_failure(format!("failure {received}")));
            received += 1;
        }
        assert_eq!(received, 10_000);
    }
}
