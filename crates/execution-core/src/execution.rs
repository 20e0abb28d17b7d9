//! Execution reports delivered by the exchange.
//!
//! Each report kind is a variant of [`ExecutionKind`], so the state machine
//! must handle every kind explicitly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::order::{OrderDuration, OrderKind, OrderSide, OrderStatus};

/// Contingency relationship inside a link group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContingencyType {
    /// Any member's fill or cancel cancels the others.
    OneCancelsTheOther,
    /// This member's fill activates the other members.
    OneTriggersTheOther,
}

impl ContingencyType {
    pub fn from_exchange_str(s: &str) -> Option<Self> {
        match s {
            "OneCancelsTheOther" => Some(Self::OneCancelsTheOther),
            "OneTriggersTheOther" => Some(Self::OneTriggersTheOther),
            _ => None,
        }
    }

    pub fn as_exchange_str(&self) -> &'static str {
        match self {
            Self::OneCancelsTheOther => "OneCancelsTheOther",
            Self::OneTriggersTheOther => "OneTriggersTheOther",
        }
    }

    /// Whether a member with this contingency is the trigger parent.
    pub fn is_trigger_parent(&self) -> bool {
        matches!(self, Self::OneTriggersTheOther)
    }
}

/// The exchange's `triggered` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TriggerState {
    /// Empty field: nothing pending.
    #[default]
    None,
    /// Untriggered bracket contingent.
    NotTriggered,
    /// A stop order's trigger price was hit.
    StopOrderTriggered,
    /// A bracket contingent was activated by its parent.
    Triggered,
}

impl TriggerState {
    pub fn from_exchange_str(s: &str) -> Self {
        match s {
            "NotTriggered" => Self::NotTriggered,
            "StopOrderTriggered" => Self::StopOrderTriggered,
            "Triggered" => Self::Triggered,
            _ => Self::None,
        }
    }
}

/// Status the exchange attaches to a trade report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportedOrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
}

impl ReportedOrderStatus {
    pub fn from_exchange_str(s: &str) -> Option<Self> {
        match s {
            "New" => Some(Self::New),
            "PartiallyFilled" => Some(Self::PartiallyFilled),
            "Filled" => Some(Self::Filled),
            "Canceled" => Some(Self::Canceled),
            "Rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Link group data carried by a `New` report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkInfo {
    pub link_id: String,
    pub contingency: ContingencyType,
}

/// Quantities and prices carried by a replace or restate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amendment {
    pub leaves_qty: Decimal,
    /// New total quantity, when the exchange reports it.
    pub order_qty: Option<Decimal>,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
}

/// A single fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeFill {
    pub exec_id: String,
    pub last_qty: Decimal,
    pub last_price: Decimal,
    pub cum_qty: Decimal,
    pub leaves_qty: Decimal,
    pub avg_price: Option<Decimal>,
    pub order_status: ReportedOrderStatus,
}

/// What happened to the order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionKind {
    /// Exchange accepted the order and assigned its real identifier.
    New {
        link: Option<LinkInfo>,
        /// Peg offset when the order is a trailing stop.
        trailing_offset: Option<Decimal>,
        triggered: TriggerState,
    },
    Replaced(Amendment),
    Restated(Amendment),
    Trade(TradeFill),
    Canceled { reason: Option<String> },
    TriggeredOrActivatedBySystem { triggered: TriggerState },
    Rejected { reason: String },
}

impl ExecutionKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::New { .. } => "New",
            Self::Replaced(_) => "Replaced",
            Self::Restated(_) => "Restated",
            Self::Trade(_) => "Trade",
            Self::Canceled { .. } => "Canceled",
            Self::TriggeredOrActivatedBySystem { .. } => "TriggeredOrActivatedBySystem",
            Self::Rejected { .. } => "Rejected",
        }
    }
}

/// Execution report from the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Exchange-assigned order identifier.
    pub order_id: String,
    /// Client identifier the order was submitted with (the temporary id).
    pub client_order_id: String,
    pub symbol: String,
    pub event_time_ms: i64,
    pub kind: ExecutionKind,
}

impl ExecutionReport {
    pub fn new(
        order_id: impl Into<String>,
        client_order_id: impl Into<String>,
        symbol: impl Into<String>,
        event_time_ms: i64,
        kind: ExecutionKind,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            client_order_id: client_order_id.into(),
            symbol: symbol.into(),
            event_time_ms,
            kind,
        }
    }

    /// Check if this report carries a fill.
    pub fn has_fill(&self) -> bool {
        matches!(&self.kind, ExecutionKind::Trade(fill) if fill.last_qty > Decimal::ZERO)
    }
}

/// Execution event published to the front-end for every fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionInfo {
    pub order_id: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub exec_id: String,
    pub timestamp_ms: i64,
}

/// An order already working on the exchange when the session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenOrder {
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub order_qty: Decimal,
    pub cum_qty: Decimal,
    pub leaves_qty: Decimal,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub link: Option<LinkInfo>,
    pub duration: OrderDuration,
}

/// A past execution replayed from the exchange history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalExecution {
    pub order_id: String,
    pub exec_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub client_tag: Option<String>,
    pub order_qty: Decimal,
    pub leaves_qty: Decimal,
    pub last_qty: Decimal,
    pub last_price: Decimal,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub order_status: ReportedOrderStatus,
    pub transact_time_ms: i64,
}

impl HistoricalExecution {
    pub fn kind(&self) -> OrderKind {
        OrderKind::from_prices(self.price, self.stop_price)
    }

    /// Terminal status the replayed order is shown with.
    pub fn final_status(&self) -> OrderStatus {
        if self.order_status == ReportedOrderStatus::Filled {
            OrderStatus::Filled
        } else {
            OrderStatus::Cancelled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn make_trade(last_qty: Decimal) -> ExecutionReport {
        ExecutionReport::new(
            "ord-1",
            "1-temp-0",
            "XBTUSD",
            1000,
            ExecutionKind::Trade(TradeFill {
                exec_id: "exec-1".into(),
                last_qty,
                last_price: dec!(50000),
                cum_qty: last_qty,
                leaves_qty: dec!(100) - last_qty,
                avg_price: Some(dec!(50000)),
                order_status: ReportedOrderStatus::PartiallyFilled,
            }),
        )
    }

    #[test]
    fn test_has_fill() {
        assert!(make_trade(dec!(10)).has_fill());
        assert!(!make_trade(dec!(0)).has_fill());

        let cancel = ExecutionReport::new(
            "ord-1",
            "1-temp-0",
            "XBTUSD",
            1000,
            ExecutionKind::Canceled { reason: None },
        );
        assert!(!cancel.has_fill());
    }

    #[test]
    fn test_trigger_state_parsing() {
        assert_eq!(
            TriggerState::from_exchange_str("NotTriggered"),
            TriggerState::NotTriggered
        );
        assert_eq!(
            TriggerState::from_exchange_str("StopOrderTriggered"),
            TriggerState::StopOrderTriggered
        );
        assert_eq!(TriggerState::from_exchange_str(""), TriggerState::None);
    }

    #[test]
    fn test_contingency_parent() {
        assert!(ContingencyType::OneTriggersTheOther.is_trigger_parent());
        assert!(!ContingencyType::OneCancelsTheOther.is_trigger_parent());
        assert_eq!(
            ContingencyType::from_exchange_str("OneCancelsTheOther"),
            Some(ContingencyType::OneCancelsTheOther)
        );
    }

    #[test]
    fn test_historical_final_status() {
        let mut exec = HistoricalExecution {
            order_id: "ord-9".into(),
            exec_id: "exec-9".into(),
            symbol: "XBTUSD".into(),
            side: OrderSide::Sell,
            client_tag: None,
            order_qty: dec!(10),
            leaves_qty: dec!(0),
            last_qty: dec!(10),
            last_price: dec!(51000),
            price: Some(dec!(51000)),
            stop_price: None,
            order_status: ReportedOrderStatus::Filled,
            transact_time_ms: 5,
        };
        assert_eq!(exec.final_status(), OrderStatus::Filled);
        assert_eq!(exec.kind(), OrderKind::Limit);

        exec.order_status = ReportedOrderStatus::Canceled;
        assert_eq!(exec.final_status(), OrderStatus::Cancelled);
    }
}
