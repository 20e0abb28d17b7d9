//! Order types, status enums and the canonical order record.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Convert from the exchange string representation.
    pub fn from_exchange_str(s: &str) -> Option<Self> {
        match s {
            "Buy" => Some(Self::Buy),
            "Sell" => Some(Self::Sell),
            _ => None,
        }
    }

    /// Convert to the exchange string representation.
    pub fn as_exchange_str(&self) -> &'static str {
        match self {
            Self::Buy => "Buy",
            Self::Sell => "Sell",
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    pub fn is_buy(&self) -> bool {
        matches!(self, Self::Buy)
    }
}

/// Order kind, derived from which of limit/stop price is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    Market,
    Limit,
    Stop,
    StopLimit,
}

impl OrderKind {
    /// Derive the kind from the presence of a limit and/or stop price.
    pub fn from_prices(limit_price: Option<Decimal>, stop_price: Option<Decimal>) -> Self {
        match (limit_price, stop_price) {
            (None, None) => Self::Market,
            (Some(_), None) => Self::Limit,
            (None, Some(_)) => Self::Stop,
            (Some(_), Some(_)) => Self::StopLimit,
        }
    }

    /// Convert to the exchange `ordType` string.
    pub fn as_exchange_str(&self) -> &'static str {
        match self {
            Self::Market => "Market",
            Self::Limit => "Limit",
            Self::Stop => "Stop",
            Self::StopLimit => "StopLimit",
        }
    }

    pub fn has_stop(&self) -> bool {
        matches!(self, Self::Stop | Self::StopLimit)
    }
}

/// Order status as observed by the front-end.
///
/// ```text
/// PendingSubmit -> Working -> {Suspended, Filled, Cancelled, Rejected}
/// Working <-> Suspended            (stop-trigger cycle)
/// Working/Suspended -> PendingModify -> Working   (resize in flight)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Built locally, submission round-trip not finished.
    PendingSubmit,
    /// Accepted by the exchange and live.
    Working,
    /// Accepted but dormant (untriggered bracket contingent).
    Suspended,
    /// Modification sent, waiting for the exchange.
    PendingModify,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    /// Terminal statuses accept no further mutation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Filled | Self::Cancelled | Self::Rejected)
    }

    /// Terminal statuses after which the record leaves the registry.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Filled | Self::Cancelled)
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

/// Time in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderDuration {
    /// Good Till Cancelled.
    #[default]
    Gtc,
    /// Immediate Or Cancel.
    Ioc,
    /// Fill Or Kill.
    Fok,
}

impl OrderDuration {
    /// Convert to the exchange `timeInForce` string.
    pub fn as_exchange_str(&self) -> &'static str {
        match self {
            Self::Gtc => "GoodTillCancel",
            Self::Ioc => "ImmediateOrCancel",
            Self::Fok => "FillOrKill",
        }
    }

    pub fn from_exchange_str(s: &str) -> Option<Self> {
        match s {
            "GoodTillCancel" => Some(Self::Gtc),
            "ImmediateOrCancel" => Some(Self::Ioc),
            "FillOrKill" => Some(Self::Fok),
            _ => None,
        }
    }
}

/// Fields of an [`OrderRecord`] that can change after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OrderField {
    OrderId,
    Status,
    LimitPrice,
    StopPrice,
    Size,
    Filled,
    Unfilled,
    AverageFillPrice,
    StopTriggered,
}

/// Canonical mutable state of one order.
///
/// Owned by the order registry; the front-end only ever sees
/// [`OrderSnapshot`]s produced by [`OrderRecord::publish`].
#[derive(Debug, Clone)]
pub struct OrderRecord {
    order_id: String,
    temp_order_id: Option<String>,
    symbol: String,
    side: OrderSide,
    kind: OrderKind,
    client_tag: Option<String>,
    limit_price: Option<Decimal>,
    stop_price: Option<Decimal>,
    size: Decimal,
    filled: Decimal,
    unfilled: Decimal,
    avg_fill_price: Option<Decimal>,
    status: OrderStatus,
    stop_triggered: bool,
    duration: OrderDuration,
    modified_at_ms: i64,
    changed: BTreeSet<OrderField>,
}

impl OrderRecord {
    /// Create a new order in `PendingSubmit` status.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_id: String,
        symbol: String,
        side: OrderSide,
        size: Decimal,
        limit_price: Option<Decimal>,
        stop_price: Option<Decimal>,
        duration: OrderDuration,
        created_at_ms: i64,
    ) -> Self {
        Self {
            order_id,
            temp_order_id: None,
            symbol,
            side,
            kind: OrderKind::from_prices(limit_price, stop_price),
            client_tag: None,
            limit_price,
            stop_price,
            size,
            filled: Decimal::ZERO,
            unfilled: size,
            avg_fill_price: None,
            status: OrderStatus::PendingSubmit,
            stop_triggered: false,
            duration,
            modified_at_ms: created_at_ms,
            changed: BTreeSet::new(),
        }
    }

    pub fn with_client_tag(mut self, tag: Option<String>) -> Self {
        self.client_tag = tag;
        self
    }

    pub fn with_modified_at(mut self, modified_at_ms: i64) -> Self {
        self.modified_at_ms = modified_at_ms;
        self
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn temp_order_id(&self) -> Option<&str> {
        self.temp_order_id.as_deref()
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn side(&self) -> OrderSide {
        self.side
    }

    pub fn kind(&self) -> OrderKind {
        self.kind
    }

    pub fn client_tag(&self) -> Option<&str> {
        self.client_tag.as_deref()
    }

    pub fn limit_price(&self) -> Option<Decimal> {
        self.limit_price
    }

    pub fn stop_price(&self) -> Option<Decimal> {
        self.stop_price
    }

    pub fn size(&self) -> Decimal {
        self.size
    }

    pub fn filled(&self) -> Decimal {
        self.filled
    }

    pub fn unfilled(&self) -> Decimal {
        self.unfilled
    }

    pub fn avg_fill_price(&self) -> Option<Decimal> {
        self.avg_fill_price
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn is_stop_triggered(&self) -> bool {
        self.stop_triggered
    }

    pub fn duration(&self) -> OrderDuration {
        self.duration
    }

    pub fn modified_at_ms(&self) -> i64 {
        self.modified_at_ms
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Fields changed since the last [`publish`](Self::publish).
    pub fn changed_fields(&self) -> impl Iterator<Item = OrderField> + '_ {
        self.changed.iter().copied()
    }

    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty()
    }

    fn mark(&mut self, field: OrderField) {
        self.changed.insert(field);
    }

    /// Switch to a new identifier, remembering the first temporary one.
    ///
    /// Only the registry renames records so that the index stays in sync.
    pub(crate) fn rename(&mut self, new_id: String) {
        if self.order_id == new_id {
            return;
        }
        let old = std::mem::replace(&mut self.order_id, new_id);
        if self.temp_order_id.is_none() {
            self.temp_order_id = Some(old);
        }
        self.mark(OrderField::OrderId);
    }

    pub fn set_status(&mut self, status: OrderStatus) {
        if self.status != status {
            self.status = status;
            self.mark(OrderField::Status);
        }
    }

    pub fn set_limit_price(&mut self, price: Option<Decimal>) {
        if self.limit_price != price {
            self.limit_price = price;
            self.mark(OrderField::LimitPrice);
        }
    }

    pub fn set_stop_price(&mut self, price: Option<Decimal>) {
        if self.stop_price != price {
            self.stop_price = price;
            self.mark(OrderField::StopPrice);
        }
    }

    pub fn set_stop_triggered(&mut self, triggered: bool) {
        if self.stop_triggered != triggered {
            self.stop_triggered = triggered;
            self.mark(OrderField::StopTriggered);
        }
    }

    fn set_size(&mut self, size: Decimal) {
        if self.size != size {
            self.size = size;
            self.mark(OrderField::Size);
        }
    }

    fn set_filled(&mut self, filled: Decimal) {
        if self.filled != filled {
            self.filled = filled;
            self.mark(OrderField::Filled);
        }
    }

    fn set_unfilled(&mut self, unfilled: Decimal) {
        if self.unfilled != unfilled {
            self.unfilled = unfilled;
            self.mark(OrderField::Unfilled);
        }
    }

    fn set_avg_fill_price(&mut self, price: Option<Decimal>) {
        if self.avg_fill_price != price {
            self.avg_fill_price = price;
            self.mark(OrderField::AverageFillPrice);
        }
    }

    /// Apply cumulative fill state from a trade report.
    ///
    /// Filled quantity never decreases, so a stale report arriving late cannot
    /// roll progress back. `filled + unfilled <= size` holds afterwards.
    pub fn apply_fill(&mut self, cum_qty: Decimal, leaves_qty: Decimal, avg_px: Option<Decimal>) {
        let filled = cum_qty.max(self.filled).min(self.size).max(Decimal::ZERO);
        let unfilled = leaves_qty.min(self.size - filled).max(Decimal::ZERO);

        self.set_filled(filled);
        self.set_unfilled(unfilled);
        if avg_px.is_some() {
            self.set_avg_fill_price(avg_px);
        }
    }

    /// Apply a replace/restate: new leaves quantity and prices.
    ///
    /// A larger leaves quantity than the current size means the order was
    /// resized up, so the requested size follows.
    pub fn apply_amendment(
        &mut self,
        leaves_qty: Decimal,
        order_qty: Option<Decimal>,
        limit_price: Option<Decimal>,
        stop_price: Option<Decimal>,
    ) {
        if let Some(qty) = order_qty {
            self.set_size(qty.max(self.filled));
        }
        let leaves = leaves_qty.max(Decimal::ZERO);
        if self.filled + leaves > self.size {
            self.set_size(self.filled + leaves);
        }
        self.set_unfilled(leaves);
        self.set_limit_price(limit_price);
        self.set_stop_price(stop_price);
    }

    /// Produce an immutable snapshot and reset change tracking.
    pub fn publish(&mut self, now_ms: i64) -> OrderSnapshot {
        if self.has_changes() {
            self.modified_at_ms = now_ms;
        }
        let changed = std::mem::take(&mut self.changed).into_iter().collect();
        OrderSnapshot {
            order_id: self.order_id.clone(),
            temp_order_id: self.temp_order_id.clone(),
            symbol: self.symbol.clone(),
            side: self.side,
            kind: self.kind,
            client_tag: self.client_tag.clone(),
            limit_price: self.limit_price,
            stop_price: self.stop_price,
            size: self.size,
            filled: self.filled,
            unfilled: self.unfilled,
            avg_fill_price: self.avg_fill_price,
            status: self.status,
            stop_triggered: self.stop_triggered,
            duration: self.duration,
            modified_at_ms: self.modified_at_ms,
            changed,
        }
    }
}

/// Immutable view of an order handed to the front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub order_id: String,
    pub temp_order_id: Option<String>,
    pub symbol: String,
    pub side: OrderSide,
    pub kind: OrderKind,
    pub client_tag: Option<String>,
    pub limit_price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub size: Decimal,
    pub filled: Decimal,
    pub unfilled: Decimal,
    pub avg_fill_price: Option<Decimal>,
    pub status: OrderStatus,
    pub stop_triggered: bool,
    pub duration: OrderDuration,
    pub modified_at_ms: i64,
    /// Fields that changed since the previous snapshot of this order.
    pub changed: Vec<OrderField>,
}
