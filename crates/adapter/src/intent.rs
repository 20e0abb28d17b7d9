//! Trading intents issued by the front-end.

use execution_core::{OrderDuration, OrderSide};
use rust_decimal::Decimal;

/// Parameters of one order.
///
/// When both `take_profit_offset` and `stop_loss_offset` are non-zero the
/// order is submitted as a bracket: the entry plus a stop-loss and a
/// take-profit placed that many ticks away from the entry's limit price.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderIntent {
    pub symbol: String,
    pub side: OrderSide,
    pub size: Decimal,
    pub limit_price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    /// `None` uses the configured default.
    pub duration: Option<OrderDuration>,
    /// Free-form tag echoed back in order snapshots.
    pub client_tag: Option<String>,
    /// Take-profit distance in ticks.
    pub take_profit_offset: u32,
    /// Stop-loss distance in ticks.
    pub stop_loss_offset: u32,
}

impl OrderIntent {
    pub fn new(symbol: impl Into<String>, side: OrderSide, size: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            size,
            limit_price: None,
            stop_price: None,
            duration: None,
            client_tag: None,
            take_profit_offset: 0,
            stop_loss_offset: 0,
        }
    }

    pub fn market(symbol: impl Into<String>, side: OrderSide, size: Decimal) -> Self {
        Self::new(symbol, side, size)
    }

    pub fn limit(symbol: impl Into<String>, side: OrderSide, size: Decimal, price: Decimal) -> Self {
        Self::new(symbol, side, size).with_limit_price(price)
    }

    pub fn stop(symbol: impl Into<String>, side: OrderSide, size: Decimal, stop: Decimal) -> Self {
        Self::new(symbol, side, size).with_stop_price(stop)
    }

    pub fn with_limit_price(mut self, price: Decimal) -> Self {
        self.limit_price = Some(price);
        self
    }

    pub fn with_stop_price(mut self, price: Decimal) -> Self {
        self.stop_price = Some(price);
        self
    }

    pub fn with_duration(mut self, duration: OrderDuration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_client_tag(mut self, tag: impl Into<String>) -> Self {
        self.client_tag = Some(tag.into());
        self
    }

    /// Turn the order into a bracket with the given tick offsets.
    pub fn with_bracket(mut self, take_profit_offset: u32, stop_loss_offset: u32) -> Self {
        self.take_profit_offset = take_profit_offset;
        self.stop_loss_offset = stop_loss_offset;
        self
    }

    pub fn is_bracket(&self) -> bool {
        self.take_profit_offset != 0 && self.stop_loss_offset != 0
    }
}

/// A submit call.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitIntent {
    /// One order, or a bracket when the offsets say so.
    Single(OrderIntent),
    /// Orders that cancel each other.
    Oco(Vec<OrderIntent>),
}

/// Cancel one order.
///
/// Cancels with `batch_end == false` are buffered until the next one with
/// `batch_end == true`, which sends the whole buffer as one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelIntent {
    pub order_id: String,
    pub batch_end: bool,
}

impl CancelIntent {
    /// A standalone cancel (or the last of a batch).
    pub fn new(order_id: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            batch_end: true,
        }
    }

    /// A cancel that waits for the end of its batch.
    pub fn batched(order_id: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            batch_end: false,
        }
    }
}

/// Change the total size of an order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeIntent {
    pub order_id: String,
    pub size: Decimal,
}

/// Move the limit and/or stop price of an order.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveIntent {
    pub order_id: String,
    pub limit_price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
}

impl MoveIntent {
    pub fn limit(order_id: impl Into<String>, price: Decimal) -> Self {
        Self {
            order_id: order_id.into(),
            limit_price: Some(price),
            stop_price: None,
        }
    }

    pub fn stop(order_id: impl Into<String>, price: Decimal) -> Self {
        Self {
            order_id: order_id.into(),
            limit_price: None,
            stop_price: Some(price),
        }
    }
}
