//! Market-data events forwarded from the realtime feed to the front-end.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Exchange {
    Bitmex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookSide {
    Bid,
    Ask,
}

/// A single order-book level change. A zero size removes the level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthUpdate {
    pub exchange: Exchange,
    pub symbol: String,
    pub side: BookSide,
    pub price: Decimal,
    pub size: Decimal,
}

/// A public trade print.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub exchange: Exchange,
    pub symbol: String,
    pub price: Decimal,
    pub qty: Decimal,
    /// True when the aggressor bought.
    pub is_buyer_aggressor: bool,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MarketEvent {
    Depth(DepthUpdate),
    Trade(Trade),
}

impl MarketEvent {
    pub fn symbol(&self) -> &str {
        match self {
            Self::Depth(d) => &d.symbol,
            Self::Trade(t) => &t.symbol,
        }
    }
}
