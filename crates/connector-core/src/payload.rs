//! Outbound order payloads, named after the exchange REST fields.

use execution_core::{ContingencyType, OrderDuration, OrderKind, OrderSide};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Peg type the exchange uses for trailing stops.
pub const TRAILING_STOP_PEG: &str = "TrailingStopPeg";

/// A new order as sent to `POST /order` (or one element of a bulk).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    pub symbol: String,
    pub side: OrderSide,
    pub order_qty: Decimal,
    pub ord_type: OrderKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(rename = "stopPx", skip_serializing_if = "Option::is_none")]
    pub stop_px: Option<Decimal>,
    pub time_in_force: String,
    #[serde(rename = "clOrdID")]
    pub cl_ord_id: String,
    #[serde(rename = "clOrdLinkID", skip_serializing_if = "Option::is_none")]
    pub cl_ord_link_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contingency_type: Option<ContingencyType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl OrderPayload {
    pub fn new(
        cl_ord_id: impl Into<String>,
        symbol: impl Into<String>,
        side: OrderSide,
        order_qty: Decimal,
        price: Option<Decimal>,
        stop_px: Option<Decimal>,
        duration: OrderDuration,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_qty,
            ord_type: OrderKind::from_prices(price, stop_px),
            price,
            stop_px,
            time_in_force: duration.as_exchange_str().to_string(),
            cl_ord_id: cl_ord_id.into(),
            cl_ord_link_id: None,
            contingency_type: None,
            text: None,
        }
    }

    /// Attach the order to a link group.
    pub fn with_link(mut self, link_id: impl Into<String>, contingency: ContingencyType) -> Self {
        self.cl_ord_link_id = Some(link_id.into());
        self.contingency_type = Some(contingency);
        self
    }

    /// Free text stored with the order on the exchange.
    pub fn with_text(mut self, text: Option<String>) -> Self {
        self.text = text;
        self
    }
}

/// New quantity for a working order (`PUT /order`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizePayload {
    #[serde(rename = "orderID")]
    pub order_id: String,
    pub order_qty: Decimal,
}

/// New prices for a working order (`PUT /order`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovePayload {
    #[serde(rename = "orderID")]
    pub order_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(rename = "stopPx", skip_serializing_if = "Option::is_none")]
    pub stop_px: Option<Decimal>,
    /// Trailing distance for trailing stops; price fields are left empty then.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peg_offset_value: Option<Decimal>,
}

impl MovePayload {
    /// Move a limit and/or stop price.
    ///
    /// Once a stop has triggered the exchange treats the order as its limit
    /// leg, so the stop price is not sent anymore.
    pub fn prices(
        order_id: impl Into<String>,
        price: Option<Decimal>,
        stop_px: Option<Decimal>,
        stop_triggered: bool,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            price,
            stop_px: if stop_triggered { None } else { stop_px },
            peg_offset_value: None,
        }
    }

    /// Change the trailing distance of a trailing stop.
    pub fn trailing(order_id: impl Into<String>, peg_offset_value: Decimal) -> Self {
        Self {
            order_id: order_id.into(),
            price: None,
            stop_px: None,
            peg_offset_value: Some(peg_offset_value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_payload_field_names() {
        let payload = OrderPayload::new(
            "1-temp-0",
            "XBTUSD",
            OrderSide::Buy,
            dec!(100),
            Some(dec!(50000)),
            None,
            OrderDuration::Gtc,
        )
        .with_link("1-LINKED-0", ContingencyType::OneTriggersTheOther);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["clOrdID"], "1-temp-0");
        assert_eq!(json["clOrdLinkID"], "1-LINKED-0");
        assert_eq!(json["contingencyType"], "OneTriggersTheOther");
        assert_eq!(json["ordType"], "Limit");
        assert_eq!(json["side"], "Buy");
        assert_eq!(json["timeInForce"], "GoodTillCancel");
        assert!(json.get("stopPx").is_none());
        assert!(json.get("text").is_none());
    }

    #[test]
    fn test_move_drops_stop_after_trigger() {
        let pending = MovePayload::prices("abc", Some(dec!(101)), Some(dec!(99)), false);
        assert_eq!(pending.stop_px, Some(dec!(99)));

        let triggered = MovePayload::prices("abc", Some(dec!(101)), Some(dec!(99)), true);
        assert_eq!(triggered.stop_px, None);
        assert_eq!(triggered.price, Some(dec!(101)));

        let json = serde_json::to_value(&triggered).unwrap();
        assert_eq!(json["orderID"], "abc");
        assert!(json.get("stopPx").is_none());
    }

    #[test]
    fn test_trailing_move() {
        let payload = MovePayload::trailing("trail-1", dec!(-25));
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("price").is_none());
        assert!(json.get("pegOffsetValue").is_some());
    }
}
