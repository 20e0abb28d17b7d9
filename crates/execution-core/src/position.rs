//! Live position per instrument, merged from partial position updates.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Position topic update. Only the fields the exchange sent are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub symbol: String,
    pub account: Option<i64>,
    pub currency: Option<String>,
    pub mark_value: Option<Decimal>,
    pub realised_pnl: Option<Decimal>,
    pub unrealised_pnl: Option<Decimal>,
    pub avg_entry_price: Option<Decimal>,
    pub open_order_buy_qty: Option<Decimal>,
    pub open_order_sell_qty: Option<Decimal>,
    pub current_qty: Option<Decimal>,
}

/// Accumulated position state of one instrument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub symbol: String,
    pub account: i64,
    pub currency: String,
    pub mark_value: Decimal,
    pub realised_pnl: Decimal,
    pub unrealised_pnl: Decimal,
    pub avg_entry_price: Option<Decimal>,
    pub open_order_buy_qty: Decimal,
    pub open_order_sell_qty: Decimal,
    /// Net quantity (positive = long, negative = short).
    pub current_qty: Decimal,
}

impl PositionSnapshot {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default()
        }
    }

    /// Merge a partial update.
    ///
    /// Account, symbol and currency are set once and never overwritten;
    /// every other field takes the update's value when present.
    pub fn merge(&mut self, update: &PositionUpdate) {
        if self.account == 0 {
            if let Some(account) = update.account {
                self.account = account;
            }
        }
        if self.symbol.is_empty() {
            self.symbol = update.symbol.clone();
        }
        if self.currency.is_empty() {
            if let Some(currency) = &update.currency {
                self.currency = currency.clone();
            }
        }
        if let Some(mark_value) = update.mark_value {
            self.mark_value = mark_value;
        }
        if let Some(pnl) = update.realised_pnl {
            self.realised_pnl = pnl;
        }
        if let Some(pnl) = update.unrealised_pnl {
            self.unrealised_pnl = pnl;
        }
        if update.avg_entry_price.is_some() {
            self.avg_entry_price = update.avg_entry_price;
        }
        if let Some(qty) = update.open_order_buy_qty {
            self.open_order_buy_qty = qty;
        }
        if let Some(qty) = update.open_order_sell_qty {
            self.open_order_sell_qty = qty;
        }
        if let Some(qty) = update.current_qty {
            self.current_qty = qty;
        }
    }

    pub fn is_flat(&self) -> bool {
        self.current_qty == Decimal::ZERO
    }

    pub fn is_long(&self) -> bool {
        self.current_qty > Decimal::ZERO
    }

    pub fn is_short(&self) -> bool {
        self.current_qty < Decimal::ZERO
    }
}

/// Position status event published to the front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusInfo {
    pub symbol: String,
    /// Unrealised PnL in instrument units (divided by the multiplier).
    pub unrealized_pnl: Decimal,
    /// Realised PnL in instrument units (divided by the multiplier).
    pub realized_pnl: Decimal,
    pub currency: String,
    pub position: Decimal,
    pub avg_entry_price: Option<Decimal>,
    /// Cumulative traded volume of this session.
    pub volume: Decimal,
    pub working_buys: Decimal,
    pub working_sells: Decimal,
}

impl StatusInfo {
    /// Build the status event from a position, its instrument multiplier and
    /// the executed volume.
    pub fn from_position(
        position: &PositionSnapshot,
        multiplier: Decimal,
        volume: Decimal,
    ) -> Self {
        let scale = |pnl: Decimal| pnl.checked_div(multiplier).unwrap_or(pnl);
        Self {
            symbol: position.symbol.clone(),
            unrealized_pnl: scale(position.unrealised_pnl),
            realized_pnl: scale(position.realised_pnl),
            currency: position.currency.clone(),
            position: position.current_qty,
            avg_entry_price: position.avg_entry_price,
            volume,
            working_buys: position.open_order_buy_qty,
            working_sells: position.open_order_sell_qty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_position_new() {
        let pos = PositionSnapshot::new("XBTUSD");
        assert_eq!(pos.symbol, "XBTUSD");
        assert!(pos.is_flat());
        assert!(!pos.is_long());
        assert!(!pos.is_short());
    }

    #[test]
    fn test_merge_keeps_absent_fields() {
        let mut pos = PositionSnapshot::new("XBTUSD");
        pos.merge(&PositionUpdate {
            symbol: "XBTUSD".into(),
            account: Some(42),
            currency: Some("XBt".into()),
            realised_pnl: Some(dec!(1000)),
            unrealised_pnl: Some(dec!(-200)),
            avg_entry_price: Some(dec!(50000)),
            current_qty: Some(dec!(100)),
            ..PositionUpdate::default()
        });
        pos.merge(&PositionUpdate {
            symbol: "XBTUSD".into(),
            account: Some(7),
            unrealised_pnl: Some(dec!(300)),
            open_order_sell_qty: Some(dec!(50)),
            ..PositionUpdate::default()
        });

        assert_eq!(pos.account, 42);
        assert_eq!(pos.currency, "XBt");
        assert_eq!(pos.realised_pnl, dec!(1000));
        assert_eq!(pos.unrealised_pnl, dec!(300));
        assert_eq!(pos.avg_entry_price, Some(dec!(50000)));
        assert_eq!(pos.open_order_sell_qty, dec!(50));
        assert_eq!(pos.current_qty, dec!(100));
        assert!(pos.is_long());
    }

    #[test]
    fn test_status_scales_pnl_by_multiplier() {
        let mut pos = PositionSnapshot::new("XBTUSD");
        pos.merge(&PositionUpdate {
            symbol: "XBTUSD".into(),
            realised_pnl: Some(dec!(5000)),
            unrealised_pnl: Some(dec!(-2500)),
            current_qty: Some(dec!(-10)),
            open_order_buy_qty: Some(dec!(3)),
            ..PositionUpdate::default()
        });

        let status = StatusInfo::from_position(&pos, dec!(-100), dec!(25));
        assert_eq!(status.realized_pnl, dec!(-50));
        assert_eq!(status.unrealized_pnl, dec!(25));
        assert_eq!(status.position, dec!(-10));
        assert_eq!(status.volume, dec!(25));
        assert_eq!(status.working_buys, dec!(3));
        assert_eq!(status.working_sells, dec!(0));
    }

    #[test]
    fn test_status_with_zero_multiplier() {
        let mut pos = PositionSnapshot::new("XBTUSD");
        pos.realised_pnl = dec!(10);
        let status = StatusInfo::from_position(&pos, Decimal::ZERO, Decimal::ZERO);
        assert_eq!(status.realized_pnl, dec!(10));
    }
}
