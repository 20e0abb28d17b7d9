//! Instrument metadata and per-instrument live state.

use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::position::{PositionSnapshot, PositionUpdate, StatusInfo};

/// Static instrument parameters discovered by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSpec {
    pub symbol: String,
    pub tick_size: Decimal,
    pub multiplier: Decimal,
}

/// One instrument with its live position and executed volume.
#[derive(Debug, Clone)]
pub struct Instrument {
    pub spec: InstrumentSpec,
    /// Sum of last-traded quantities seen this session.
    pub executed_volume: Decimal,
    pub position: PositionSnapshot,
}

impl Instrument {
    fn new(spec: InstrumentSpec) -> Self {
        let position = PositionSnapshot::new(spec.symbol.as_str());
        Self {
            spec,
            executed_volume: Decimal::ZERO,
            position,
        }
    }

    pub fn status(&self) -> StatusInfo {
        StatusInfo::from_position(&self.position, self.spec.multiplier, self.executed_volume)
    }
}

/// Symbol-keyed instrument table.
#[derive(Debug, Default)]
pub struct InstrumentBook {
    instruments: DashMap<String, Instrument>,
}

impl InstrumentBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an instrument or refresh its parameters, keeping live state.
    pub fn upsert(&self, spec: InstrumentSpec) {
        debug!(
            symbol = %spec.symbol,
            tick_size = %spec.tick_size,
            multiplier = %spec.multiplier,
            "instrument registered"
        );
        self.instruments
            .entry(spec.symbol.clone())
            .and_modify(|instrument| instrument.spec = spec.clone())
            .or_insert_with(|| Instrument::new(spec));
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.instruments.contains_key(symbol)
    }

    pub fn get(&self, symbol: &str) -> Option<Instrument> {
        self.instruments.get(symbol).map(|i| i.clone())
    }

    pub fn tick_size(&self, symbol: &str) -> Option<Decimal> {
        self.instruments.get(symbol).map(|i| i.spec.tick_size)
    }

    /// Add a last-traded quantity, returning the new cumulative volume.
    pub fn add_executed_volume(&self, symbol: &str, qty: Decimal) -> Option<Decimal> {
        self.instruments.get_mut(symbol).map(|mut instrument| {
            instrument.executed_volume += qty;
            instrument.executed_volume
        })
    }

    pub fn executed_volume(&self, symbol: &str) -> Option<Decimal> {
        self.instruments.get(symbol).map(|i| i.executed_volume)
    }

    /// Merge a position update and build the resulting status event.
    ///
    /// Returns `None` for unknown instruments.
    pub fn merge_position(&self, update: &PositionUpdate) -> Option<StatusInfo> {
        let mut instrument = self.instruments.get_mut(&update.symbol)?;
        instrument.position.merge(update);
        Some(instrument.status())
    }

    pub fn symbols(&self) -> Vec<String> {
        self.instruments.iter().map(|i| i.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}

/// Shared instrument book type.
pub type SharedInstrumentBook = Arc<InstrumentBook>;

/// Create a new shared instrument book.
pub fn create_instrument_book() -> SharedInstrumentBook {
    Arc::new(InstrumentBook::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn xbtusd() -> InstrumentSpec {
        InstrumentSpec {
            symbol: "XBTUSD".into(),
            tick_size: dec!(0.5),
            multiplier: dec!(-100000000),
        }
    }

    #[test]
    fn test_executed_volume_accumulates() {
        let book = InstrumentBook::new();
        book.upsert(xbtusd());

        assert_eq!(book.add_executed_volume("XBTUSD", dec!(10)), Some(dec!(10)));
        assert_eq!(book.add_executed_volume("XBTUSD", dec!(5)), Some(dec!(15)));
        assert_eq!(book.add_executed_volume("ETHUSD", dec!(5)), None);
    }

    #[test]
    fn test_upsert_keeps_live_state() {
        let book = InstrumentBook::new();
        book.upsert(xbtusd());
        book.add_executed_volume("XBTUSD", dec!(7));

        let mut spec = xbtusd();
        spec.tick_size = dec!(1);
        book.upsert(spec);

        assert_eq!(book.tick_size("XBTUSD"), Some(dec!(1)));
        assert_eq!(book.executed_volume("XBTUSD"), Some(dec!(7)));
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn test_merge_position_status() {
        let book = InstrumentBook::new();
        book.upsert(xbtusd());
        book.add_executed_volume("XBTUSD", dec!(30));

        let status = book
            .merge_position(&PositionUpdate {
                symbol: "XBTUSD".into(),
                realised_pnl: Some(dec!(-200000000)),
                current_qty: Some(dec!(30)),
                ..PositionUpdate::default()
            })
            .unwrap();

        assert_eq!(status.symbol, "XBTUSD");
        assert_eq!(status.realized_pnl, dec!(2));
        assert_eq!(status.position, dec!(30));
        assert_eq!(status.volume, dec!(30));

        assert!(book
            .merge_position(&PositionUpdate {
                symbol: "UNKNOWN".into(),
                ..PositionUpdate::default()
            })
            .is_none());
    }
}
