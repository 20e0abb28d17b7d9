//! Per-currency balance aggregation from wallet and margin updates.
//!
//! Wallet updates carry the balance and previous-day balance, margin updates
//! carry PnL and available margin. Each update is merged field by field into
//! the stored snapshot for its currency and the complete set is returned.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Exchange amounts are reported in satoshis.
const SATOSHIS_PER_COIN: i64 = 100_000_000;

fn from_satoshis(amount: i64) -> Decimal {
    Decimal::from(amount) / Decimal::from(SATOSHIS_PER_COIN)
}

/// Wallet topic update, amounts in satoshis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletUpdate {
    pub currency: String,
    pub amount: Option<i64>,
    pub prev_amount: Option<i64>,
}

/// Margin topic update, amounts in satoshis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginUpdate {
    pub currency: String,
    pub realised_pnl: Option<i64>,
    pub unrealised_pnl: Option<i64>,
    pub available_margin: Option<i64>,
}

/// Subset of balance fields supplied by one update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BalanceUpdate {
    pub currency: String,
    pub balance: Option<Decimal>,
    pub realized_pnl: Option<Decimal>,
    pub unrealized_pnl: Option<Decimal>,
    pub previous_day_balance: Option<Decimal>,
    pub net_liquidity_value: Option<Decimal>,
    pub rate_to_base: Option<Decimal>,
}

impl From<&WalletUpdate> for BalanceUpdate {
    fn from(wallet: &WalletUpdate) -> Self {
        Self {
            currency: wallet.currency.clone(),
            balance: wallet.amount.map(from_satoshis),
            previous_day_balance: wallet.prev_amount.map(from_satoshis),
            ..Self::default()
        }
    }
}

impl From<&MarginUpdate> for BalanceUpdate {
    fn from(margin: &MarginUpdate) -> Self {
        Self {
            currency: margin.currency.clone(),
            realized_pnl: margin.realised_pnl.map(from_satoshis),
            unrealized_pnl: margin.unrealised_pnl.map(from_satoshis),
            net_liquidity_value: margin.available_margin.map(from_satoshis),
            ..Self::default()
        }
    }
}

/// Balance of one currency as shown to the front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub currency: String,
    pub balance: Decimal,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub previous_day_balance: Decimal,
    pub net_liquidity_value: Decimal,
    /// Never reported by the exchange; stays `None` until it is.
    pub rate_to_base: Option<Decimal>,
}

impl BalanceSnapshot {
    /// Empty snapshot: every numeric field zero.
    pub fn empty(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            balance: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            previous_day_balance: Decimal::ZERO,
            net_liquidity_value: Decimal::ZERO,
            rate_to_base: None,
        }
    }

    /// Fields present in `update` win, absent ones keep this snapshot's value.
    pub fn merged(&self, update: &BalanceUpdate) -> Self {
        Self {
            currency: self.currency.clone(),
            balance: update.balance.unwrap_or(self.balance),
            realized_pnl: update.realized_pnl.unwrap_or(self.realized_pnl),
            unrealized_pnl: update.unrealized_pnl.unwrap_or(self.unrealized_pnl),
            previous_day_balance: update
                .previous_day_balance
                .unwrap_or(self.previous_day_balance),
            net_liquidity_value: update
                .net_liquidity_value
                .unwrap_or(self.net_liquidity_value),
            rate_to_base: update.rate_to_base.or(self.rate_to_base),
        }
    }
}

/// Thread-safe per-currency balance store.
#[derive(Debug, Default)]
pub struct BalanceAggregator {
    balances: RwLock<BTreeMap<String, BalanceSnapshot>>,
}

impl BalanceAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge an update and return every known currency, ordered by currency.
    pub fn apply(&self, update: &BalanceUpdate) -> Vec<BalanceSnapshot> {
        let mut balances = self.balances.write();
        let merged = balances
            .get(&update.currency)
            .unwrap_or(&BalanceSnapshot::empty(update.currency.as_str()))
            .merged(update);

        debug!(
            currency = %merged.currency,
            balance = %merged.balance,
            net_liquidity = %merged.net_liquidity_value,
            "balance merged"
        );
        balances.insert(update.currency.clone(), merged);
        balances.values().cloned().collect()
    }

    pub fn apply_wallet(&self, wallet: &WalletUpdate) -> Vec<BalanceSnapshot> {
        self.apply(&BalanceUpdate::from(wallet))
    }

    pub fn apply_margin(&self, margin: &MarginUpdate) -> Vec<BalanceSnapshot> {
        self.apply(&BalanceUpdate::from(margin))
    }

    pub fn get(&self, currency: &str) -> Option<BalanceSnapshot> {
        self.balances.read().get(currency).cloned()
    }

    pub fn all(&self) -> Vec<BalanceSnapshot> {
        self.balances.read().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn wallet(amount: Option<i64>, prev_amount: Option<i64>) -> WalletUpdate {
        WalletUpdate {
            currency: "XBt".into(),
            amount,
            prev_amount,
        }
    }

    #[test]
    fn test_wallet_merge_keeps_prior_fields() {
        let aggregator = BalanceAggregator::new();

        aggregator.apply(&BalanceUpdate {
            currency: "XBT".into(),
            balance: Some(dec!(1.0)),
            ..BalanceUpdate::default()
        });
        let all = aggregator.apply(&BalanceUpdate {
            currency: "XBT".into(),
            previous_day_balance: Some(dec!(0.9)),
            ..BalanceUpdate::default()
        });

        assert_eq!(all.len(), 1);
        assert_eq!(all[0].balance, dec!(1.0));
        assert_eq!(all[0].previous_day_balance, dec!(0.9));
    }

    #[test]
    fn test_wallet_converts_satoshis() {
        let aggregator = BalanceAggregator::new();
        let all = aggregator.apply_wallet(&wallet(Some(150_000_000), Some(100_000_000)));

        assert_eq!(all[0].balance, dec!(1.5));
        assert_eq!(all[0].previous_day_balance, dec!(1));
        assert_eq!(all[0].realized_pnl, dec!(0));
        assert!(all[0].rate_to_base.is_none());
    }

    #[test]
    fn test_margin_does_not_touch_wallet_fields() {
        let aggregator = BalanceAggregator::new();
        aggregator.apply_wallet(&wallet(Some(200_000_000), Some(190_000_000)));

        let all = aggregator.apply_margin(&MarginUpdate {
            currency: "XBt".into(),
            realised_pnl: Some(1_000_000),
            unrealised_pnl: None,
            available_margin: Some(180_000_000),
        });

        let xbt = &all[0];
        assert_eq!(xbt.balance, dec!(2));
        assert_eq!(xbt.previous_day_balance, dec!(1.9));
        assert_eq!(xbt.realized_pnl, dec!(0.01));
        assert_eq!(xbt.unrealized_pnl, dec!(0));
        assert_eq!(xbt.net_liquidity_value, dec!(1.8));

        // A later wallet update leaves the margin-derived fields alone.
        aggregator.apply_wallet(&wallet(Some(210_000_000), None));
        let xbt = aggregator.get("XBt").unwrap();
        assert_eq!(xbt.net_liquidity_value, dec!(1.8));
        assert_eq!(xbt.previous_day_balance, dec!(1.9));
    }

    #[test]
    fn test_margin_without_prior_snapshot() {
        let aggregator = BalanceAggregator::new();
        let all = aggregator.apply_margin(&MarginUpdate {
            currency: "XBt".into(),
            realised_pnl: None,
            unrealised_pnl: Some(-5_000_000),
            available_margin: None,
        });

        assert_eq!(all[0].unrealized_pnl, dec!(-0.05));
        assert_eq!(all[0].balance, dec!(0));
    }

    #[test]
    fn test_publishes_every_currency() {
        let aggregator = BalanceAggregator::new();
        aggregator.apply_wallet(&wallet(Some(100_000_000), None));
        let all = aggregator.apply_wallet(&WalletUpdate {
            currency: "USDt".into(),
            amount: Some(5_000_000_000),
            prev_amount: None,
        });

        assert_eq!(all.len(), 2);
        let currencies: Vec<_> = all.iter().map(|b| b.currency.as_str()).collect();
        assert_eq!(currencies, vec!["USDt", "XBt"]);
    }
}
