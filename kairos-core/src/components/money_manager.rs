//! Money manager — position sizing.
//!
//! Quantities returned here are pre-rounding; the system clamps them to the
//! instrument's tradable range and floors to a lot multiple afterwards. A
//! returned 0 means "skip this trade". Sizing that depends on the ledger
//! (cash, holdings) reads it through the trade manager borrow.

use crate::components::TradeManager;
use crate::domain::{BarSeries, Instrument, TradeOrigin, TradeRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub trait MoneyManager: Send {
    fn name(&self) -> &str;

    /// Quantity for a long entry. `risk` is `price - stoploss`.
    fn buy_quantity(
        &mut self,
        tm: &dyn TradeManager,
        datetime: DateTime<Utc>,
        instrument: &Instrument,
        price: f64,
        risk: f64,
        origin: TradeOrigin,
    ) -> f64;

    /// Quantity for a long exit. Defaults to the entire holding.
    #[allow(unused_variables)]
    fn sell_quantity(
        &mut self,
        tm: &dyn TradeManager,
        datetime: DateTime<Utc>,
        instrument: &Instrument,
        price: f64,
        risk: f64,
        origin: TradeOrigin,
    ) -> f64 {
        tm.hold_number(datetime, &instrument.symbol)
    }

    /// Quantity for a short entry. Defaults to the long-entry sizing.
    fn sell_short_quantity(
        &mut self,
        tm: &dyn TradeManager,
        datetime: DateTime<Utc>,
        instrument: &Instrument,
        price: f64,
        risk: f64,
        origin: TradeOrigin,
    ) -> f64 {
        self.buy_quantity(tm, datetime, instrument, price, risk, origin)
    }

    /// Quantity for a short cover. Defaults to the entire short holding.
    #[allow(unused_variables)]
    fn buy_short_quantity(
        &mut self,
        tm: &dyn TradeManager,
        datetime: DateTime<Utc>,
        instrument: &Instrument,
        price: f64,
        risk: f64,
        origin: TradeOrigin,
    ) -> f64 {
        tm.short_hold_number(datetime, &instrument.symbol)
    }

    /// Called after every executed entry.
    fn buy_notify(&mut self, _record: &TradeRecord) {}

    /// Called after every executed exit.
    fn sell_notify(&mut self, _record: &TradeRecord) {}

    fn set_series(&mut self, _series: &BarSeries) {}

    fn reset(&mut self) {}

    fn clone_box(&self) -> Box<dyn MoneyManager>;
}

impl Clone for Box<dyn MoneyManager> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Always trade a fixed quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedCountManager {
    pub count: f64,
}

impl FixedCountManager {
    pub fn new(count: f64) -> Self {
        assert!(count > 0.0, "count must be > 0");
        Self { count }
    }
}

impl MoneyManager for FixedCountManager {
    fn name(&self) -> &str {
        "fixed_count_manager"
    }

    fn buy_quantity(
        &mut self,
        _tm: &dyn TradeManager,
        _datetime: DateTime<Utc>,
        _instrument: &Instrument,
        _price: f64,
        _risk: f64,
        _origin: TradeOrigin,
    ) -> f64 {
        self.count
    }

    fn clone_box(&self) -> Box<dyn MoneyManager> {
        Box::new(self.clone())
    }
}

/// Spend a fixed fraction of available cash per entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashRatioManager {
    /// Fraction of cash to commit, in (0, 1].
    pub ratio: f64,
}

impl CashRatioManager {
    pub fn new(ratio: f64) -> Self {
        assert!(ratio > 0.0 && ratio <= 1.0, "ratio must be in (0, 1]");
        Self { ratio }
    }
}

impl MoneyManager for CashRatioManager {
    fn name(&self) -> &str {
        "cash_ratio_manager"
    }

    fn buy_quantity(
        &mut self,
        tm: &dyn TradeManager,
        datetime: DateTime<Utc>,
        _instrument: &Instrument,
        price: f64,
        _risk: f64,
        _origin: TradeOrigin,
    ) -> f64 {
        if price <= 0.0 {
            return 0.0;
        }
        (tm.cash(datetime) * self.ratio) / price
    }

    fn clone_box(&self) -> Box<dyn MoneyManager> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::SimAccount;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn fixed_count_ignores_price() {
        let tm = SimAccount::new(100_000.0, at(1));
        let mut mm = FixedCountManager::new(300.0);
        let inst = Instrument::equity("TEST");
        assert_eq!(
            mm.buy_quantity(&tm, at(2), &inst, 50.0, 5.0, TradeOrigin::Signal),
            300.0
        );
    }

    #[test]
    fn cash_ratio_scales_with_price() {
        let tm = SimAccount::new(100_000.0, at(1));
        let mut mm = CashRatioManager::new(0.5);
        let inst = Instrument::equity("TEST");
        let qty = mm.buy_quantity(&tm, at(2), &inst, 100.0, 5.0, TradeOrigin::Signal);
        assert!((qty - 500.0).abs() < 1e-9);
    }

    #[test]
    fn zero_price_sizes_zero() {
        let tm = SimAccount::new(100_000.0, at(1));
        let mut mm = CashRatioManager::new(0.5);
        let inst = Instrument::equity("TEST");
        assert_eq!(mm.buy_quantity(&tm, at(2), &inst, 0.0, 0.0, TradeOrigin::Signal), 0.0);
    }
}
