//! Simulation account — a deliberately small `TradeManager`.
//!
//! Cash ledger plus one long and one short position record per symbol, with
//! cost arithmetic delegated to a pluggable [`CostModel`]. Enough accounting
//! to drive the trading system end-to-end; portfolio analytics live outside
//! the core.

use crate::components::{CostModel, TradeManager, ZeroCost};
use crate::domain::{Business, CostRecord, Instrument, PositionRecord, TradeOrigin, TradeRecord};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

#[derive(Clone)]
pub struct SimAccount {
    init_cash: f64,
    init_datetime: DateTime<Utc>,
    cash: f64,
    cost_model: Box<dyn CostModel>,
    positions: HashMap<String, PositionRecord>,
    short_positions: HashMap<String, PositionRecord>,
    borrow_cash: bool,
    borrow_stock: bool,
    records: Vec<TradeRecord>,
}

impl SimAccount {
    pub fn new(init_cash: f64, init_datetime: DateTime<Utc>) -> Self {
        Self::with_cost_model(init_cash, init_datetime, Box::new(ZeroCost))
    }

    pub fn with_cost_model(
        init_cash: f64,
        init_datetime: DateTime<Utc>,
        cost_model: Box<dyn CostModel>,
    ) -> Self {
        assert!(init_cash > 0.0, "init_cash must be > 0");
        Self {
            init_cash,
            init_datetime,
            cash: init_cash,
            cost_model,
            positions: HashMap::new(),
            short_positions: HashMap::new(),
            borrow_cash: false,
            borrow_stock: false,
            records: vec![Self::init_record(init_datetime, init_cash)],
        }
    }

    fn init_record(datetime: DateTime<Utc>, cash: f64) -> TradeRecord {
        TradeRecord {
            datetime,
            symbol: String::new(),
            business: Business::Init,
            number: 0.0,
            cost: CostRecord::zero(),
            plan_price: 0.0,
            stoploss: 0.0,
            goal_price: 0.0,
            real_price: 0.0,
            origin: TradeOrigin::Other,
            cash,
        }
    }

    pub fn current_cash(&self) -> f64 {
        self.cash
    }

    /// All ledger records, starting with the `Init` entry.
    pub fn records(&self) -> &[TradeRecord] {
        &self.records
    }

    fn push_record(
        &mut self,
        datetime: DateTime<Utc>,
        symbol: &str,
        business: Business,
        number: f64,
        cost: CostRecord,
        plan_price: f64,
        stoploss: f64,
        goal_price: f64,
        real_price: f64,
        origin: TradeOrigin,
    ) -> TradeRecord {
        let record = TradeRecord {
            datetime,
            symbol: symbol.to_string(),
            business,
            number,
            cost,
            plan_price,
            stoploss,
            goal_price,
            real_price,
            origin,
            cash: self.cash,
        };
        self.records.push(record.clone());
        record
    }
}

impl TradeManager for SimAccount {
    fn name(&self) -> &str {
        "sim_account"
    }

    fn init_datetime(&self) -> DateTime<Utc> {
        self.init_datetime
    }

    fn cash(&self, _datetime: DateTime<Utc>) -> f64 {
        self.cash
    }

    fn buy(
        &mut self,
        datetime: DateTime<Utc>,
        instrument: &Instrument,
        real_price: f64,
        number: f64,
        stoploss: f64,
        goal_price: f64,
        plan_price: f64,
        origin: TradeOrigin,
    ) -> Option<TradeRecord> {
        if number <= 0.0 || real_price <= 0.0 {
            return None;
        }
        let cost = self.cost_model.buy_cost(datetime, instrument, real_price, number);
        let total = real_price * number * instrument.multiplier + cost.total;
        if total > self.cash && !self.borrow_cash {
            debug!(symbol = %instrument.symbol, total, cash = self.cash, "buy refused: insufficient cash");
            return None;
        }

        self.cash -= total;
        let risk = if stoploss > 0.0 { (real_price - stoploss) * number } else { 0.0 };
        self.positions
            .entry(instrument.symbol.clone())
            .and_modify(|pos| {
                pos.number += number;
                pos.buy_money += total;
                pos.stoploss = stoploss;
                pos.goal_price = goal_price;
                pos.total_risk += risk;
            })
            .or_insert_with(|| {
                PositionRecord::open(
                    instrument.symbol.clone(),
                    datetime,
                    number,
                    total,
                    stoploss,
                    goal_price,
                    risk,
                )
            });

        Some(self.push_record(
            datetime,
            &instrument.symbol,
            Business::Buy,
            number,
            cost,
            plan_price,
            stoploss,
            goal_price,
            real_price,
            origin,
        ))
    }

    fn sell(
        &mut self,
        datetime: DateTime<Utc>,
        instrument: &Instrument,
        real_price: f64,
        number: f64,
        stoploss: f64,
        goal_price: f64,
        plan_price: f64,
        origin: TradeOrigin,
    ) -> Option<TradeRecord> {
        if number <= 0.0 || real_price <= 0.0 {
            return None;
        }
        let held = self.positions.get(&instrument.symbol).map_or(0.0, |p| p.number);
        if held <= 0.0 {
            debug!(symbol = %instrument.symbol, "sell refused: no position");
            return None;
        }
        let number = number.min(held);

        let cost = self.cost_model.sell_cost(datetime, instrument, real_price, number);
        self.cash += real_price * number * instrument.multiplier - cost.total;

        if number >= held {
            self.positions.remove(&instrument.symbol);
        } else if let Some(pos) = self.positions.get_mut(&instrument.symbol) {
            let remaining = pos.number - number;
            pos.buy_money *= remaining / pos.number;
            pos.number = remaining;
            pos.stoploss = stoploss;
            pos.goal_price = goal_price;
        }

        Some(self.push_record(
            datetime,
            &instrument.symbol,
            Business::Sell,
            number,
            cost,
            plan_price,
            stoploss,
            goal_price,
            real_price,
            origin,
        ))
    }

    fn sell_short(
        &mut self,
        datetime: DateTime<Utc>,
        instrument: &Instrument,
        real_price: f64,
        number: f64,
        stoploss: f64,
        goal_price: f64,
        plan_price: f64,
        origin: TradeOrigin,
    ) -> Option<TradeRecord> {
        if !self.borrow_stock {
            debug!(symbol = %instrument.symbol, "sell_short refused: borrow_stock disabled");
            return None;
        }
        if number <= 0.0 || real_price <= 0.0 {
            return None;
        }
        let proceeds = real_price * number * instrument.multiplier;
        let borrow = self
            .cost_model
            .borrow_stock_cost(datetime, instrument, real_price, number);
        let cost = self.cost_model.sell_cost(datetime, instrument, real_price, number);
        self.cash += proceeds - cost.total - borrow.total;

        let risk = if stoploss > 0.0 { (stoploss - real_price) * number } else { 0.0 };
        self.short_positions
            .entry(instrument.symbol.clone())
            .and_modify(|pos| {
                pos.number += number;
                pos.buy_money += proceeds;
                pos.stoploss = stoploss;
                pos.goal_price = goal_price;
                pos.total_risk += risk;
            })
            .or_insert_with(|| {
                PositionRecord::open(
                    instrument.symbol.clone(),
                    datetime,
                    number,
                    proceeds,
                    stoploss,
                    goal_price,
                    risk,
                )
            });

        Some(self.push_record(
            datetime,
            &instrument.symbol,
            Business::SellShort,
            number,
            cost,
            plan_price,
            stoploss,
            goal_price,
            real_price,
            origin,
        ))
    }

    fn buy_short(
        &mut self,
        datetime: DateTime<Utc>,
        instrument: &Instrument,
        real_price: f64,
        number: f64,
        stoploss: f64,
        goal_price: f64,
        plan_price: f64,
        origin: TradeOrigin,
    ) -> Option<TradeRecord> {
        if number <= 0.0 || real_price <= 0.0 {
            return None;
        }
        let owed = self
            .short_positions
            .get(&instrument.symbol)
            .map_or(0.0, |p| p.number);
        if owed <= 0.0 {
            debug!(symbol = %instrument.symbol, "buy_short refused: no short position");
            return None;
        }
        let number = number.min(owed);

        let cost = self.cost_model.buy_cost(datetime, instrument, real_price, number);
        let total = real_price * number * instrument.multiplier + cost.total;
        if total > self.cash && !self.borrow_cash {
            debug!(symbol = %instrument.symbol, total, cash = self.cash, "buy_short refused: insufficient cash");
            return None;
        }
        self.cash -= total;

        if number >= owed {
            self.short_positions.remove(&instrument.symbol);
        } else if let Some(pos) = self.short_positions.get_mut(&instrument.symbol) {
            let remaining = pos.number - number;
            pos.buy_money *= remaining / pos.number;
            pos.number = remaining;
            pos.stoploss = stoploss;
            pos.goal_price = goal_price;
        }

        Some(self.push_record(
            datetime,
            &instrument.symbol,
            Business::BuyShort,
            number,
            cost,
            plan_price,
            stoploss,
            goal_price,
            real_price,
            origin,
        ))
    }

    fn position(&self, symbol: &str) -> Option<PositionRecord> {
        self.positions.get(symbol).cloned()
    }

    fn short_position(&self, symbol: &str) -> Option<PositionRecord> {
        self.short_positions.get(symbol).cloned()
    }

    fn hold_number(&self, _datetime: DateTime<Utc>, symbol: &str) -> f64 {
        self.positions.get(symbol).map_or(0.0, |p| p.number)
    }

    fn short_hold_number(&self, _datetime: DateTime<Utc>, symbol: &str) -> f64 {
        self.short_positions.get(symbol).map_or(0.0, |p| p.number)
    }

    fn set_borrow_cash(&mut self, allow: bool) {
        self.borrow_cash = allow;
    }

    fn set_borrow_stock(&mut self, allow: bool) {
        self.borrow_stock = allow;
    }

    fn reset(&mut self) {
        self.cash = self.init_cash;
        self.positions.clear();
        self.short_positions.clear();
        self.records = vec![Self::init_record(self.init_datetime, self.init_cash)];
    }

    fn clone_box(&self) -> Box<dyn TradeManager> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::BpsCost;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn inst() -> Instrument {
        Instrument::equity("TEST")
    }

    #[test]
    fn buy_reduces_cash_and_opens_position() {
        let mut tm = SimAccount::new(100_000.0, at(1));
        let tr = tm
            .buy(at(2), &inst(), 100.0, 200.0, 95.0, 0.0, 100.0, TradeOrigin::Signal)
            .unwrap();
        assert_eq!(tr.business, Business::Buy);
        assert!((tm.current_cash() - 80_000.0).abs() < 1e-9);
        let pos = tm.position("TEST").unwrap();
        assert_eq!(pos.number, 200.0);
        assert_eq!(pos.stoploss, 95.0);
        assert!((pos.total_risk - 1_000.0).abs() < 1e-9);
    }

    #[test]
    fn buy_beyond_cash_is_rejected_without_borrowing() {
        let mut tm = SimAccount::new(10_000.0, at(1));
        let r = tm.buy(at(2), &inst(), 100.0, 200.0, 95.0, 0.0, 100.0, TradeOrigin::Signal);
        assert!(r.is_none());
        assert_eq!(tm.current_cash(), 10_000.0);
        assert!(tm.position("TEST").is_none());
    }

    #[test]
    fn borrow_cash_allows_leveraged_buy() {
        let mut tm = SimAccount::new(10_000.0, at(1));
        tm.set_borrow_cash(true);
        let r = tm.buy(at(2), &inst(), 100.0, 200.0, 95.0, 0.0, 100.0, TradeOrigin::Signal);
        assert!(r.is_some());
        assert!(tm.current_cash() < 0.0);
    }

    #[test]
    fn sell_clamps_to_held_quantity() {
        let mut tm = SimAccount::new(100_000.0, at(1));
        tm.buy(at(2), &inst(), 100.0, 200.0, 0.0, 0.0, 100.0, TradeOrigin::Signal)
            .unwrap();
        let tr = tm
            .sell(at(3), &inst(), 110.0, 500.0, 0.0, 0.0, 110.0, TradeOrigin::Signal)
            .unwrap();
        assert_eq!(tr.number, 200.0);
        assert!(tm.position("TEST").is_none());
    }

    #[test]
    fn partial_sell_scales_cost_basis() {
        let mut tm = SimAccount::new(100_000.0, at(1));
        tm.buy(at(2), &inst(), 100.0, 200.0, 0.0, 0.0, 100.0, TradeOrigin::Signal)
            .unwrap();
        tm.sell(at(3), &inst(), 110.0, 100.0, 0.0, 0.0, 110.0, TradeOrigin::Signal)
            .unwrap();
        let pos = tm.position("TEST").unwrap();
        assert_eq!(pos.number, 100.0);
        assert!((pos.buy_money - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn sell_without_position_is_rejected() {
        let mut tm = SimAccount::new(100_000.0, at(1));
        assert!(tm
            .sell(at(2), &inst(), 100.0, 100.0, 0.0, 0.0, 100.0, TradeOrigin::Signal)
            .is_none());
    }

    #[test]
    fn short_side_requires_borrow_stock() {
        let mut tm = SimAccount::new(100_000.0, at(1));
        assert!(tm
            .sell_short(at(2), &inst(), 100.0, 100.0, 105.0, 0.0, 100.0, TradeOrigin::Signal)
            .is_none());

        tm.set_borrow_stock(true);
        let tr = tm
            .sell_short(at(2), &inst(), 100.0, 100.0, 105.0, 0.0, 100.0, TradeOrigin::Signal)
            .unwrap();
        assert_eq!(tr.business, Business::SellShort);
        assert!((tm.current_cash() - 110_000.0).abs() < 1e-9);
        assert_eq!(tm.short_hold_number(at(2), "TEST"), 100.0);
    }

    #[test]
    fn cover_closes_short_position() {
        let mut tm = SimAccount::new(100_000.0, at(1));
        tm.set_borrow_stock(true);
        tm.sell_short(at(2), &inst(), 100.0, 100.0, 105.0, 0.0, 100.0, TradeOrigin::Signal)
            .unwrap();
        let tr = tm
            .buy_short(at(3), &inst(), 90.0, 100.0, 0.0, 0.0, 90.0, TradeOrigin::Signal)
            .unwrap();
        assert_eq!(tr.business, Business::BuyShort);
        assert!(tm.short_position("TEST").is_none());
        // 100k + 10k proceeds - 9k cover = 101k
        assert!((tm.current_cash() - 101_000.0).abs() < 1e-9);
    }

    #[test]
    fn costs_flow_into_cash() {
        let cost = BpsCost::new(0.0, 5.0, 0.0, 0.0); // flat 5 per trade via min commission
        let mut tm = SimAccount::with_cost_model(100_000.0, at(1), Box::new(cost));
        tm.buy(at(2), &inst(), 100.0, 100.0, 0.0, 0.0, 100.0, TradeOrigin::Signal)
            .unwrap();
        assert!((tm.current_cash() - (100_000.0 - 10_000.0 - 5.0)).abs() < 1e-9);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut tm = SimAccount::new(100_000.0, at(1));
        tm.buy(at(2), &inst(), 100.0, 200.0, 0.0, 0.0, 100.0, TradeOrigin::Signal)
            .unwrap();
        tm.reset();
        assert_eq!(tm.current_cash(), 100_000.0);
        assert!(tm.position("TEST").is_none());
        assert_eq!(tm.records().len(), 1);
        assert_eq!(tm.records()[0].business, Business::Init);
    }
}
