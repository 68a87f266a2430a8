//! Bar-by-bar trading system — the heart of the engine.
//!
//! Each bar runs the same fixed sequence:
//! 1. Degenerate-bar gate (flat or corrupt bars trade nothing by default)
//! 2. Delayed-order dispatch (at most one pending request executes per bar)
//! 3. Environment phase (market-wide validity transitions)
//! 4. Condition phase (system-level validity transitions)
//! 5. Signal phase (buy wins over sell when both fire)
//! 6. Position management (stoploss, profit goal, trailing take-profit)
//!
//! Decisions made with `delay` enabled execute on the *next* bar at its open
//! price; an unfilled request re-submits up to `max_delay_count` bars before
//! it is discarded.

use crate::components::{
    Condition, Environment, MoneyManager, ProfitGoal, Signal, Slippage, Stoploss, TradeManager,
};
use crate::domain::{
    Bar, BarSeries, Instrument, PendingOrder, RequestBook, RequestSlot, TradeOrigin, TradeRecord,
};
use crate::error::CoreError;
use crate::system::params::{ParamValue, SystemParams};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error};

/// The per-bar state machine. Single-threaded and not reentrant; clone the
/// system to run siblings in parallel — clones deep-copy every component.
#[derive(Clone)]
pub struct TradingSystem {
    name: String,
    params: SystemParams,

    tm: Option<Box<dyn TradeManager>>,
    mm: Option<Box<dyn MoneyManager>>,
    ev: Option<Box<dyn Environment>>,
    cn: Option<Box<dyn Condition>>,
    sg: Option<Box<dyn Signal>>,
    st: Option<Box<dyn Stoploss>>,
    tp: Option<Box<dyn Stoploss>>,
    pg: Option<Box<dyn ProfitGoal>>,
    sp: Option<Box<dyn Slippage>>,

    instrument: Option<Instrument>,

    // Transition latches for the environment/condition phases.
    pre_ev_valid: bool,
    pre_cn_valid: bool,

    // Bars since the last long entry / short entry; gate the take-profit
    // phase through `tp_delay_n`.
    buy_days: u32,
    sell_short_days: u32,

    last_take_profit: f64,
    last_short_take_profit: f64,

    trade_list: Vec<TradeRecord>,
    requests: RequestBook,
}

/// Serializable view of a system: parameters, component identities, and the
/// executed trade list. Pending requests are deliberately excluded — a
/// resumed backtest starts on a bar boundary.
#[derive(Debug, Clone, Serialize)]
pub struct SystemSnapshot {
    pub name: String,
    pub params: SystemParams,
    pub components: Vec<(String, String)>,
    pub trade_list: Vec<TradeRecord>,
}

impl Default for TradingSystem {
    fn default() -> Self {
        Self::new("sys_basic")
    }
}

impl TradingSystem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: SystemParams::default(),
            tm: None,
            mm: None,
            ev: None,
            cn: None,
            sg: None,
            st: None,
            tp: None,
            pg: None,
            sp: None,
            instrument: None,
            pre_ev_valid: true,
            pre_cn_valid: true,
            buy_days: 0,
            sell_short_days: 0,
            last_take_profit: 0.0,
            last_short_take_profit: 0.0,
            trade_list: Vec::new(),
            requests: RequestBook::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ── Component wiring ────────────────────────────────────────────────

    pub fn set_trade_manager(&mut self, tm: Box<dyn TradeManager>) -> &mut Self {
        self.tm = Some(tm);
        self
    }

    pub fn set_money_manager(&mut self, mm: Box<dyn MoneyManager>) -> &mut Self {
        self.mm = Some(mm);
        self
    }

    pub fn set_environment(&mut self, ev: Box<dyn Environment>) -> &mut Self {
        self.ev = Some(ev);
        self
    }

    pub fn set_condition(&mut self, cn: Box<dyn Condition>) -> &mut Self {
        self.cn = Some(cn);
        self
    }

    pub fn set_signal(&mut self, sg: Box<dyn Signal>) -> &mut Self {
        self.sg = Some(sg);
        self
    }

    pub fn set_stoploss(&mut self, st: Box<dyn Stoploss>) -> &mut Self {
        self.st = Some(st);
        self
    }

    pub fn set_take_profit(&mut self, tp: Box<dyn Stoploss>) -> &mut Self {
        self.tp = Some(tp);
        self
    }

    pub fn set_profit_goal(&mut self, pg: Box<dyn ProfitGoal>) -> &mut Self {
        self.pg = Some(pg);
        self
    }

    pub fn set_slippage(&mut self, sp: Box<dyn Slippage>) -> &mut Self {
        self.sp = Some(sp);
        self
    }

    pub fn trade_manager(&self) -> Option<&dyn TradeManager> {
        self.tm.as_deref()
    }

    // ── Parameter surface ───────────────────────────────────────────────

    pub fn params(&self) -> &SystemParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut SystemParams {
        &mut self.params
    }

    pub fn set_param(&mut self, key: &str, value: ParamValue) -> Result<(), CoreError> {
        self.params.set(key, value)
    }

    pub fn get_param(&self, key: &str) -> Result<ParamValue, CoreError> {
        self.params.get(key)
    }

    // ── Observation ─────────────────────────────────────────────────────

    /// Trades executed so far, in execution order.
    pub fn trades(&self) -> &[TradeRecord] {
        &self.trade_list
    }

    pub fn has_pending_request(&self) -> bool {
        self.requests.any_pending()
    }

    /// Current trailing take-profit level for the long side (0 when flat).
    pub fn last_take_profit(&self) -> f64 {
        self.last_take_profit
    }

    pub fn clear_pending_requests(&mut self) {
        self.requests.clear_all();
    }

    pub fn snapshot(&self) -> SystemSnapshot {
        let mut components = Vec::new();
        let mut push = |kind: &str, name: Option<&str>| {
            if let Some(name) = name {
                components.push((kind.to_string(), name.to_string()));
            }
        };
        push("trade_manager", self.tm.as_deref().map(|c| c.name()));
        push("money_manager", self.mm.as_deref().map(|c| c.name()));
        push("environment", self.ev.as_deref().map(|c| c.name()));
        push("condition", self.cn.as_deref().map(|c| c.name()));
        push("signal", self.sg.as_deref().map(|c| c.name()));
        push("stoploss", self.st.as_deref().map(|c| c.name()));
        push("take_profit", self.tp.as_deref().map(|c| c.name()));
        push("profit_goal", self.pg.as_deref().map(|c| c.name()));
        push("slippage", self.sp.as_deref().map(|c| c.name()));
        SystemSnapshot {
            name: self.name.clone(),
            params: self.params.clone(),
            components,
            trade_list: self.trade_list.clone(),
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Return the system and every component to pristine state. The bound
    /// instrument is kept so a host can rerun the same series.
    pub fn reset(&mut self) {
        if let Some(tm) = self.tm.as_deref_mut() {
            tm.reset();
        }
        if let Some(ev) = self.ev.as_deref_mut() {
            ev.reset();
        }
        if let Some(cn) = self.cn.as_deref_mut() {
            cn.reset();
        }
        if let Some(mm) = self.mm.as_deref_mut() {
            mm.reset();
        }
        if let Some(sg) = self.sg.as_deref_mut() {
            sg.reset();
        }
        if let Some(st) = self.st.as_deref_mut() {
            st.reset();
        }
        if let Some(tp) = self.tp.as_deref_mut() {
            tp.reset();
        }
        if let Some(pg) = self.pg.as_deref_mut() {
            pg.reset();
        }
        if let Some(sp) = self.sp.as_deref_mut() {
            sp.reset();
        }

        self.pre_ev_valid = false;
        self.pre_cn_valid = false;
        self.buy_days = 0;
        self.sell_short_days = 0;
        self.last_take_profit = 0.0;
        self.last_short_take_profit = 0.0;
        self.trade_list.clear();
        self.requests.clear_all();
    }

    /// Verify required components and arm the transition latches.
    pub fn ready_for_run(&mut self) -> Result<(), CoreError> {
        if self.tm.is_none() {
            return Err(CoreError::MissingComponent("trade_manager"));
        }
        if self.mm.is_none() {
            return Err(CoreError::MissingComponent("money_manager"));
        }
        if self.sg.is_none() {
            return Err(CoreError::MissingComponent("signal"));
        }

        // Arm the latches so the first valid bar registers as a false→true
        // transition when an environment/condition is present.
        if self.ev.is_some() {
            self.pre_ev_valid = false;
        }
        if self.cn.is_some() {
            self.pre_cn_valid = false;
        }

        let borrow_cash = self.params.support_borrow_cash;
        let borrow_stock = self.params.support_borrow_stock;
        if let Some(tm) = self.tm.as_deref_mut() {
            tm.set_borrow_cash(borrow_cash);
            tm.set_borrow_stock(borrow_stock);
        }
        Ok(())
    }

    /// Bind the candle series to every component.
    pub fn set_series(&mut self, series: &BarSeries) {
        self.instrument = Some(series.instrument().clone());

        // Signal binds before condition: conditions may consult the signal.
        if let Some(sg) = self.sg.as_deref_mut() {
            sg.set_series(series);
        }
        if let Some(cn) = self.cn.as_deref_mut() {
            cn.set_series(series);
        }
        if let Some(st) = self.st.as_deref_mut() {
            st.set_series(series);
        }
        if let Some(tp) = self.tp.as_deref_mut() {
            tp.set_series(series);
        }
        if let Some(pg) = self.pg.as_deref_mut() {
            pg.set_series(series);
        }
        if let Some(sp) = self.sp.as_deref_mut() {
            sp.set_series(series);
        }
        if let Some(ev) = self.ev.as_deref_mut() {
            ev.set_series(series);
        }
        if let Some(mm) = self.mm.as_deref_mut() {
            mm.set_series(series);
        }
    }

    /// Run the whole series through the state machine. With `reset` the
    /// system first returns to pristine state, so reruns reproduce the same
    /// trade list bit-for-bit.
    pub fn run(&mut self, series: &BarSeries, reset: bool) -> Result<&[TradeRecord], CoreError> {
        if reset {
            self.reset();
        }
        self.ready_for_run().map_err(|e| {
            error!(system = %self.name, %e, "not ready to run");
            e
        })?;

        self.set_series(series);

        let init = self
            .tm
            .as_deref()
            .map(|tm| tm.init_datetime())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        for bar in series.bars() {
            if bar.datetime >= init {
                self.run_moment(bar);
            }
        }
        Ok(&self.trade_list)
    }

    /// Process a single bar. Returns the trade executed on this bar, if any.
    pub fn run_moment(&mut self, bar: &Bar) -> Option<TradeRecord> {
        self.buy_days = self.buy_days.saturating_add(1);
        self.sell_short_days = self.sell_short_days.saturating_add(1);
        self.handle_bar(bar)
    }

    // ── The per-bar procedure ───────────────────────────────────────────

    fn handle_bar(&mut self, bar: &Bar) -> Option<TradeRecord> {
        // 1. Degenerate-bar gate. Decisions are skipped, but live delayed
        // requests stay alive: they re-submit with a bumped retry counter
        // and die once it exceeds max_delay_count.
        if bar.is_degenerate() && !self.params.can_trade_when_high_eq_low {
            self.bump_all_pending();
            return None;
        }

        // 2. Delayed-order dispatch.
        let result = self.process_pending(bar);

        // 3. Environment phase.
        let current_ev = self.environment_is_valid(bar.datetime);
        if !current_ev {
            let mut tr = None;
            if self.have_long() {
                tr = self.sell(bar, TradeOrigin::Environment);
            }
            self.pre_ev_valid = current_ev;
            return tr.or(result);
        }
        if !self.pre_ev_valid && self.params.ev_open_position {
            let tr = self.buy(bar, TradeOrigin::Environment);
            self.pre_ev_valid = current_ev;
            return tr.or(result);
        }
        self.pre_ev_valid = current_ev;

        // 4. Condition phase.
        let current_cn = self.condition_is_valid(bar.datetime);
        if !current_cn {
            let mut tr = None;
            if self.have_long() {
                tr = self.sell(bar, TradeOrigin::Condition);
            }
            self.pre_cn_valid = current_cn;
            return tr.or(result);
        }
        if !self.pre_cn_valid && self.params.cn_open_position {
            let tr = self.buy(bar, TradeOrigin::Condition);
            self.pre_cn_valid = current_cn;
            return tr.or(result);
        }
        self.pre_cn_valid = current_cn;

        // 5. Signal phase. Buy wins when both fire on the same bar.
        if self.signal_should_buy(bar.datetime) {
            let tr = if self.params.support_borrow_stock && self.have_short() {
                self.buy_short(bar, TradeOrigin::Signal)
            } else {
                self.buy(bar, TradeOrigin::Signal)
            };
            return tr.or(result);
        }
        if self.signal_should_sell(bar.datetime) {
            if self.have_long() {
                if !self.params.ignore_sell_sg {
                    let tr = self.sell(bar, TradeOrigin::Signal);
                    return tr.or(result);
                }
                // Sell signal suppressed while long: fall through so the
                // position-management phase still guards the position.
            } else if self.params.support_borrow_stock {
                let tr = self.sell_short(bar, TradeOrigin::Signal);
                return tr.or(result);
            }
        }

        // 6. Position management.
        if let Some(tr) = self.manage_long_position(bar) {
            return Some(tr);
        }
        if self.params.support_borrow_stock {
            if let Some(tr) = self.manage_short_position(bar) {
                return Some(tr);
            }
        }

        result
    }

    fn manage_long_position(&mut self, bar: &Bar) -> Option<TradeRecord> {
        let position = self.long_position()?;
        let close = bar.close;

        if position.stoploss > 0.0 && close <= position.stoploss {
            return self.sell(bar, TradeOrigin::Stoploss);
        }

        let goal = self.goal_price(bar.datetime, close);
        if goal > 0.0 && close >= goal {
            return self.sell(bar, TradeOrigin::ProfitGoal);
        }

        // Trailing take-profit, deferred tp_delay_n bars after entry.
        if self.buy_days < self.params.tp_delay_n {
            return None;
        }
        let mut tp = self.take_profit_price(bar.datetime, close);
        if tp == 0.0 {
            return None;
        }
        if self.params.tp_monotonic {
            tp = tp.max(self.last_take_profit);
        }
        self.last_take_profit = tp;
        if close <= tp {
            return self.sell(bar, TradeOrigin::TakeProfit);
        }
        None
    }

    fn manage_short_position(&mut self, bar: &Bar) -> Option<TradeRecord> {
        let position = self.short_position()?;
        let close = bar.close;

        // Mirror of the long side: a short is stopped out when price rises
        // to the stop, and takes profit as price falls.
        if position.stoploss > 0.0 && close >= position.stoploss {
            return self.buy_short(bar, TradeOrigin::Stoploss);
        }

        let goal = self.goal_price(bar.datetime, close);
        if goal > 0.0 && close <= goal {
            return self.buy_short(bar, TradeOrigin::ProfitGoal);
        }

        if self.sell_short_days < self.params.tp_delay_n {
            return None;
        }
        let mut tp = self.take_profit_price(bar.datetime, close);
        if tp == 0.0 {
            return None;
        }
        if self.params.tp_monotonic && self.last_short_take_profit > 0.0 {
            tp = tp.min(self.last_short_take_profit);
        }
        self.last_short_take_profit = tp;
        if close >= tp {
            return self.buy_short(bar, TradeOrigin::TakeProfit);
        }
        None
    }

    // ── Delayed-order dispatch ──────────────────────────────────────────

    fn process_pending(&mut self, bar: &Bar) -> Option<TradeRecord> {
        // Only the highest-priority live request runs on a bar, even when
        // its execution ends up producing no trade.
        match self.requests.first_pending()? {
            RequestSlot::Buy => self.buy_delay(bar),
            RequestSlot::Sell => self.sell_delay(bar),
            RequestSlot::SellShort => self.sell_short_delay(bar),
            RequestSlot::BuyShort => self.buy_short_delay(bar),
        }
    }

    /// Bump a live request's retry counter; discard it once the counter
    /// exceeds `max_delay_count`. Returns false if the request was dropped.
    fn bump_or_discard(&mut self, slot: RequestSlot) -> bool {
        let max = self.params.max_delay_count;
        let Some(req) = self.requests.get_mut(slot) else {
            return false;
        };
        req.count += 1;
        if req.count > max {
            debug!(?slot, count = req.count, "delayed request exceeded max_delay_count, dropped");
            self.requests.clear(slot);
            return false;
        }
        true
    }

    fn bump_all_pending(&mut self) {
        for slot in RequestSlot::DISPATCH_ORDER {
            if self.requests.get(slot).is_some() {
                self.bump_or_discard(slot);
            }
        }
    }

    // ── Long entry ──────────────────────────────────────────────────────

    fn buy(&mut self, bar: &Bar, origin: TradeOrigin) -> Option<TradeRecord> {
        if self.params.delay {
            self.submit_buy_request(bar, origin);
            None
        } else {
            self.buy_now(bar, origin)
        }
    }

    fn buy_now(&mut self, bar: &Bar, origin: TradeOrigin) -> Option<TradeRecord> {
        let plan_price = bar.close;
        let stoploss = self.stoploss_price(bar.datetime, plan_price);

        // A long entry must sit above its stop.
        if stoploss > 0.0 && plan_price <= stoploss {
            return None;
        }

        let number = self.buy_quantity(bar.datetime, plan_price, plan_price - stoploss, origin);
        let number = self.round_lot(number);
        if number == 0.0 {
            return None;
        }

        let real_price = self.real_buy_price(bar.datetime, plan_price);
        let goal_price = self.goal_price(bar.datetime, plan_price);
        let record = self.tm_buy(
            bar.datetime,
            real_price,
            number,
            stoploss,
            goal_price,
            plan_price,
            origin,
        )?;

        self.buy_days = 0;
        self.last_take_profit = record.real_price;
        self.trade_list.push(record.clone());
        self.buy_notify_all(&record);
        Some(record)
    }

    fn submit_buy_request(&mut self, bar: &Bar, origin: TradeOrigin) {
        if self.requests.get(RequestSlot::Buy).is_some() {
            if !self.bump_or_discard(RequestSlot::Buy) {
                return;
            }
            let origin = self.requests.get(RequestSlot::Buy).map(|r| r.origin).unwrap_or(origin);
            if self.params.delay_use_current_price {
                let stoploss = self.stoploss_price(bar.datetime, bar.close);
                let goal = self.goal_price(bar.datetime, bar.close);
                let number =
                    self.buy_quantity(bar.datetime, bar.close, bar.close - stoploss, origin);
                if let Some(req) = self.requests.get_mut(RequestSlot::Buy) {
                    req.datetime = bar.datetime;
                    req.plan_price = bar.close;
                    req.stoploss = stoploss;
                    req.goal = goal;
                    req.number = number;
                }
            } else if let Some(req) = self.requests.get_mut(RequestSlot::Buy) {
                req.datetime = bar.datetime;
            }
        } else {
            let stoploss = self.stoploss_price(bar.datetime, bar.close);
            let goal = self.goal_price(bar.datetime, bar.close);
            let number = self.buy_quantity(bar.datetime, bar.close, bar.close - stoploss, origin);
            self.requests.put(
                RequestSlot::Buy,
                PendingOrder {
                    business: RequestSlot::Buy.business(),
                    origin,
                    datetime: bar.datetime,
                    plan_price: bar.close,
                    stoploss,
                    goal,
                    number,
                    count: 1,
                },
            );
        }
    }

    fn buy_delay(&mut self, bar: &Bar) -> Option<TradeRecord> {
        let req = self.requests.get(RequestSlot::Buy).cloned()?;
        let plan_price = bar.open;

        let (stoploss, number, goal_price) = if self.params.delay_use_current_price {
            let stoploss = self.stoploss_price(bar.datetime, plan_price);
            let number =
                self.buy_quantity(bar.datetime, plan_price, plan_price - stoploss, req.origin);
            let goal = self.goal_price(bar.datetime, plan_price);
            (stoploss, number, goal)
        } else {
            (req.stoploss, req.number, req.goal)
        };

        // Guards: a long fill below its stop, or a quantity that rounded to
        // zero, cancels the request without trading.
        let number = self.round_lot(number);
        if (stoploss > 0.0 && plan_price <= stoploss) || number == 0.0 {
            self.requests.clear(RequestSlot::Buy);
            return None;
        }

        let real_price = self.real_buy_price(bar.datetime, plan_price);
        let record = match self.tm_buy(
            bar.datetime,
            real_price,
            number,
            stoploss,
            goal_price,
            plan_price,
            req.origin,
        ) {
            Some(record) => record,
            None => {
                self.requests.clear(RequestSlot::Buy);
                return None;
            }
        };

        self.buy_days = 0;
        self.last_take_profit = record.real_price;
        self.trade_list.push(record.clone());
        self.buy_notify_all(&record);
        self.requests.clear(RequestSlot::Buy);
        Some(record)
    }

    // ── Long exit ───────────────────────────────────────────────────────

    fn sell(&mut self, bar: &Bar, origin: TradeOrigin) -> Option<TradeRecord> {
        if self.params.delay {
            self.submit_sell_request(bar, origin);
            None
        } else {
            self.sell_now(bar, origin)
        }
    }

    fn sell_now(&mut self, bar: &Bar, origin: TradeOrigin) -> Option<TradeRecord> {
        let plan_price = bar.close;
        let stoploss = self.stoploss_price(bar.datetime, plan_price);

        // Below the stop the entire holding goes; otherwise the money
        // manager chooses the exit quantity.
        let number = if stoploss > 0.0 && plan_price <= stoploss {
            self.hold_number(bar.datetime)
        } else {
            self.sell_quantity(bar.datetime, plan_price, plan_price - stoploss, origin)
        };
        let number = self.round_lot(number);
        if number == 0.0 {
            return None;
        }

        let goal_price = self.goal_price(bar.datetime, plan_price);
        let real_price = self.real_sell_price(bar.datetime, plan_price);
        let record = self.tm_sell(
            bar.datetime,
            real_price,
            number,
            stoploss,
            goal_price,
            plan_price,
            origin,
        )?;

        if self.have_long() {
            self.last_take_profit = self.take_profit_price(bar.datetime, bar.close);
        } else {
            self.last_take_profit = 0.0;
        }
        self.trade_list.push(record.clone());
        self.sell_notify_all(&record);
        Some(record)
    }

    fn submit_sell_request(&mut self, bar: &Bar, origin: TradeOrigin) {
        if self.requests.get(RequestSlot::Sell).is_some() {
            if !self.bump_or_discard(RequestSlot::Sell) {
                return;
            }
            let origin = self.requests.get(RequestSlot::Sell).map(|r| r.origin).unwrap_or(origin);
            if self.params.delay_use_current_price {
                let (stoploss, number, goal) = self.sell_terms(bar, origin);
                if let Some(req) = self.requests.get_mut(RequestSlot::Sell) {
                    req.datetime = bar.datetime;
                    req.plan_price = bar.close;
                    req.stoploss = stoploss;
                    req.goal = goal;
                    req.number = number;
                }
            } else if let Some(req) = self.requests.get_mut(RequestSlot::Sell) {
                req.datetime = bar.datetime;
            }
        } else {
            let (stoploss, number, goal) = self.sell_terms(bar, origin);
            self.requests.put(
                RequestSlot::Sell,
                PendingOrder {
                    business: RequestSlot::Sell.business(),
                    origin,
                    datetime: bar.datetime,
                    plan_price: bar.close,
                    stoploss,
                    goal,
                    number,
                    count: 1,
                },
            );
        }
    }

    /// Stoploss / quantity / goal for a long exit decided at `bar`'s close.
    fn sell_terms(&mut self, bar: &Bar, origin: TradeOrigin) -> (f64, f64, f64) {
        let stoploss = self.stoploss_price(bar.datetime, bar.close);
        let number = if stoploss > 0.0 && bar.close <= stoploss {
            self.hold_number(bar.datetime)
        } else {
            self.sell_quantity(bar.datetime, bar.close, bar.close - stoploss, origin)
        };
        let goal = self.goal_price(bar.datetime, bar.close);
        (stoploss, number, goal)
    }

    fn sell_delay(&mut self, bar: &Bar) -> Option<TradeRecord> {
        let req = self.requests.get(RequestSlot::Sell).cloned()?;
        let plan_price = bar.open;

        let (stoploss, number, goal_price) = if self.params.delay_use_current_price {
            let stoploss = self.stoploss_price(bar.datetime, plan_price);
            let number = if stoploss > 0.0 && plan_price < stoploss {
                self.hold_number(bar.datetime)
            } else {
                self.sell_quantity(bar.datetime, plan_price, plan_price - stoploss, req.origin)
            };
            let goal = self.goal_price(bar.datetime, plan_price);
            (stoploss, number, goal)
        } else {
            (req.stoploss, req.number, req.goal)
        };

        let number = self.round_lot(number);
        if number == 0.0 {
            self.requests.clear(RequestSlot::Sell);
            return None;
        }

        let real_price = self.real_sell_price(bar.datetime, plan_price);
        let record = match self.tm_sell(
            bar.datetime,
            real_price,
            number,
            stoploss,
            goal_price,
            plan_price,
            req.origin,
        ) {
            Some(record) => record,
            None => {
                self.requests.clear(RequestSlot::Sell);
                return None;
            }
        };

        if !self.have_long() {
            self.last_take_profit = 0.0;
        }
        self.trade_list.push(record.clone());
        self.sell_notify_all(&record);
        self.requests.clear(RequestSlot::Sell);
        Some(record)
    }

    // ── Short entry (sell borrowed stock) ───────────────────────────────

    fn sell_short(&mut self, bar: &Bar, origin: TradeOrigin) -> Option<TradeRecord> {
        if !self.params.support_borrow_stock {
            return None;
        }
        if self.params.delay {
            self.submit_sell_short_request(bar, origin);
            None
        } else {
            self.sell_short_now(bar, origin)
        }
    }

    fn sell_short_now(&mut self, bar: &Bar, origin: TradeOrigin) -> Option<TradeRecord> {
        let plan_price = bar.close;
        let stoploss = self.stoploss_price(bar.datetime, plan_price);

        // A short entry must sit below its stop.
        if stoploss > 0.0 && plan_price >= stoploss {
            return None;
        }

        let number =
            self.sell_short_quantity(bar.datetime, plan_price, stoploss - plan_price, origin);
        let number = self.round_lot(number);
        if number == 0.0 {
            return None;
        }

        let goal_price = self.goal_price(bar.datetime, plan_price);
        let real_price = self.real_sell_price(bar.datetime, plan_price);
        let record = self.tm_sell_short(
            bar.datetime,
            real_price,
            number,
            stoploss,
            goal_price,
            plan_price,
            origin,
        )?;

        self.sell_short_days = 0;
        self.last_short_take_profit = record.real_price;
        self.trade_list.push(record.clone());
        self.sell_notify_all(&record);
        Some(record)
    }

    fn submit_sell_short_request(&mut self, bar: &Bar, origin: TradeOrigin) {
        if self.requests.get(RequestSlot::SellShort).is_some() {
            if !self.bump_or_discard(RequestSlot::SellShort) {
                return;
            }
            let origin = self
                .requests
                .get(RequestSlot::SellShort)
                .map(|r| r.origin)
                .unwrap_or(origin);
            if self.params.delay_use_current_price {
                let stoploss = self.stoploss_price(bar.datetime, bar.close);
                let goal = self.goal_price(bar.datetime, bar.close);
                let number = self.sell_short_quantity(
                    bar.datetime,
                    bar.close,
                    stoploss - bar.close,
                    origin,
                );
                if let Some(req) = self.requests.get_mut(RequestSlot::SellShort) {
                    req.datetime = bar.datetime;
                    req.plan_price = bar.close;
                    req.stoploss = stoploss;
                    req.goal = goal;
                    req.number = number;
                }
            } else if let Some(req) = self.requests.get_mut(RequestSlot::SellShort) {
                req.datetime = bar.datetime;
            }
        } else {
            let stoploss = self.stoploss_price(bar.datetime, bar.close);
            let goal = self.goal_price(bar.datetime, bar.close);
            let number =
                self.sell_short_quantity(bar.datetime, bar.close, stoploss - bar.close, origin);
            self.requests.put(
                RequestSlot::SellShort,
                PendingOrder {
                    business: RequestSlot::SellShort.business(),
                    origin,
                    datetime: bar.datetime,
                    plan_price: bar.close,
                    stoploss,
                    goal,
                    number,
                    count: 1,
                },
            );
        }
    }

    fn sell_short_delay(&mut self, bar: &Bar) -> Option<TradeRecord> {
        let req = self.requests.get(RequestSlot::SellShort).cloned()?;
        let plan_price = bar.open;

        let (stoploss, number, goal_price) = if self.params.delay_use_current_price {
            let stoploss = self.stoploss_price(bar.datetime, plan_price);
            let number = self.sell_short_quantity(
                bar.datetime,
                plan_price,
                stoploss - plan_price,
                req.origin,
            );
            let goal = self.goal_price(bar.datetime, plan_price);
            (stoploss, number, goal)
        } else {
            (req.stoploss, req.number, req.goal)
        };

        let number = self.round_lot(number);
        if (stoploss > 0.0 && plan_price >= stoploss) || number == 0.0 {
            self.requests.clear(RequestSlot::SellShort);
            return None;
        }

        let real_price = self.real_sell_price(bar.datetime, plan_price);
        let record = match self.tm_sell_short(
            bar.datetime,
            real_price,
            number,
            stoploss,
            goal_price,
            plan_price,
            req.origin,
        ) {
            Some(record) => record,
            None => {
                self.requests.clear(RequestSlot::SellShort);
                return None;
            }
        };

        self.sell_short_days = 0;
        self.last_short_take_profit = record.real_price;
        self.trade_list.push(record.clone());
        self.sell_notify_all(&record);
        self.requests.clear(RequestSlot::SellShort);
        Some(record)
    }

    // ── Short cover (buy back borrowed stock) ───────────────────────────

    fn buy_short(&mut self, bar: &Bar, origin: TradeOrigin) -> Option<TradeRecord> {
        if !self.params.support_borrow_stock {
            return None;
        }
        if self.params.delay {
            self.submit_buy_short_request(bar, origin);
            None
        } else {
            self.buy_short_now(bar, origin)
        }
    }

    fn buy_short_now(&mut self, bar: &Bar, origin: TradeOrigin) -> Option<TradeRecord> {
        let owed = self.short_hold_number(bar.datetime);
        if owed == 0.0 {
            return None;
        }

        let plan_price = bar.close;
        let stoploss = self.stoploss_price(bar.datetime, plan_price);

        // Above the stop the entire short goes; otherwise the money manager
        // chooses the cover quantity.
        let number = if stoploss > 0.0 && plan_price >= stoploss {
            owed
        } else {
            self.buy_short_quantity(bar.datetime, plan_price, stoploss - plan_price, origin)
        };
        let number = self.round_lot(number.min(owed));
        if number == 0.0 {
            return None;
        }

        let goal_price = self.goal_price(bar.datetime, plan_price);
        let real_price = self.real_buy_price(bar.datetime, plan_price);
        let record = self.tm_buy_short(
            bar.datetime,
            real_price,
            number,
            stoploss,
            goal_price,
            plan_price,
            origin,
        )?;

        self.sell_short_days = 0;
        if !self.have_short() {
            self.last_short_take_profit = 0.0;
        }
        self.trade_list.push(record.clone());
        self.buy_notify_all(&record);
        Some(record)
    }

    fn submit_buy_short_request(&mut self, bar: &Bar, origin: TradeOrigin) {
        if self.requests.get(RequestSlot::BuyShort).is_some() {
            if !self.bump_or_discard(RequestSlot::BuyShort) {
                return;
            }
            let origin = self
                .requests
                .get(RequestSlot::BuyShort)
                .map(|r| r.origin)
                .unwrap_or(origin);
            if self.params.delay_use_current_price {
                let stoploss = self.stoploss_price(bar.datetime, bar.close);
                let goal = self.goal_price(bar.datetime, bar.close);
                let number = self.buy_short_quantity(
                    bar.datetime,
                    bar.close,
                    stoploss - bar.close,
                    origin,
                );
                if let Some(req) = self.requests.get_mut(RequestSlot::BuyShort) {
                    req.datetime = bar.datetime;
                    req.plan_price = bar.close;
                    req.stoploss = stoploss;
                    req.goal = goal;
                    req.number = number;
                }
            } else if let Some(req) = self.requests.get_mut(RequestSlot::BuyShort) {
                req.datetime = bar.datetime;
            }
        } else {
            let stoploss = self.stoploss_price(bar.datetime, bar.close);
            let goal = self.goal_price(bar.datetime, bar.close);
            let number =
                self.buy_short_quantity(bar.datetime, bar.close, stoploss - bar.close, origin);
            self.requests.put(
                RequestSlot::BuyShort,
                PendingOrder {
                    business: RequestSlot::BuyShort.business(),
                    origin,
                    datetime: bar.datetime,
                    plan_price: bar.close,
                    stoploss,
                    goal,
                    number,
                    count: 1,
                },
            );
        }
    }

    fn buy_short_delay(&mut self, bar: &Bar) -> Option<TradeRecord> {
        let req = self.requests.get(RequestSlot::BuyShort).cloned()?;
        let owed = self.short_hold_number(bar.datetime);
        if owed == 0.0 {
            self.requests.clear(RequestSlot::BuyShort);
            return None;
        }

        let plan_price = bar.open;
        let (stoploss, number, goal_price) = if self.params.delay_use_current_price {
            let stoploss = self.stoploss_price(bar.datetime, plan_price);
            let number = if stoploss > 0.0 && plan_price >= stoploss {
                owed
            } else {
                self.buy_short_quantity(bar.datetime, plan_price, stoploss - plan_price, req.origin)
            };
            let goal = self.goal_price(bar.datetime, plan_price);
            (stoploss, number, goal)
        } else {
            (req.stoploss, req.number, req.goal)
        };

        let number = self.round_lot(number.min(owed));
        if number == 0.0 {
            self.requests.clear(RequestSlot::BuyShort);
            return None;
        }

        let real_price = self.real_buy_price(bar.datetime, plan_price);
        let record = match self.tm_buy_short(
            bar.datetime,
            real_price,
            number,
            stoploss,
            goal_price,
            plan_price,
            req.origin,
        ) {
            Some(record) => record,
            None => {
                self.requests.clear(RequestSlot::BuyShort);
                return None;
            }
        };

        self.sell_short_days = 0;
        if !self.have_short() {
            self.last_short_take_profit = 0.0;
        }
        self.trade_list.push(record.clone());
        self.buy_notify_all(&record);
        self.requests.clear(RequestSlot::BuyShort);
        Some(record)
    }

    // ── Component queries ───────────────────────────────────────────────

    fn environment_is_valid(&mut self, datetime: DateTime<Utc>) -> bool {
        match self.ev.as_deref_mut() {
            Some(ev) => ev.is_valid(datetime),
            None => true,
        }
    }

    fn condition_is_valid(&mut self, datetime: DateTime<Utc>) -> bool {
        let Some(cn) = self.cn.as_deref_mut() else {
            return true;
        };
        let (Some(tm), Some(sg)) = (self.tm.as_deref(), self.sg.as_deref_mut()) else {
            return true;
        };
        cn.is_valid(datetime, tm, sg)
    }

    fn signal_should_buy(&mut self, datetime: DateTime<Utc>) -> bool {
        self.sg.as_deref_mut().is_some_and(|sg| sg.should_buy(datetime))
    }

    fn signal_should_sell(&mut self, datetime: DateTime<Utc>) -> bool {
        self.sg.as_deref_mut().is_some_and(|sg| sg.should_sell(datetime))
    }

    fn stoploss_price(&mut self, datetime: DateTime<Utc>, price: f64) -> f64 {
        match self.st.as_deref_mut() {
            Some(st) => st.price(datetime, price),
            None => 0.0,
        }
    }

    fn take_profit_price(&mut self, datetime: DateTime<Utc>, price: f64) -> f64 {
        match self.tp.as_deref_mut() {
            Some(tp) => tp.price(datetime, price),
            None => 0.0,
        }
    }

    fn goal_price(&mut self, datetime: DateTime<Utc>, price: f64) -> f64 {
        match self.pg.as_deref_mut() {
            Some(pg) => pg.goal(datetime, price),
            None => 0.0,
        }
    }

    fn real_buy_price(&mut self, datetime: DateTime<Utc>, plan_price: f64) -> f64 {
        match self.sp.as_deref_mut() {
            Some(sp) => sp.real_buy_price(datetime, plan_price),
            None => plan_price,
        }
    }

    fn real_sell_price(&mut self, datetime: DateTime<Utc>, plan_price: f64) -> f64 {
        match self.sp.as_deref_mut() {
            Some(sp) => sp.real_sell_price(datetime, plan_price),
            None => plan_price,
        }
    }

    fn buy_quantity(
        &mut self,
        datetime: DateTime<Utc>,
        price: f64,
        risk: f64,
        origin: TradeOrigin,
    ) -> f64 {
        let (Some(mm), Some(tm), Some(inst)) =
            (self.mm.as_deref_mut(), self.tm.as_deref(), self.instrument.as_ref())
        else {
            return 0.0;
        };
        mm.buy_quantity(tm, datetime, inst, price, risk, origin)
    }

    fn sell_quantity(
        &mut self,
        datetime: DateTime<Utc>,
        price: f64,
        risk: f64,
        origin: TradeOrigin,
    ) -> f64 {
        let (Some(mm), Some(tm), Some(inst)) =
            (self.mm.as_deref_mut(), self.tm.as_deref(), self.instrument.as_ref())
        else {
            return 0.0;
        };
        mm.sell_quantity(tm, datetime, inst, price, risk, origin)
    }

    fn sell_short_quantity(
        &mut self,
        datetime: DateTime<Utc>,
        price: f64,
        risk: f64,
        origin: TradeOrigin,
    ) -> f64 {
        let (Some(mm), Some(tm), Some(inst)) =
            (self.mm.as_deref_mut(), self.tm.as_deref(), self.instrument.as_ref())
        else {
            return 0.0;
        };
        mm.sell_short_quantity(tm, datetime, inst, price, risk, origin)
    }

    fn buy_short_quantity(
        &mut self,
        datetime: DateTime<Utc>,
        price: f64,
        risk: f64,
        origin: TradeOrigin,
    ) -> f64 {
        let (Some(mm), Some(tm), Some(inst)) =
            (self.mm.as_deref_mut(), self.tm.as_deref(), self.instrument.as_ref())
        else {
            return 0.0;
        };
        mm.buy_short_quantity(tm, datetime, inst, price, risk, origin)
    }

    fn round_lot(&self, number: f64) -> f64 {
        match self.instrument.as_ref() {
            Some(inst) => inst.round_lot(number),
            None => 0.0,
        }
    }

    // ── Trade manager access ────────────────────────────────────────────

    fn symbol(&self) -> &str {
        self.instrument.as_ref().map(|i| i.symbol.as_str()).unwrap_or("")
    }

    fn have_long(&self) -> bool {
        let symbol = self.symbol();
        self.tm.as_deref().is_some_and(|tm| tm.have(symbol))
    }

    fn have_short(&self) -> bool {
        let symbol = self.symbol();
        self.tm.as_deref().is_some_and(|tm| tm.have_short(symbol))
    }

    fn long_position(&self) -> Option<crate::domain::PositionRecord> {
        self.tm.as_deref()?.position(self.symbol())
    }

    fn short_position(&self) -> Option<crate::domain::PositionRecord> {
        self.tm.as_deref()?.short_position(self.symbol())
    }

    fn hold_number(&self, datetime: DateTime<Utc>) -> f64 {
        let symbol = self.symbol();
        self.tm.as_deref().map_or(0.0, |tm| tm.hold_number(datetime, symbol))
    }

    fn short_hold_number(&self, datetime: DateTime<Utc>) -> f64 {
        let symbol = self.symbol();
        self.tm.as_deref().map_or(0.0, |tm| tm.short_hold_number(datetime, symbol))
    }

    #[allow(clippy::too_many_arguments)]
    fn tm_buy(
        &mut self,
        datetime: DateTime<Utc>,
        real_price: f64,
        number: f64,
        stoploss: f64,
        goal_price: f64,
        plan_price: f64,
        origin: TradeOrigin,
    ) -> Option<TradeRecord> {
        let (Some(tm), Some(inst)) = (self.tm.as_deref_mut(), self.instrument.as_ref()) else {
            return None;
        };
        tm.buy(datetime, inst, real_price, number, stoploss, goal_price, plan_price, origin)
    }

    #[allow(clippy::too_many_arguments)]
    fn tm_sell(
        &mut self,
        datetime: DateTime<Utc>,
        real_price: f64,
        number: f64,
        stoploss: f64,
        goal_price: f64,
        plan_price: f64,
        origin: TradeOrigin,
    ) -> Option<TradeRecord> {
        let (Some(tm), Some(inst)) = (self.tm.as_deref_mut(), self.instrument.as_ref()) else {
            return None;
        };
        tm.sell(datetime, inst, real_price, number, stoploss, goal_price, plan_price, origin)
    }

    #[allow(clippy::too_many_arguments)]
    fn tm_sell_short(
        &mut self,
        datetime: DateTime<Utc>,
        real_price: f64,
        number: f64,
        stoploss: f64,
        goal_price: f64,
        plan_price: f64,
        origin: TradeOrigin,
    ) -> Option<TradeRecord> {
        let (Some(tm), Some(inst)) = (self.tm.as_deref_mut(), self.instrument.as_ref()) else {
            return None;
        };
        tm.sell_short(datetime, inst, real_price, number, stoploss, goal_price, plan_price, origin)
    }

    #[allow(clippy::too_many_arguments)]
    fn tm_buy_short(
        &mut self,
        datetime: DateTime<Utc>,
        real_price: f64,
        number: f64,
        stoploss: f64,
        goal_price: f64,
        plan_price: f64,
        origin: TradeOrigin,
    ) -> Option<TradeRecord> {
        let (Some(tm), Some(inst)) = (self.tm.as_deref_mut(), self.instrument.as_ref()) else {
            return None;
        };
        tm.buy_short(datetime, inst, real_price, number, stoploss, goal_price, plan_price, origin)
    }

    fn buy_notify_all(&mut self, record: &TradeRecord) {
        if let Some(mm) = self.mm.as_deref_mut() {
            mm.buy_notify(record);
        }
        if let Some(pg) = self.pg.as_deref_mut() {
            pg.buy_notify(record);
        }
    }

    fn sell_notify_all(&mut self, record: &TradeRecord) {
        if let Some(mm) = self.mm.as_deref_mut() {
            mm.sell_notify(record);
        }
        if let Some(pg) = self.pg.as_deref_mut() {
            pg.sell_notify(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::SimAccount;
    use crate::components::{FixedCountManager, NullSignal, ScriptedSignal};
    use crate::domain::Business;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn bar(day: u32, close: f64) -> Bar {
        Bar::new(at(day), close - 0.5, close + 1.0, close - 1.0, close, 1_000.0, close * 1_000.0)
    }

    fn flat_bar(day: u32, price: f64) -> Bar {
        Bar::new(at(day), price, price, price, price, 0.0, 0.0)
    }

    fn series(bars: Vec<Bar>) -> BarSeries {
        BarSeries::new(Instrument::equity("TEST"), bars).unwrap()
    }

    fn basic_system(sg: Box<dyn Signal>) -> TradingSystem {
        let mut sys = TradingSystem::new("test_sys");
        sys.set_trade_manager(Box::new(SimAccount::new(100_000.0, at(1))))
            .set_money_manager(Box::new(FixedCountManager::new(100.0)))
            .set_signal(sg);
        sys
    }

    #[test]
    fn run_fails_without_trade_manager() {
        let mut sys = TradingSystem::new("incomplete");
        sys.set_money_manager(Box::new(FixedCountManager::new(100.0)))
            .set_signal(Box::new(NullSignal));
        let s = series(vec![bar(1, 100.0)]);
        let err = sys.run(&s, true).unwrap_err();
        assert!(matches!(err, CoreError::MissingComponent("trade_manager")));
    }

    #[test]
    fn run_fails_without_signal() {
        let mut sys = TradingSystem::new("incomplete");
        sys.set_trade_manager(Box::new(SimAccount::new(100_000.0, at(1))))
            .set_money_manager(Box::new(FixedCountManager::new(100.0)));
        let s = series(vec![bar(1, 100.0)]);
        assert!(matches!(
            sys.run(&s, true),
            Err(CoreError::MissingComponent("signal"))
        ));
    }

    #[test]
    fn null_signal_trades_nothing() {
        let mut sys = basic_system(Box::new(NullSignal));
        let s = series((1..=20).map(|d| bar(d, 100.0 + d as f64)).collect());
        let trades = sys.run(&s, true).unwrap();
        assert!(trades.is_empty());
    }

    #[test]
    fn degenerate_bar_produces_no_decision() {
        let sg = ScriptedSignal::new().buy_at(at(2));
        let mut sys = basic_system(Box::new(sg));
        // Bar 2 is flat (high == low), so the buy signal is never consulted.
        let s = series(vec![bar(1, 100.0), flat_bar(2, 100.0), bar(3, 100.0), bar(4, 100.0)]);
        let trades = sys.run(&s, true).unwrap();
        assert!(trades.is_empty());
    }

    #[test]
    fn degenerate_bar_trades_when_allowed() {
        let sg = ScriptedSignal::new().buy_at(at(2));
        let mut sys = basic_system(Box::new(sg));
        sys.params_mut().can_trade_when_high_eq_low = true;
        sys.params_mut().delay = false;
        let s = series(vec![bar(1, 100.0), flat_bar(2, 100.0), bar(3, 101.0)]);
        let trades = sys.run(&s, true).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].datetime, at(2));
    }

    #[test]
    fn delayed_buy_executes_next_bar_at_open() {
        let sg = ScriptedSignal::new().buy_at(at(5));
        let mut sys = basic_system(Box::new(sg));
        let s = series((1..=10).map(|d| bar(d, 100.0 + d as f64)).collect());
        let trades = sys.run(&s, true).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].datetime, at(6));
        assert_eq!(trades[0].business, Business::Buy);
        // Executed at bar 6's open.
        assert!((trades[0].plan_price - 105.5).abs() < 1e-9);
    }

    #[test]
    fn immediate_buy_executes_on_decision_bar_at_close() {
        let sg = ScriptedSignal::new().buy_at(at(5));
        let mut sys = basic_system(Box::new(sg));
        sys.params_mut().delay = false;
        let s = series((1..=10).map(|d| bar(d, 100.0 + d as f64)).collect());
        let trades = sys.run(&s, true).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].datetime, at(5));
        assert!((trades[0].plan_price - 105.0).abs() < 1e-9);
    }

    #[test]
    fn rerun_with_reset_reproduces_trades() {
        let sg = ScriptedSignal::new().buy_at(at(3)).sell_at(at(7));
        let mut sys = basic_system(Box::new(sg));
        let s = series((1..=10).map(|d| bar(d, 100.0 + d as f64)).collect());
        let first: Vec<TradeRecord> = sys.run(&s, true).unwrap().to_vec();
        let second: Vec<TradeRecord> = sys.run(&s, true).unwrap().to_vec();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn clone_is_independent_of_original() {
        let sg = ScriptedSignal::new().buy_at(at(3));
        let mut sys = basic_system(Box::new(sg));
        let mut copy = sys.clone();

        let s = series((1..=10).map(|d| bar(d, 100.0 + d as f64)).collect());
        copy.run(&s, true).unwrap();

        // The clone traded; the original saw nothing.
        assert_eq!(copy.trades().len(), 1);
        assert!(sys.trades().is_empty());
        assert!(sys.trade_manager().unwrap().position("TEST").is_none());

        // And the original still runs to the same result afterwards.
        let trades = sys.run(&s, true).unwrap();
        assert_eq!(trades.len(), 1);
    }

    #[test]
    fn param_surface_rejects_unknown_key() {
        let mut sys = TradingSystem::new("p");
        assert!(matches!(
            sys.set_param("bogus", ParamValue::Bool(true)),
            Err(CoreError::UnknownParam(_))
        ));
        sys.set_param("delay", ParamValue::Bool(false)).unwrap();
        assert_eq!(sys.get_param("delay").unwrap(), ParamValue::Bool(false));
    }

    #[test]
    fn snapshot_lists_components_and_trades() {
        let sg = ScriptedSignal::new().buy_at(at(3));
        let mut sys = basic_system(Box::new(sg));
        let s = series((1..=6).map(|d| bar(d, 100.0)).collect());
        sys.run(&s, true).unwrap();

        let snap = sys.snapshot();
        assert_eq!(snap.trade_list.len(), 1);
        assert!(snap.components.iter().any(|(k, v)| k == "signal" && v == "scripted_signal"));
        // Snapshot must be serializable (the persistence boundary).
        serde_json::to_string(&snap).unwrap();
    }
}
