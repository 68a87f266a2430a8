//! End-to-end scenarios for the trading system state machine.
//!
//! Each test wires a full system (simulation account, sizing, signals,
//! stops) and drives a hand-built candle series through `run`.

use chrono::{DateTime, TimeZone, Utc};
use kairos_core::account::SimAccount;
use kairos_core::components::{
    DateRangeEnvironment, FixedCountManager, FixedPercentGoal, FixedPercentStop, ScriptedSignal,
};
use kairos_core::domain::{Bar, BarSeries, Business, Instrument, TradeOrigin};
use kairos_core::system::{ParamValue, TradingSystem};

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
}

fn bar(day: u32, close: f64) -> Bar {
    Bar::new(at(day), close - 0.5, close + 1.0, close - 1.0, close, 10_000.0, close * 10_000.0)
}

fn flat_bar(day: u32, price: f64) -> Bar {
    Bar::new(at(day), price, price, price, price, 0.0, 0.0)
}

fn series(bars: Vec<Bar>) -> BarSeries {
    BarSeries::new(Instrument::equity("TEST"), bars).unwrap()
}

fn system_with_signal(sg: ScriptedSignal) -> TradingSystem {
    let mut sys = TradingSystem::new("scenario");
    sys.set_trade_manager(Box::new(SimAccount::new(1_000_000.0, at(1))))
        .set_money_manager(Box::new(FixedCountManager::new(100.0)))
        .set_signal(Box::new(sg));
    sys
}

#[test]
fn buy_and_hold_smoke() {
    // One buy signal on bar 5, never a sell. With delay on, the entry
    // executes on bar 6 and the position stays open to the end.
    let sg = ScriptedSignal::new().buy_at(at(5));
    let mut sys = system_with_signal(sg);

    let s = series((1..=15).map(|d| bar(d, 100.0 + d as f64)).collect());
    let trades = sys.run(&s, true).unwrap();

    assert_eq!(trades.len(), 1);
    let entry = &trades[0];
    assert_eq!(entry.business, Business::Buy);
    assert_eq!(entry.origin, TradeOrigin::Signal);
    assert_eq!(entry.datetime, at(6));
    assert_eq!(entry.number, 100.0);

    let tm = sys.trade_manager().unwrap();
    assert!(tm.have("TEST"));
    assert_eq!(tm.hold_number(at(15), "TEST"), 100.0);
}

#[test]
fn immediate_mode_executes_on_decision_bar() {
    let sg = ScriptedSignal::new().buy_at(at(5));
    let mut sys = system_with_signal(sg);
    sys.set_param("delay", ParamValue::Bool(false)).unwrap();

    let s = series((1..=15).map(|d| bar(d, 100.0 + d as f64)).collect());
    let trades = sys.run(&s, true).unwrap();

    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].datetime, at(5));
    // Immediate execution uses the decision bar's close as plan price.
    assert!((trades[0].plan_price - 105.0).abs() < 1e-9);
}

#[test]
fn stoploss_exit_sells_full_holding() {
    // Enter at close 100 with a 5% stop (95). Bar 10 closes at 94, breaching
    // the stop; the whole holding is liquidated on that bar.
    let sg = ScriptedSignal::new().buy_at(at(5));
    let mut sys = system_with_signal(sg);
    sys.set_stoploss(Box::new(FixedPercentStop::new(0.05)));
    sys.set_param("delay", ParamValue::Bool(false)).unwrap();

    let mut bars: Vec<Bar> = (1..=9).map(|d| bar(d, 100.0)).collect();
    bars.push(Bar::new(at(10), 99.0, 100.0, 94.0, 94.0, 10_000.0, 940_000.0));
    bars.push(bar(11, 95.0));
    let s = series(bars);

    let trades = sys.run(&s, true).unwrap();
    assert_eq!(trades.len(), 2);

    let entry = &trades[0];
    assert_eq!(entry.datetime, at(5));
    assert!((entry.stoploss - 95.0).abs() < 1e-9);

    let exit = &trades[1];
    assert_eq!(exit.business, Business::Sell);
    assert_eq!(exit.origin, TradeOrigin::Stoploss);
    assert_eq!(exit.datetime, at(10));
    // Full held quantity goes on a stoploss exit.
    assert_eq!(exit.number, entry.number);
    assert!(!sys.trade_manager().unwrap().have("TEST"));
}

#[test]
fn delayed_request_dies_after_max_delay_count_retries() {
    // A buy decided on bar 5 meets four consecutive degenerate bars. Each
    // one bumps the retry counter; after three retries the buffer is
    // discarded and nothing ever trades.
    let sg = ScriptedSignal::new().buy_at(at(5));
    let mut sys = system_with_signal(sg);

    let mut bars: Vec<Bar> = (1..=5).map(|d| bar(d, 100.0)).collect();
    for d in 6..=9 {
        bars.push(flat_bar(d, 100.0));
    }
    for d in 10..=14 {
        bars.push(bar(d, 100.0));
    }
    let s = series(bars);

    let trades = sys.run(&s, true).unwrap();
    assert!(trades.is_empty());
    assert!(!sys.has_pending_request());
}

#[test]
fn delayed_request_survives_short_degenerate_run() {
    // Two degenerate bars bump the counter to 3 (== max_delay_count), which
    // is still alive; the order fills on the next tradable bar.
    let sg = ScriptedSignal::new().buy_at(at(5));
    let mut sys = system_with_signal(sg);

    let mut bars: Vec<Bar> = (1..=5).map(|d| bar(d, 100.0)).collect();
    bars.push(flat_bar(6, 100.0));
    bars.push(flat_bar(7, 100.0));
    bars.push(bar(8, 101.0));
    bars.push(bar(9, 102.0));
    let s = series(bars);

    let trades = sys.run(&s, true).unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].datetime, at(8));
}

#[test]
fn environment_flush_sells_long_position() {
    // Environment valid through bar 9 and invalid from bar 10. The system
    // is long; the flush is decided on bar 10 and executes on bar 11.
    let sg = ScriptedSignal::new().buy_at(at(4));
    let mut sys = system_with_signal(sg);
    sys.set_environment(Box::new(DateRangeEnvironment::new(at(1), at(10))));

    let s = series((1..=14).map(|d| bar(d, 100.0 + d as f64)).collect());
    let trades = sys.run(&s, true).unwrap();

    assert_eq!(trades.len(), 2);
    assert_eq!(trades[0].business, Business::Buy);
    assert_eq!(trades[0].datetime, at(5));

    let exit = &trades[1];
    assert_eq!(exit.business, Business::Sell);
    assert_eq!(exit.origin, TradeOrigin::Environment);
    assert_eq!(exit.datetime, at(11));
    assert!(!sys.trade_manager().unwrap().have("TEST"));
}

#[test]
fn environment_revalidation_opens_position_when_enabled() {
    let sg = ScriptedSignal::new();
    let mut sys = system_with_signal(sg);
    sys.set_environment(Box::new(DateRangeEnvironment::new(at(8), at(30))));
    sys.set_param("ev_open_position", ParamValue::Bool(true)).unwrap();

    let s = series((1..=14).map(|d| bar(d, 100.0)).collect());
    let trades = sys.run(&s, true).unwrap();

    // Invalid bars 1-7, first valid bar 8 is the false→true transition:
    // entry decided there, executed on bar 9.
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].origin, TradeOrigin::Environment);
    assert_eq!(trades[0].datetime, at(9));
}

#[test]
fn profit_goal_exit() {
    // Goal 10% above entry. The entry decided on bar 3 fills on bar 4 at
    // its open (103.5), anchoring the goal at 113.85. The close first
    // reaches it on bar 14 and the exit fills on bar 15.
    let sg = ScriptedSignal::new().buy_at(at(3));
    let mut sys = system_with_signal(sg);
    sys.set_profit_goal(Box::new(FixedPercentGoal::new(0.10)));

    let s = series((1..=20).map(|d| bar(d, 100.0 + d as f64)).collect());
    let trades = sys.run(&s, true).unwrap();

    assert_eq!(trades.len(), 2);
    let exit = &trades[1];
    assert_eq!(exit.origin, TradeOrigin::ProfitGoal);
    assert_eq!(exit.datetime, at(15));
    assert!(!sys.trade_manager().unwrap().have("TEST"));
}

#[test]
fn sell_signal_suppressed_while_long_when_ignore_sell_sg() {
    let sg = ScriptedSignal::new().buy_at(at(3)).sell_at(at(8));
    let mut sys = system_with_signal(sg);
    sys.set_param("ignore_sell_sg", ParamValue::Bool(true)).unwrap();

    let s = series((1..=12).map(|d| bar(d, 100.0)).collect());
    let trades = sys.run(&s, true).unwrap();

    // Only the entry; the sell signal on bar 8 is ignored while long.
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].business, Business::Buy);
    assert!(sys.trade_manager().unwrap().have("TEST"));
}

#[test]
fn short_round_trip_with_borrow_stock() {
    // Sell signal with no long position opens a short; the later buy signal
    // covers it. Both legs delayed by one bar.
    let sg = ScriptedSignal::new().sell_at(at(4)).buy_at(at(9));
    let mut sys = system_with_signal(sg);
    sys.set_param("support_borrow_stock", ParamValue::Bool(true)).unwrap();

    let s = series((1..=14).map(|d| bar(d, 100.0)).collect());
    let trades = sys.run(&s, true).unwrap();

    assert_eq!(trades.len(), 2);
    assert_eq!(trades[0].business, Business::SellShort);
    assert_eq!(trades[0].datetime, at(5));
    assert_eq!(trades[1].business, Business::BuyShort);
    assert_eq!(trades[1].datetime, at(10));
    let tm = sys.trade_manager().unwrap();
    assert!(!tm.have_short("TEST"));
    assert!(!tm.have("TEST"));
}

#[test]
fn rejected_delayed_order_clears_buffer_and_run_continues() {
    // The sizer asks for far more than cash covers; the account refuses the
    // fill, the buffer clears, and a later affordable signal still works.
    let sg = ScriptedSignal::new().buy_at(at(3)).buy_at(at(8));
    let mut sys = TradingSystem::new("reject");
    sys.set_trade_manager(Box::new(SimAccount::new(5_000.0, at(1))))
        .set_money_manager(Box::new(FixedCountManager::new(1_000.0)))
        .set_signal(Box::new(sg));

    let mut bars: Vec<Bar> = (1..=6).map(|d| bar(d, 100.0)).collect();
    // From bar 7 the price is low enough that 1000 shares fit in 5k cash.
    for d in 7..=12 {
        bars.push(bar(d, 4.0));
    }
    let s = series(bars);

    let trades = sys.run(&s, true).unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].datetime, at(9));
    assert!(!sys.has_pending_request());
}

#[test]
fn coalesced_resubmission_executes_once() {
    // Buy signals on consecutive bars coalesce into the single buy buffer:
    // the first decision's execution consumes it, and the second signal
    // opens a fresh one which adds to the position.
    let sg = ScriptedSignal::new().buy_at(at(3)).buy_at(at(4));
    let mut sys = system_with_signal(sg);

    let s = series((1..=8).map(|d| bar(d, 100.0)).collect());
    let trades = sys.run(&s, true).unwrap();

    assert_eq!(trades.len(), 2);
    assert_eq!(trades[0].datetime, at(4));
    assert_eq!(trades[1].datetime, at(5));
    assert_eq!(sys.trade_manager().unwrap().hold_number(at(8), "TEST"), 200.0);
}
