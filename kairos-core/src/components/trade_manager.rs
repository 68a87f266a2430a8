//! Trade manager — the ledger of cash, positions, and realised costs.
//!
//! The system only consumes this interface; the accounting behind it is an
//! external concern. A refused trade (insufficient cash, rule violation)
//! returns `None`; the system clears the corresponding order buffer and the
//! bar loop continues.

use crate::domain::{Instrument, PositionRecord, TradeOrigin, TradeRecord};
use chrono::{DateTime, Utc};

pub trait TradeManager: Send {
    fn name(&self) -> &str;

    /// Earliest datetime the ledger is live; bars before it are skipped.
    fn init_datetime(&self) -> DateTime<Utc>;

    /// Cash available at `datetime`.
    fn cash(&self, datetime: DateTime<Utc>) -> f64;

    #[allow(clippy::too_many_arguments)]
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
    ) -> Option<TradeRecord>;

    #[allow(clippy::too_many_arguments)]
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
    ) -> Option<TradeRecord>;

    /// Open a short position by selling borrowed stock.
    #[allow(clippy::too_many_arguments)]
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
    ) -> Option<TradeRecord>;

    /// Buy to cover (part of) a short position.
    #[allow(clippy::too_many_arguments)]
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
    ) -> Option<TradeRecord>;

    /// Current long position, `None` when flat.
    fn position(&self, symbol: &str) -> Option<PositionRecord>;

    /// Current short position, `None` when flat.
    fn short_position(&self, symbol: &str) -> Option<PositionRecord>;

    fn have(&self, symbol: &str) -> bool {
        self.position(symbol).is_some()
    }

    fn have_short(&self, symbol: &str) -> bool {
        self.short_position(symbol).is_some()
    }

    /// Long quantity held at `datetime`.
    fn hold_number(&self, datetime: DateTime<Utc>, symbol: &str) -> f64;

    /// Short quantity owed at `datetime`.
    fn short_hold_number(&self, datetime: DateTime<Utc>, symbol: &str) -> f64;

    /// Allow leveraged long entries.
    fn set_borrow_cash(&mut self, allow: bool);

    /// Allow the short side.
    fn set_borrow_stock(&mut self, allow: bool);

    fn reset(&mut self);

    fn clone_box(&self) -> Box<dyn TradeManager>;
}

impl Clone for Box<dyn TradeManager> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
