//! Profit goal — target price at which a position is taken off.
//!
//! 0 means "no goal". Goals receive entry/exit notifications so stateful
//! implementations (e.g. goal anchored to entry price) can track the
//! position lifecycle.

use crate::domain::{BarSeries, TradeRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub trait ProfitGoal: Send {
    fn name(&self) -> &str;

    /// Target price for `datetime` given the reference `price`. 0 means none.
    fn goal(&mut self, datetime: DateTime<Utc>, price: f64) -> f64;

    /// Called after every executed entry.
    fn buy_notify(&mut self, _record: &TradeRecord) {}

    /// Called after every executed exit.
    fn sell_notify(&mut self, _record: &TradeRecord) {}

    fn set_series(&mut self, _series: &BarSeries) {}

    fn reset(&mut self) {}

    fn clone_box(&self) -> Box<dyn ProfitGoal>;
}

impl Clone for Box<dyn ProfitGoal> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// No profit goal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoGoal;

impl ProfitGoal for NoGoal {
    fn name(&self) -> &str {
        "no_goal"
    }

    fn goal(&mut self, _datetime: DateTime<Utc>, _price: f64) -> f64 {
        0.0
    }

    fn clone_box(&self) -> Box<dyn ProfitGoal> {
        Box::new(self.clone())
    }
}

/// Goal at a fixed percentage above the entry price.
///
/// Anchors on the first entry notification and clears when the position is
/// fully exited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedPercentGoal {
    /// Goal distance as a fraction, e.g. 0.20 for +20%.
    pub pct: f64,
    entry_price: f64,
}

impl FixedPercentGoal {
    pub fn new(pct: f64) -> Self {
        assert!(pct > 0.0, "pct must be positive");
        Self { pct, entry_price: 0.0 }
    }
}

impl ProfitGoal for FixedPercentGoal {
    fn name(&self) -> &str {
        "fixed_percent_goal"
    }

    fn goal(&mut self, _datetime: DateTime<Utc>, price: f64) -> f64 {
        if self.entry_price > 0.0 {
            self.entry_price * (1.0 + self.pct)
        } else {
            // Not yet in a position: quote relative to the reference price
            // so entry-time goal capture has something to record.
            price * (1.0 + self.pct)
        }
    }

    fn buy_notify(&mut self, record: &TradeRecord) {
        if self.entry_price == 0.0 {
            self.entry_price = record.real_price;
        }
    }

    fn sell_notify(&mut self, _record: &TradeRecord) {
        self.entry_price = 0.0;
    }

    fn reset(&mut self) {
        self.entry_price = 0.0;
    }

    fn clone_box(&self) -> Box<dyn ProfitGoal> {
        Box::new(self.clone())
    }
}
