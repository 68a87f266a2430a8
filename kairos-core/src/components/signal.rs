//! Signal — directional entry/exit intent per bar.
//!
//! Buy and sell are not mutually exclusive; when both fire on the same bar
//! the system takes the buy branch first. That tie-break is arbitrary but
//! load-bearing for reproducibility, so it is pinned by tests.

use crate::domain::BarSeries;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub trait Signal: Send {
    fn name(&self) -> &str;

    fn should_buy(&mut self, datetime: DateTime<Utc>) -> bool;

    fn should_sell(&mut self, datetime: DateTime<Utc>) -> bool;

    fn set_series(&mut self, _series: &BarSeries) {}

    fn reset(&mut self) {}

    fn clone_box(&self) -> Box<dyn Signal>;
}

impl Clone for Box<dyn Signal> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Signal that never fires.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NullSignal;

impl Signal for NullSignal {
    fn name(&self) -> &str {
        "null_signal"
    }

    fn should_buy(&mut self, _datetime: DateTime<Utc>) -> bool {
        false
    }

    fn should_sell(&mut self, _datetime: DateTime<Utc>) -> bool {
        false
    }

    fn clone_box(&self) -> Box<dyn Signal> {
        Box::new(self.clone())
    }
}

/// Signal that fires on an explicit list of datetimes.
///
/// The workhorse for deterministic backtest tests and for replaying
/// externally computed signal streams.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptedSignal {
    buy_on: BTreeSet<DateTime<Utc>>,
    sell_on: BTreeSet<DateTime<Utc>>,
}

impl ScriptedSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buy_at(mut self, datetime: DateTime<Utc>) -> Self {
        self.buy_on.insert(datetime);
        self
    }

    pub fn sell_at(mut self, datetime: DateTime<Utc>) -> Self {
        self.sell_on.insert(datetime);
        self
    }
}

impl Signal for ScriptedSignal {
    fn name(&self) -> &str {
        "scripted_signal"
    }

    fn should_buy(&mut self, datetime: DateTime<Utc>) -> bool {
        self.buy_on.contains(&datetime)
    }

    fn should_sell(&mut self, datetime: DateTime<Utc>) -> bool {
        self.sell_on.contains(&datetime)
    }

    fn clone_box(&self) -> Box<dyn Signal> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn scripted_signal_fires_only_on_listed_bars() {
        let mut sg = ScriptedSignal::new().buy_at(at(5)).sell_at(at(9));
        assert!(sg.should_buy(at(5)));
        assert!(!sg.should_buy(at(6)));
        assert!(sg.should_sell(at(9)));
        assert!(!sg.should_sell(at(5)));
    }

    #[test]
    fn cloned_signal_is_independent() {
        let sg = ScriptedSignal::new().buy_at(at(5));
        let boxed: Box<dyn Signal> = Box::new(sg);
        let mut copy = boxed.clone();
        assert!(copy.should_buy(at(5)));
    }
}
